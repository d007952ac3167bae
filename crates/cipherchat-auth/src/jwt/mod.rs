//! Credential encoding, decoding, and claims management.

pub mod claims;
pub mod decoder;
pub mod encoder;

pub use claims::{Claims, TokenType};
pub use decoder::{CredentialDecoder, CredentialError};
pub use encoder::CredentialEncoder;
