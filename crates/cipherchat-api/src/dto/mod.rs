//! Request and response DTOs.

pub mod request;
pub mod response;

pub use request::LoginRequest;
pub use response::{LoginResponse, MessageResponse, ProfileResponse};
