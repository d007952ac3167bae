//! # cipherchat-core
//!
//! Core crate for CipherChat. Contains the unified error system,
//! configuration schemas, and the abstract collaborator contracts
//! (session store, message store, delivery backplane, user directory)
//! consumed by the authentication gate and the delivery engine.
//!
//! This crate depends only on `cipherchat-entity` (pure domain models).

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
