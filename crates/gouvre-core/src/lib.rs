//! Gouvre Core Library
//!
//! This crate provides the token codec, the per-file crypto helper, error types and
//! configuration shared by all gouvre components.

pub mod config;
pub mod encryption;
pub mod error;
pub mod token;

// Re-export commonly used types
pub use config::{Config, DecryptFailurePolicy};
pub use encryption::CryptoError;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use token::{TokenClaims, TokenCodec, TokenError};
