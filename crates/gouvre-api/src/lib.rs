//! Gouvre API Library
//!
//! This crate provides the HTTP handlers, whitelist middleware, and application setup.

mod handlers;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use handlers::{LinkResponse, ThumbnailsResponse, UploadResponse};
pub use state::AppState;
