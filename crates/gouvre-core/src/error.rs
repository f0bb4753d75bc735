//! Error types module
//!
//! This module provides the core error types used throughout gouvre. Component errors
//! (token codec, crypto helper, thumbnail engine, file store) are unified under the
//! `AppError` enum, which knows how each failure should be presented at the HTTP boundary.

use std::io;

use crate::encryption::CryptoError;
use crate::token::TokenError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like corrupt uploads
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_TOKEN")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Image decode failed: {0}")]
    DecodeFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptFailed(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AppError::InvalidToken,
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Crypto(msg) => AppError::Internal(format!("Token sealing failed: {}", msg)),
        }
    }
}

impl From<CryptoError> for AppError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::EncryptFailed(msg) => AppError::Internal(format!("Encryption failed: {}", msg)),
            CryptoError::DecryptFailed => {
                AppError::DecryptFailed("wrong secret or corrupt ciphertext".to_string())
            }
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidToken => (
            400,
            "INVALID_TOKEN",
            false,
            Some("Request a new link"),
            false,
            LogLevel::Debug,
        ),
        AppError::TokenExpired => (
            410,
            "TOKEN_EXPIRED",
            false,
            Some("Request a new link"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedContentType(_) => (
            422,
            "UNSUPPORTED_CONTENT_TYPE",
            false,
            Some("Use a JPEG, PNG, GIF or BMP image"),
            false,
            LogLevel::Debug,
        ),
        AppError::DecodeFailed(_) => (
            422,
            "DECODE_FAILED",
            false,
            Some("Check image integrity and try a different file"),
            false,
            LogLevel::Warn,
        ),
        AppError::DecryptFailed(_) => (
            500,
            "DECRYPT_FAILED",
            false,
            Some("Check the encryption secret used to create the link"),
            true,
            LogLevel::Warn,
        ),
        AppError::NotAuthorized(_) => (
            401,
            "NOT_AUTHORIZED",
            false,
            Some("Check the authorization token and client address"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file name exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidToken => "InvalidToken",
            AppError::TokenExpired => "TokenExpired",
            AppError::UnsupportedContentType(_) => "UnsupportedContentType",
            AppError::DecodeFailed(_) => "DecodeFailed",
            AppError::DecryptFailed(_) => "DecryptFailed",
            AppError::NotAuthorized(_) => "NotAuthorized",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            // Token failures never say more than this: no decoded field is echoed back.
            AppError::InvalidToken => "Invalid token".to_string(),
            AppError::TokenExpired => "Token expired".to_string(),
            AppError::UnsupportedContentType(ref msg) => msg.clone(),
            AppError::DecodeFailed(_) => "Image data is corrupt".to_string(),
            AppError::DecryptFailed(_) => "Couldn't decrypt file".to_string(),
            AppError::NotAuthorized(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
