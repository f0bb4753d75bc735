use gouvre_core::AppError;

/// Thumbnail generation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ThumbnailError {
    /// Sniffed type is not one of JPEG, PNG, GIF or BMP.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Bytes sniff as a supported format but don't decode.
    #[error("Failed to decode {content_type}: {message}")]
    DecodeFailed {
        content_type: &'static str,
        message: String,
    },

    #[error("Invalid resolution: {0} (must be positive)")]
    InvalidResolution(u32),

    #[error("Failed to encode thumbnail: {0}")]
    EncodeFailed(String),
}

impl From<ThumbnailError> for AppError {
    fn from(err: ThumbnailError) -> Self {
        match err {
            ThumbnailError::UnsupportedContentType(content_type) => AppError::UnsupportedContentType(
                format!("Unsupported content type: {}", content_type),
            ),
            ThumbnailError::DecodeFailed { .. } => AppError::DecodeFailed(err.to_string()),
            ThumbnailError::InvalidResolution(_) => AppError::InvalidInput(err.to_string()),
            ThumbnailError::EncodeFailed(_) => AppError::Internal(err.to_string()),
        }
    }
}
