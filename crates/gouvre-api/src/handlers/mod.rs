pub mod links;
pub mod ping;
pub mod thumbnails;
pub mod uploads;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use thumbnails::ThumbnailsResponse;
pub use uploads::UploadResponse;

/// Body returned whenever a link is issued.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// `?expires=<seconds>`; absent or 0 means the configured default.
#[derive(Debug, Default, Deserialize)]
pub struct ExpiresQuery {
    pub expires: Option<u64>,
}
