use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A freshly minted token and the expiry sealed inside it.
#[derive(Debug, Clone)]
pub struct IssuedLink {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// File contents behind a valid read link, ready to serve.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub filename: String,
    pub data: Bytes,
    pub content_type: String,
    pub expires_at: DateTime<Utc>,
    /// Seconds the response may be cached for.
    pub max_age_secs: i64,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub filename: String,
    /// Derived thumbnail files generated for the upload, in request order.
    pub thumbnails: Vec<String>,
}

/// Result of a batch thumbnail request. Files that failed are simply absent.
#[derive(Debug, Clone)]
pub struct ThumbnailLinks {
    pub expires_at: DateTime<Utc>,
    pub filename_to_token: BTreeMap<String, String>,
}
