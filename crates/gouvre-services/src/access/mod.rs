//! Access orchestration
//!
//! - Issuing read links, upload links and batched thumbnail links (service)
//! - Values handed back to the HTTP layer (types)

pub mod service;
pub mod types;

pub use service::{AccessService, AccessSettings};
pub use types::{IssuedLink, ResolvedFile, ThumbnailLinks, UploadOutcome};
