//! Gouvre Services Layer
//!
//! This crate is the service layer: it owns the single-use link store and its background
//! cleanup, and the access orchestrator that ties tokens, storage, encryption and thumbnail
//! generation together. It re-exports the storage and processing types the API crate needs,
//! so HTTP handling depends on a single facade. Keep coordination here; keep thin HTTP
//! handling in gouvre-api.

pub mod access;
pub mod cleanup;
pub mod link_store;

pub use access::{AccessService, AccessSettings, IssuedLink, ResolvedFile, ThumbnailLinks, UploadOutcome};
pub use cleanup::LinkCleanupService;
pub use link_store::{LinkState, LinkStore};

pub use gouvre_processing::{ContentType, ThumbnailError, ThumbnailGenerator, ThumbnailParams};
pub use gouvre_storage::{FileStore, LocalStorage, StorageError, StorageResult};
