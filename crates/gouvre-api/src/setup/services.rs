//! Service wiring: storage, token codec, link store and the access orchestrator.

use crate::state::AppState;
use anyhow::{Context, Result};
use gouvre_core::{Config, TokenCodec};
use gouvre_services::{AccessService, AccessSettings, LinkStore, LocalStorage};
use std::sync::Arc;

pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let storage = LocalStorage::new(&config.storage_path)
        .await
        .context("Failed to initialize local storage")?;
    tracing::info!(path = %config.storage_path, "Local storage ready");

    // A bad key must stop startup, never surface per request
    let codec = TokenCodec::from_base64_key(&config.token_key)
        .context("Failed to initialize token codec")?;

    let access = AccessService::new(
        codec,
        Arc::new(storage),
        LinkStore::new(),
        AccessSettings::from_config(config),
    );

    tracing::info!(
        decrypt_failure_policy = ?config.decrypt_failure_policy,
        thumbnail_quality = config.thumbnail_quality,
        max_thumbnail_resolution = config.max_thumbnail_resolution,
        "Access service initialized"
    );

    Ok(Arc::new(AppState::new(config.clone(), access)))
}
