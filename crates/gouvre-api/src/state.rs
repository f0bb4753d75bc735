//! Application state shared by every handler.

use chrono::{DateTime, Duration, Utc};
use gouvre_core::Config;
use gouvre_services::AccessService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub access: AccessService,
}

impl AppState {
    pub fn new(config: Config, access: AccessService) -> Self {
        Self { config, access }
    }

    /// Absolute expiry for a link requested to live `requested` seconds.
    pub fn expires_at(&self, requested: Option<u64>) -> DateTime<Utc> {
        let secs = self.config.link_lifetime_secs(requested);
        // Bounded by Config::validate, so this stays well inside chrono's range.
        Utc::now() + Duration::seconds(secs as i64)
    }

    pub fn link_url(&self, token: &str) -> String {
        format!("{}/links/{}", self.config.base_url, token)
    }

    pub fn upload_url(&self, token: &str) -> String {
        format!("{}/uploads/{}", self.config.base_url, token)
    }
}
