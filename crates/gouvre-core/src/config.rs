//! Configuration module
//!
//! Process configuration is read once from the environment (and an optional `.env` file)
//! at startup. Everything except `TOKEN_KEY` has a development default.

use std::env;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};

const SERVER_PORT: u16 = 4000;
const DEFAULT_LINK_EXPIRY_SECS: u64 = 24 * 60 * 60;
const MAX_LINK_EXPIRY_SECS: u64 = 365 * 24 * 60 * 60;
/// Upper bound for `MAX_LINK_EXPIRY_SECS` itself, keeps expiry arithmetic in range.
const LINK_EXPIRY_CEILING_SECS: u64 = 100 * MAX_LINK_EXPIRY_SECS;
const CLEANUP_INTERVAL_SECS: u64 = 60 * 60;
const THUMBNAIL_QUALITY: u8 = 90;
const MAX_THUMBNAIL_RESOLUTION: u32 = 4096;
const MAX_UPLOAD_SIZE_MB: usize = 25;

/// What to do when a link carries an encryption secret but the stored bytes don't decrypt
/// with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecryptFailurePolicy {
    /// Fail the request with `DecryptFailed`.
    #[default]
    Reject,
    /// Serve the stored bytes unchanged.
    Passthrough,
}

impl FromStr for DecryptFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(DecryptFailurePolicy::Reject),
            "passthrough" => Ok(DecryptFailurePolicy::Passthrough),
            other => Err(anyhow::anyhow!(
                "Invalid DECRYPT_FAILURE_POLICY '{}': expected 'reject' or 'passthrough'",
                other
            )),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    /// Public base URL that issued links are built on, without a trailing slash.
    pub base_url: String,
    /// Root directory of the flat file store.
    pub storage_path: String,
    /// Base64-encoded 32-byte key sealing every token.
    pub token_key: String,
    pub default_link_expiry_secs: u64,
    pub max_link_expiry_secs: u64,
    /// Interval between link store sweeps. 0 = cleanup turned off.
    pub cleanup_interval_secs: u64,
    pub thumbnail_quality: u8,
    pub max_thumbnail_resolution: u32,
    pub max_upload_size_bytes: usize,
    /// Bearer tokens allowed to issue links. Empty = no token restriction.
    pub whitelisted_tokens: Vec<String>,
    /// Client IPs allowed to issue links. Empty = no address restriction.
    pub whitelisted_ips: Vec<String>,
    /// Proxies in front of the server whose X-Forwarded-For entries are trusted. 0 = use the
    /// socket peer address only.
    pub trusted_proxy_count: usize,
    pub decrypt_failure_policy: DecryptFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            base_url: format!("http://localhost:{}", SERVER_PORT),
            storage_path: "./data".to_string(),
            token_key: String::new(),
            default_link_expiry_secs: DEFAULT_LINK_EXPIRY_SECS,
            max_link_expiry_secs: MAX_LINK_EXPIRY_SECS,
            cleanup_interval_secs: CLEANUP_INTERVAL_SECS,
            thumbnail_quality: THUMBNAIL_QUALITY,
            max_thumbnail_resolution: MAX_THUMBNAIL_RESOLUTION,
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            whitelisted_tokens: Vec::new(),
            whitelisted_ips: Vec::new(),
            trusted_proxy_count: 0,
            decrypt_failure_policy: DecryptFailurePolicy::Reject,
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse an optional raw value. Unset means `default`; set but unparsable is an error, never a
/// silent fallback.
fn parse_or<T: FromStr>(key: &str, raw: Option<&str>, default: T) -> Result<T, anyhow::Error> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| {
            anyhow::anyhow!("{} has an invalid value '{}'", key, value)
        }),
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, anyhow::Error> {
    parse_or(key, env::var(key).ok().as_deref(), default)
}

fn megabytes_to_bytes(mb: usize) -> Result<usize, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_UPLOAD_SIZE_MB is too large: {}", mb))
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let decrypt_failure_policy = match env::var("DECRYPT_FAILURE_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => DecryptFailurePolicy::default(),
        };

        let max_upload_size_bytes =
            megabytes_to_bytes(env_or("MAX_UPLOAD_SIZE_MB", MAX_UPLOAD_SIZE_MB)?)?;

        let config = Config {
            server_port,
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or(defaults.environment),
            cors_origins: parse_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string())),
            base_url: env::var("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
            storage_path: env::var("STORAGE_PATH").unwrap_or(defaults.storage_path),
            token_key: env::var("TOKEN_KEY").unwrap_or_default(),
            default_link_expiry_secs: env_or("DEFAULT_LINK_EXPIRY_SECS", DEFAULT_LINK_EXPIRY_SECS)?,
            max_link_expiry_secs: env_or("MAX_LINK_EXPIRY_SECS", MAX_LINK_EXPIRY_SECS)?,
            cleanup_interval_secs: env_or("CLEANUP_INTERVAL_SECS", CLEANUP_INTERVAL_SECS)?,
            thumbnail_quality: env_or("THUMBNAIL_QUALITY", THUMBNAIL_QUALITY)?,
            max_thumbnail_resolution: env_or("MAX_THUMBNAIL_RESOLUTION", MAX_THUMBNAIL_RESOLUTION)?,
            max_upload_size_bytes,
            whitelisted_tokens: parse_list(&env::var("WHITELISTED_TOKENS").unwrap_or_default()),
            whitelisted_ips: parse_list(&env::var("WHITELISTED_IPS").unwrap_or_default()),
            trusted_proxy_count: env_or("TRUSTED_PROXY_COUNT", 0)?,
            decrypt_failure_policy,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.token_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "TOKEN_KEY must be set to a base64-encoded 32-byte key"
            ));
        }

        let key_len = general_purpose::STANDARD
            .decode(self.token_key.trim())
            .map_err(|e| anyhow::anyhow!("TOKEN_KEY is not valid base64: {}", e))?
            .len();
        if key_len != 32 {
            return Err(anyhow::anyhow!(
                "TOKEN_KEY must decode to 32 bytes, got {}",
                key_len
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if !(1..=100).contains(&self.thumbnail_quality) {
            return Err(anyhow::anyhow!("THUMBNAIL_QUALITY must be between 1 and 100"));
        }

        if self.max_thumbnail_resolution == 0 {
            return Err(anyhow::anyhow!("MAX_THUMBNAIL_RESOLUTION must be positive"));
        }

        if self.max_link_expiry_secs > LINK_EXPIRY_CEILING_SECS {
            return Err(anyhow::anyhow!(
                "MAX_LINK_EXPIRY_SECS must not exceed {}",
                LINK_EXPIRY_CEILING_SECS
            ));
        }

        if self.default_link_expiry_secs == 0
            || self.default_link_expiry_secs > self.max_link_expiry_secs
        {
            return Err(anyhow::anyhow!(
                "DEFAULT_LINK_EXPIRY_SECS must be positive and not exceed MAX_LINK_EXPIRY_SECS"
            ));
        }

        Ok(())
    }

    /// Resolve the `expires` query parameter (seconds from now) against the configured
    /// default and ceiling.
    pub fn link_lifetime_secs(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(0) | None => self.default_link_expiry_secs,
            Some(secs) => secs.min(self.max_link_expiry_secs),
        }
    }
}
