//! Test helpers: build the router against a temporary storage directory.
//!
//! Run from workspace root: `cargo test -p gouvre-api`.

pub mod fixtures;

use axum_test::TestServer;
use gouvre_api::setup::initialize_app;
use gouvre_core::Config;
use tempfile::TempDir;

pub const TEST_BEARER_TOKEN: &str = "test-token";
pub const TEST_BASE_URL: &str = "http://gouvre.test";
// 32 zero bytes
pub const TEST_TOKEN_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

/// Test application: server plus the storage directory it writes to.
pub struct TestApp {
    pub server: TestServer,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn storage_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }
}

pub fn create_test_config(storage_path: &str) -> Config {
    Config {
        environment: "test".to_string(),
        base_url: TEST_BASE_URL.to_string(),
        storage_path: storage_path.to_string(),
        token_key: TEST_TOKEN_KEY.to_string(),
        cleanup_interval_secs: 0,
        whitelisted_tokens: vec![TEST_BEARER_TOKEN.to_string()],
        ..Config::default()
    }
}

/// Setup test app with the default test config.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup test app after letting the caller adjust the config.
pub async fn setup_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_path = temp_dir.path().to_string_lossy().into_owned();

    let mut config = create_test_config(&storage_path);
    customize(&mut config);
    config.validate().expect("Test config must validate");

    let app = initialize_app(config)
        .await
        .expect("Failed to initialize app");
    let server = TestServer::new(app.router).expect("Failed to create test server");

    TestApp { server, temp_dir }
}

/// Strip the public base URL from an issued link, leaving the request path.
pub fn link_path(url: &str) -> String {
    url.strip_prefix(TEST_BASE_URL)
        .unwrap_or_else(|| panic!("link {} not built on {}", url, TEST_BASE_URL))
        .to_string()
}

pub fn bearer() -> String {
    format!("Bearer {}", TEST_BEARER_TOKEN)
}
