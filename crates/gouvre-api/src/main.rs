use gouvre_core::Config;

// Use mimalloc as the global allocator for better performance and lower fragmentation,
// especially when running on musl-based systems inside containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    gouvre_api::telemetry::init_telemetry()?;
    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    // Build state, routes and the background link cleanup
    let app = gouvre_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    gouvre_api::setup::server::start_server(&config, app).await?;

    Ok(())
}
