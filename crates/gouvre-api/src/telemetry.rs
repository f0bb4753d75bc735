use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const DEFAULT_FILTER: &str = "gouvre=debug,tower_http=debug";

/// Initialize tracing. `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches
/// the console output to one JSON object per event.
pub fn init_telemetry() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        let console_fmt = tracing_subscriber::fmt::layer()
            .event_format(Format::default().compact().with_target(false));
        registry.with(console_fmt).try_init()?;
    }

    tracing::info!(json, "Tracing initialized");
    Ok(())
}
