// Logging setup shared by the coordinator and simulation binaries
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Sets up:
/// - Compact console output
/// - `EnvFilter` from `RUST_LOG`, falling back to `default_directive` (e.g. `"info"`)
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(
    service_name: &str,
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_directive))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()?;

    info!(
        target: "telemetry",
        service_name = %service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Tracing initialized"
    );
    Ok(())
}
