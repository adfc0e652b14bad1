use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Installs a global fmt subscriber filtered with `RUST_LOG`. An already installed subscriber is
/// kept.
pub fn install_tracing_logger() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
    {
        debug!(%error, "Tracing subscriber already installed");
    }
}
