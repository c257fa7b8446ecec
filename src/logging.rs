use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
/// Calling it again is harmless; the first subscriber stays in place.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
