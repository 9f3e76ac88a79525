use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Debug mode prints human-readable lines at `debug` level; otherwise events
/// are emitted as JSON at `info`. `RUST_LOG` overrides either default.
/// Calling this twice is harmless; the second install is ignored.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = if debug {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!("Tracing subscriber already installed: {e}");
    }
}
