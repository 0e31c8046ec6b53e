use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: Once = Once::new();

/// Installs a compact console subscriber. `RUST_LOG` overrides the `default` filter.
///
/// Safe to call more than once; a subscriber installed elsewhere is left alone.
pub fn init_logging(default: &str) {
    LOGGER_INITIALIZED.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default));

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter);

        let _ = tracing_subscriber::registry()
            .with(console_layer)
            .try_init();
    });
}
