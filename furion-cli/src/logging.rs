use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const ENV_LOG: &str = "FURION_LOG";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Console logging to stderr. `FURION_LOG` takes an `EnvFilter` directive;
/// otherwise `info`, or `debug` with `--verbose`.
pub fn init(verbose: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let default = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        // Embedding hosts may already have installed a subscriber.
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already set");
        }
    });
}
