use std::sync::Once;

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// A simple logger.
///
/// Set the `RUST_LOG` environment variable to `debug` to see every verified ecdsa instance, or
/// to `trace` to also see incomplete ones.
pub fn setup_logger() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));

        tracing_subscriber::fmt::Subscriber::builder()
            .compact()
            .with_file(false)
            .with_target(false)
            .with_thread_names(false)
            .without_time()
            .with_env_filter(env_filter)
            .finish()
            .init();
    });
}
