use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("gs_sweep={level},gs_runner={level},gridsearch={level},warn")
}

/// Initialise logging to stderr.
///
/// `RUST_LOG` takes precedence over `verbose`. Calling this twice (as tests
/// do) leaves the first subscriber in place.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let initialised = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init();

    if initialised.is_ok() {
        tracing::debug!(verbose, "logging initialised");
    }
}
