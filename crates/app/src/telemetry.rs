//! Tracing subscriber setup for the annotate binary.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Install the global subscriber: `RUST_LOG` wins, otherwise `info`
/// (`debug` under `--verbose`).
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_filter(env_filter),
        )
        .init();
}
