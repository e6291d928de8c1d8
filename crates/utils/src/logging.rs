use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "server=info,services=info,db=info,tower_http=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // try_init: tests and tools may have installed a subscriber already
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(env_filter))
        .try_init();
}
