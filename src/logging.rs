//! Diagnostic logging.
//!
//! Events go to stderr through `tracing-subscriber`; command results are
//! printed to stdout, so piping `afl` output is unaffected. `RUST_LOG`
//! overrides the default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "affiliate_lookup=info,affiliate_lookup_core=info";
const VERBOSE_FILTER: &str = "affiliate_lookup=debug,affiliate_lookup_core=debug";

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(verbose: bool) {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
