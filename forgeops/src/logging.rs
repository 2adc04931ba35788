//! Diagnostic tracing for forgeops commands.
//!
//! Progress and diagnostics go to stderr through `tracing`. The final
//! per-command summary is product output and is printed to stdout by the
//! binary, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "forgeops=info,warn";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `forgeops=info,warn` so created, reused and
/// planned nodes are visible while a run progresses.
///
/// # Example
/// ```bash
/// RUST_LOG=forgeops=debug forgeops create-hierarchy --file structure.md --dry-run
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
