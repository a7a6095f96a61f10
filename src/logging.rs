//! `tracing` subscriber setup for the `vsh` binary.
//!
//! The library only emits events. The filter comes from `RUST_LOG` (which may be set
//! in a `.env` file) and defaults to `info`. Events go to stderr so stdout stays
//! reserved for the run summary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    // A second init (e.g. from tests driving `app::run`) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
