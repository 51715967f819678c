//! Tracing subscriber setup for the binary.
//!
//! Logs go to stderr so report output on stdout stays machine readable.
//! `RUST_LOG` wins over the defaults below.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "pipeline_lint=info";
const DEBUG_FILTER: &str = "pipeline_lint=debug";

pub fn init_tracing(debug: bool) {
    let default = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .with_file(debug)
        .with_line_number(debug);

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
