//! Command-line driver for executor hop insertion.
//!
//! The driver has no front end: it ships a catalog of [`scenarios`], each a
//! small module built with [`hop_isolation::BodyBuilder`], and runs them
//! through [`hop_isolation::lower_module`].
//!
//! - `list`: the bundled scenarios
//! - `emit [scenario]`: lowered hop IR plus diagnostics
//! - `trace <scenario>`: simulate the entry function and print where
//!   every call ran
//! - `explain <code>`: documentation for an error code

pub mod commands;
pub mod options;
pub mod scenarios;

pub use commands::Report;
pub use options::{parse_driver_options, DriverOptions};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the tracing subscriber once per process.
///
/// Does nothing unless `RUST_LOG` is set or `verbose` is on; `verbose`
/// without `RUST_LOG` logs the isolation passes at `trace` level.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if verbose {
            EnvFilter::new("hop_isolation=trace")
        } else {
            return;
        };

        tracing_subscriber::registry()
            .with(
                tracing_tree::HierarchicalLayer::new(2)
                    .with_targets(true)
                    .with_bracketed_fields(true),
            )
            .with(filter)
            .init();
    });
}
