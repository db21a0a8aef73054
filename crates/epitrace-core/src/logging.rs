//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::VERSION;

static INIT: Once = Once::new();

/// Initialize the epitrace tracing/logging system.
///
/// Reads `EPITRACE_LOG` environment variable for per-subsystem log levels.
/// Format: `EPITRACE_LOG=epitrace_graph=debug,epitrace_core=warn`
///
/// Falls back to `epitrace=info` if `EPITRACE_LOG` is not set or is invalid.
///
/// This function is idempotent — calling it multiple times is safe.
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("EPITRACE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("epitrace=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .init();

        tracing::info!(version = VERSION, "epitrace logging initialized");
    });
}
