//! Tracing initialisation.
//!
//! Uses [`ObservabilityConfig`] for WITHVENV_QUIET, WITHVENV_LOG_LEVEL and
//! WITHVENV_LOG_JSON. Logs go to stderr so they interleave with streamed
//! child output instead of mixing into stdout.

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize tracing. Call once at process startup; later calls are no-ops.
/// When WITHVENV_QUIET=1 only WARN and above are logged.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level = filter_directive(cfg);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn filter_directive(cfg: &ObservabilityConfig) -> String {
    if cfg.quiet {
        "withvenv=warn".to_string()
    } else {
        cfg.log_level.clone()
    }
}

/// Whether `[INFO]`-level progress should be suppressed.
pub fn is_quiet() -> bool {
    ObservabilityConfig::from_env().quiet
}

/// Quiet-mode aware `tracing::info!`.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{
        if !$crate::observability::is_quiet() {
            tracing::info!($($arg)*);
        }
    }};
}
