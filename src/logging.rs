//! Logging setup for the provider process.
//!
//! All logs go to **stderr**; stdout belongs to whatever protocol the host
//! speaks with the orchestrator.
//!
//! # Quick Start
//!
//! ```ignore
//! use prismacloud_provider::{init_logging, PrismaCloudProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_logging();
//!     tracing::info!("Starting provider");
//!     let provider = PrismaCloudProvider::new(client);
//!     // hand `provider` to the host adapter
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `prismacloud_provider=debug`).
//!   Poll retries are logged at `debug`, give-ups and drift at `warn`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when neither `RUST_LOG` nor a configured level is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

fn try_init_with(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and falls back to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LOG_LEVEL);
}

/// Initialize logging with a custom default level.
///
/// `default_level` is any `EnvFilter` directive (`debug`,
/// `prismacloud_provider=trace`, ...) and only applies when `RUST_LOG` is
/// unset. An unparsable directive falls back to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    if !try_init_with(default_level) {
        panic!("a global tracing subscriber is already set");
    }
}

/// Try to initialize logging, returning false if already initialized.
pub fn try_init_logging() -> bool {
    try_init_with(DEFAULT_LOG_LEVEL)
}

/// Like [`try_init_logging`], with the default taken from the provider
/// configuration's `log_level`.
pub fn try_init_logging_with_default(default_level: Option<&str>) -> bool {
    try_init_with(default_level.unwrap_or(DEFAULT_LOG_LEVEL))
}
