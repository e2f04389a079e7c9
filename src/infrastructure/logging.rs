//! Logging system initialization
//!
//! Console logging with `RUST_LOG`-style filtering. Collection jobs run
//! unattended, so the default level keeps per-gazette progress visible.

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Initialize logging with the default `info` filter.
pub fn init_logging() -> Result<()> {
    init_logging_with_filter("info")
}

/// Initialize logging; the environment filter wins over `default_filter`.
pub fn init_logging_with_filter(default_filter: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))
}
