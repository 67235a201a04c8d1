//! Shared setup for fastgmail: configuration, logging and app-level errors.

pub mod config;
pub mod error;

pub use config::{
    AttachmentConfig, Config, DisplayConfig, GmailConfig, ValidationResult, ACCESS_TOKEN_ENV,
};
pub use error::{AppError, AuthError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging.
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("fastgmail core initialized");
    Ok(())
}
