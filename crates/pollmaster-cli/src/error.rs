use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pollmaster_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid time '{0}': expected RFC 3339, e.g. 2026-05-01T09:00:00Z")]
    InvalidTime(String),
    #[error("Nothing to update: pass at least one field")]
    EmptyPatch,
    #[error(
        "Profile '{0}' is not configured. Run `pollmaster config init --profile {0} --api-base-url <URL>` first."
    )]
    ProfileNotConfigured(String),
}
