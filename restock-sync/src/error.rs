//! Error types for restock-sync.

use thiserror::Error;

use restock_core::error::{ConfigError, RegistryError};
use restock_docstore::DocError;
use restock_renderer::RenderError;

use crate::mailer::MailError;

/// Job-level failures. Per-item failures (one store, one report) never
/// surface here; they are recorded in the job's outcome instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("document store error: {0}")]
    Doc(#[from] DocError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
