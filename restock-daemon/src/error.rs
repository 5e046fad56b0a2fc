use thiserror::Error;

/// Error surface for the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error in {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] restock_core::ConfigError),

    #[error("sync error: {0}")]
    Sync(#[from] restock_sync::SyncError),

    #[error("ctrl-c handler failed: {0}")]
    Signal(String),
}

pub(crate) fn io_err(context: &'static str, source: std::io::Error) -> DaemonError {
    DaemonError::Io { context, source }
}
