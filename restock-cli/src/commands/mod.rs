pub mod daemon;
pub mod init;
pub mod jobs;
pub mod page;
pub mod status;
pub mod survey;

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use restock_core::config;
use restock_sync::Context;

pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Run `fut` to completion on a fresh runtime.
pub fn block_on<F: Future>(fut: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(fut))
}

/// Job context from `<home>/.restock/config.yaml`.
pub async fn job_context(home: &Path) -> Result<Context> {
    let config = config::load_at(home).context("failed to load config")?;
    Context::from_config(home, &config)
        .await
        .context("failed to set up document store, mailer or templates")
}
