//! `restock daemon`: run the daily report on schedule.

use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct DaemonArgs {}

impl DaemonArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        restock_daemon::start_blocking(&home).context("daemon exited with error")
    }
}
