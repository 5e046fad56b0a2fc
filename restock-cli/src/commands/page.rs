//! Public page operations: `lookup`, `submit`, `serve`.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use restock_core::{config, StoreId};
use restock_sync::{lookup_store, submit_report, LookupOutcome};
use restock_web::AppState;

#[derive(Args, Debug)]
pub struct LookupArgs {
    pub id: String,
}

impl LookupArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let id = StoreId::parse(&self.id)?;
        let outcome = super::block_on(async {
            let ctx = super::job_context(&home).await?;
            Ok::<_, anyhow::Error>(lookup_store(ctx.docs(), &id).await)
        })??;

        match outcome {
            LookupOutcome::Found { id, info } => {
                println!("店舗ID: {id}");
                println!("店舗名: {}", info.name);
                println!("住所: {}", info.address);
                Ok(())
            }
            LookupOutcome::NotFound { id } => anyhow::bail!("店舗ID: {id} の情報が見つかりません"),
            LookupOutcome::Invalid { id } => anyhow::bail!("'{id}' is not a store id"),
            LookupOutcome::Unavailable { id, message } => {
                anyhow::bail!("lookup of {id} failed: {message}")
            }
        }
    }
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    pub id: String,
}

impl SubmitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let id = StoreId::parse(&self.id)?;
        let report = super::block_on(async {
            let ctx = super::job_context(&home).await?;
            submit_report(ctx.docs(), &id, Utc::now())
                .await
                .with_context(|| format!("failed to submit report for {id}"))
        })??;
        println!(
            "✓ report recorded for {} at {}",
            report.store_id,
            report.reported_at.to_rfc3339()
        );
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address. Defaults to `web.bind` from the config.
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = config::load_at(&home).context("failed to load config")?;
        let bind = self.bind.unwrap_or_else(|| config.web.bind.clone());
        super::block_on(async {
            let state = AppState::from_config(&home, &config)
                .await
                .context("failed to set up page state")?;
            restock_web::serve(&bind, state)
                .await
                .context("page server exited with error")
        })?
    }
}
