//! `restock init [--project-id <id>]`

use anyhow::{Context, Result};
use clap::Args;

use restock_core::{config, registry, Config};

/// Create the registry workbook and a starter config.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Firestore project the stores are mirrored to.
    #[arg(long, default_value = "restock")]
    pub project_id: String,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;

        let workbook = registry::init_at(&home).context("failed to create registry")?;
        println!(
            "✓ Registry ready ({} stores) at {}",
            workbook.stores.len(),
            registry::registry_path_at(&home).display()
        );

        let written = config::write_if_absent_at(&home, &Config::template(&self.project_id))
            .context("failed to write config")?;
        let path = config::config_path_at(&home);
        if written {
            println!("✓ Config written to {}", path.display());
            println!("  Set report.recipient and smtp before running `restock report`.");
        } else {
            println!("· Config already present at {}", path.display());
        }
        Ok(())
    }
}
