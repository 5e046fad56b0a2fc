//! `restock status` and `restock flag`.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use restock_core::{registry, FileRegistry, StoreId, StoreRecord, StoreRepository, Workbook};

// ---------------------------------------------------------------------------
// flag
// ---------------------------------------------------------------------------

/// Set (or clear) the sync flag on registry rows.
#[derive(Args, Debug)]
pub struct FlagArgs {
    /// Store ids to flag.
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Clear the flag instead of setting it.
    #[arg(long)]
    pub clear: bool,
}

impl FlagArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let mut registry = FileRegistry::open_at(&home)
            .context("failed to open registry — run `restock init` first")?;

        let flag = !self.clear;
        let ids: Vec<StoreId> = self.ids.iter().map(|id| StoreId::from(id.trim())).collect();
        let found = registry
            .edit(|book| {
                ids.iter()
                    .map(|id| (id.clone(), book.set_flag(id, flag)))
                    .collect::<Vec<_>>()
            })
            .context("failed to save registry")?;

        let mut missing = 0;
        for (id, ok) in found {
            if ok {
                let verb = if flag { "flagged" } else { "cleared" };
                println!("✓ {id} {verb}");
            } else {
                eprintln!("✗ no registry row holds store id '{id}'");
                missing += 1;
            }
        }
        if missing > 0 {
            bail!("{missing} store id(s) not found");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

/// Show the Store sheet.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusJson {
    summary: SummaryJson,
    stores: Vec<StoreRecord>,
    /// Ids held by several rows; those rows are skipped by every job.
    duplicates: Vec<StoreId>,
}

#[derive(Serialize)]
struct SummaryJson {
    stores: usize,
    flagged: usize,
    survey_rows: usize,
    report_rows: usize,
}

#[derive(Tabled)]
struct StoreTableRow {
    #[tabled(rename = "store id")]
    store_id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "address")]
    address: String,
    #[tabled(rename = "sync")]
    sync: String,
    #[tabled(rename = "last synced")]
    last_synced: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let book = registry::load_at(&home)
            .context("failed to load registry — run `restock init` first")?;
        let stores = book.list().context("failed to read store rows")?;
        let duplicates = book.duplicate_ids().context("failed to read store rows")?;

        if self.json {
            print_json(&book, stores, duplicates)
        } else {
            print_table(&book, stores, &duplicates);
            Ok(())
        }
    }
}

fn summary(book: &Workbook, stores: &[StoreRecord]) -> SummaryJson {
    SummaryJson {
        stores: stores.len(),
        flagged: stores.iter().filter(|s| s.pending_sync).count(),
        survey_rows: book.survey.len(),
        report_rows: book.reports.len(),
    }
}

fn print_json(book: &Workbook, stores: Vec<StoreRecord>, duplicates: Vec<StoreId>) -> Result<()> {
    let payload = StatusJson {
        summary: summary(book, &stores),
        stores,
        duplicates,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(book: &Workbook, stores: Vec<StoreRecord>, duplicates: &[StoreId]) {
    let s = summary(book, &stores);
    println!(
        "restock v{} | {} stores | {} flagged | {} survey rows | {} report rows",
        env!("CARGO_PKG_VERSION"),
        s.stores,
        s.flagged,
        s.survey_rows,
        s.report_rows,
    );
    for id in duplicates {
        println!(
            "{} store id {id} is held by more than one row; those rows are skipped",
            "⚠".red().bold()
        );
    }
    if stores.is_empty() {
        println!("No stores registered.");
        return;
    }

    let rows: Vec<StoreTableRow> = stores
        .into_iter()
        .map(|store| StoreTableRow {
            store_id: store.store_id.to_string(),
            name: store.name,
            address: store.address,
            sync: if store.pending_sync {
                "■ PENDING".yellow().bold().to_string()
            } else {
                "■ OK".green().bold().to_string()
            },
            last_synced: store
                .last_synced_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string()),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if s.flagged > 0 {
        println!("Run 'restock sync' to push flagged stores.");
    }
}
