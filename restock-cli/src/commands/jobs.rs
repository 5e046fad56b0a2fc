//! Batch jobs: `intake`, `sync`, `delete`, `report`, `report-sheet`.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use restock_core::FileRegistry;
use restock_sync::{
    delete, pipeline, DeleteOutcome, IntakeOptions, IntakeOutcome, IntakeSummary, Job, JobOutcome,
    ReportOutcome, SyncOutcome,
};

fn run_job(job: Job) -> Result<JobOutcome> {
    let home = super::home()?;
    let label = format!("{job:?}");
    super::block_on(async move {
        let ctx = super::job_context(&home).await?;
        pipeline::run(&ctx, job, Utc::now())
            .await
            .with_context(|| format!("{label} failed"))
    })?
}

// ---------------------------------------------------------------------------
// intake
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct IntakeArgs {
    /// Counter value assigned to the first survey row.
    #[arg(long, default_value_t = 1)]
    pub counter_start: u32,
}

impl IntakeArgs {
    pub fn run(self) -> Result<()> {
        let options = IntakeOptions {
            counter_start: self.counter_start,
        };
        if let JobOutcome::Intake(summary) = run_job(Job::Intake(options))? {
            print_intake(&summary);
        }
        Ok(())
    }
}

fn print_intake(summary: &IntakeSummary) {
    println!(
        "✓ intake finished ({} created, {} skipped, {} deferred, {} rejected, {} mirror failures)",
        summary.created(),
        summary.skipped(),
        summary.deferred(),
        summary.rejected(),
        summary.mirror_failed()
    );
    for outcome in &summary.outcomes {
        match outcome {
            IntakeOutcome::Created { row, store_id } => println!("  +  {store_id} (row {row})"),
            IntakeOutcome::Skipped { row, store_id } => {
                println!("  ·  {store_id} (row {row}) already registered")
            }
            IntakeOutcome::Deferred {
                row,
                store_id,
                error,
            } => println!("  ~  {store_id} (row {row}) deferred: {error}"),
            IntakeOutcome::Rejected { row, reason } => println!("  ✗  row {row} rejected: {reason}"),
            IntakeOutcome::MirrorFailed {
                row,
                store_id,
                error,
            } => println!("  !  {store_id} (row {row}) not mirrored, flagged for sync: {error}"),
        }
    }
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

pub fn sync() -> Result<()> {
    match run_job(Job::Sync)? {
        JobOutcome::Sync(SyncOutcome::NothingFlagged) => {
            println!("No stores are flagged. Flag rows with `restock flag <id>`.");
        }
        JobOutcome::Sync(SyncOutcome::Completed { synced, failed }) => {
            println!(
                "✓ sync finished ({} synced, {} failed)",
                synced.len(),
                failed.len()
            );
            for id in &synced {
                println!("  ✎  {id}");
            }
            for (id, error) in &failed {
                println!("  ✗  {id}: {error} (still flagged)");
            }
        }
        _ => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// delete
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Actually delete. Without it the flagged rows are only listed.
    #[arg(long)]
    pub yes: bool,
}

impl DeleteArgs {
    pub fn run(self) -> Result<()> {
        if !self.yes {
            let home = super::home()?;
            let registry = FileRegistry::open_at(&home)
                .context("failed to open registry — run `restock init` first")?;
            let targets = delete::preview(&registry).context("failed to read flagged rows")?;
            if targets.is_empty() {
                println!("No stores are flagged.");
                return Ok(());
            }
            println!("[dry-run] {} flagged stores would be deleted:", targets.len());
            for record in &targets {
                println!("  -  {} {}", record.store_id, record.name);
            }
            println!("Re-run with --yes to delete them.");
            return Ok(());
        }

        match run_job(Job::DeleteFlagged)? {
            JobOutcome::Delete(DeleteOutcome::NothingFlagged) => println!("No stores are flagged."),
            JobOutcome::Delete(DeleteOutcome::Completed { deleted, failed }) => {
                println!(
                    "✓ delete finished ({} deleted, {} failed)",
                    deleted.len(),
                    failed.len()
                );
                for id in &deleted {
                    println!("  -  {id}");
                }
                for (id, error) in &failed {
                    println!("  ✗  {id}: {error} (row kept)");
                }
            }
            _ => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// report / report-sheet
// ---------------------------------------------------------------------------

pub fn report() -> Result<()> {
    if let JobOutcome::Report(outcome) = run_job(Job::DailyReport)? {
        match outcome {
            ReportOutcome::NoReports => println!("No restock reports on record. Nothing sent."),
            ReportOutcome::NoActivity { listed } => {
                println!("No reports today ({listed} older reports). Nothing sent.")
            }
            ReportOutcome::Sent { date, rows } => {
                println!("✓ report for {date} sent ({} stores)", rows.len());
                for row in &rows {
                    println!("  ✉  {} {}", row.store_id, row.name);
                }
            }
            ReportOutcome::Failed { message } => {
                anyhow::bail!("daily report failed (error mail attempted): {message}")
            }
        }
    }
    Ok(())
}

pub fn report_sheet() -> Result<()> {
    if let JobOutcome::ReportSheet { rows } = run_job(Job::RefreshReportSheet)? {
        println!("✓ Report sheet rebuilt ({rows} rows)");
    }
    Ok(())
}
