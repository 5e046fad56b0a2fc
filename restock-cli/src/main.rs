//! restock: store registry, document mirror and daily restock report.
//!
//! # Usage
//!
//! ```text
//! restock init [--project-id <id>]
//! restock survey add --name <name> --location <addr> --frequency <answer> --continuity <answer>
//! restock intake [--counter-start <n>]
//! restock flag <id>... [--clear]
//! restock sync
//! restock delete [--yes]
//! restock report
//! restock report-sheet
//! restock lookup <id>
//! restock submit <id>
//! restock status [--json]
//! restock serve [--bind <addr>]
//! restock daemon
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonArgs,
    init::InitArgs,
    jobs::{DeleteArgs, IntakeArgs},
    page::{LookupArgs, ServeArgs, SubmitArgs},
    status::{FlagArgs, StatusArgs},
    survey::SurveyCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "restock",
    version,
    about = "Register stores, mirror them to Firestore and mail the daily restock report",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the registry and a starter config under ~/.restock.
    Init(InitArgs),

    /// Record survey form submissions.
    Survey {
        #[command(subcommand)]
        command: SurveyCommand,
    },

    /// Register every survey row not yet in the registry.
    Intake(IntakeArgs),

    /// Mark stores for the next sync (or delete).
    Flag(FlagArgs),

    /// Push every flagged store to the document store.
    Sync,

    /// Delete every flagged store from the document store and the registry.
    Delete(DeleteArgs),

    /// Build and mail today's restock report.
    Report,

    /// Rebuild the Report sheet from every restock report on record.
    ReportSheet,

    /// Show a store as the public page would.
    Lookup(LookupArgs),

    /// Record a "last copy taken" report for a store.
    Submit(SubmitArgs),

    /// Show the Store sheet.
    Status(StatusArgs),

    /// Serve the public reporting page.
    Serve(ServeArgs),

    /// Run the daily report at the configured time until ctrl-c.
    Daemon(DaemonArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    restock_daemon::init_tracing();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Survey { command } => commands::survey::run(command),
        Commands::Intake(args) => args.run(),
        Commands::Flag(args) => args.run(),
        Commands::Sync => commands::jobs::sync(),
        Commands::Delete(args) => args.run(),
        Commands::Report => commands::jobs::report(),
        Commands::ReportSheet => commands::jobs::report_sheet(),
        Commands::Lookup(args) => args.run(),
        Commands::Submit(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Serve(args) => args.run(),
        Commands::Daemon(args) => args.run(),
    }
}
