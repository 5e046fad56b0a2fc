//! `restock survey add`: one row per survey form submission.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use restock_core::{types::SurveyRow, FileRegistry, RegistrySheets, SurveyResponse};

#[derive(Subcommand, Debug)]
pub enum SurveyCommand {
    /// Append a submission to the Survey sheet.
    Add(SurveyAddArgs),
}

#[derive(Args, Debug)]
pub struct SurveyAddArgs {
    /// Store name as entered on the form.
    #[arg(long)]
    pub name: String,

    /// Store address.
    #[arg(long)]
    pub location: String,

    /// 初めて | 複数回 | その他 (or first | multiple | other).
    #[arg(long)]
    pub frequency: String,

    /// 自分が設置にいけば | 別のメンバーが行っても可能 | その他
    /// (or self | other-member | other).
    #[arg(long)]
    pub continuity: String,

    /// Submission time (RFC 3339). Defaults to now.
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

pub fn run(command: SurveyCommand) -> Result<()> {
    match command {
        SurveyCommand::Add(args) => add(args),
    }
}

fn add(args: SurveyAddArgs) -> Result<()> {
    let home = super::home()?;
    let row = SurveyRow {
        timestamp: args.at.unwrap_or_else(Utc::now),
        store_name: args.name,
        location: args.location,
        installation_frequency: args.frequency,
        continuity_feasibility: args.continuity,
    };
    SurveyResponse::try_from(&row).context("survey answers are not valid")?;

    let mut registry =
        FileRegistry::open_at(&home).context("failed to open registry — run `restock init` first")?;
    registry
        .append_survey_row(row)
        .context("failed to append survey row")?;
    let count = registry.survey_rows().map(|rows| rows.len()).unwrap_or_default();
    println!("✓ Survey row {count} recorded. Run `restock intake` to register it.");
    Ok(())
}
