//! Shared job entrypoint used by CLI and daemon.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{error, info};

use restock_core::{config::Config, error::ConfigError, registry, FileRegistry};
use restock_docstore::{DocumentStore, FirestoreClient};
use restock_renderer::Renderer;

use crate::cache::StoreLookup;
use crate::delete::{delete_flagged, DeleteOutcome};
use crate::error::SyncError;
use crate::intake::{run_intake, IntakeOptions, IntakeSummary};
use crate::mailer::{Mailer, SmtpMailer};
use crate::reconcile::{reconcile, SyncOutcome};
use crate::report::{
    refresh_report_sheet, send_daily_report, send_error_report, ReportOutcome, ReportSettings,
};

/// One batch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Intake(IntakeOptions),
    Sync,
    DeleteFlagged,
    DailyReport,
    RefreshReportSheet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Intake(IntakeSummary),
    Sync(SyncOutcome),
    Delete(DeleteOutcome),
    Report(ReportOutcome),
    ReportSheet { rows: usize },
}

/// Long-lived collaborators shared by every job. The daemon keeps one
/// `Context` for its whole life so the store cache outlives a single tick.
pub struct Context {
    home: PathBuf,
    lookup: StoreLookup,
    renderer: Renderer,
    mailer: Option<Arc<dyn Mailer>>,
    recipient: Option<String>,
    offset: FixedOffset,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("home", &self.home)
            .field("lookup", &self.lookup)
            .field("recipient", &self.recipient)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

/// `<home>/.restock/templates/`
pub fn template_dir_at(home: &Path) -> PathBuf {
    registry::restock_root(home).join("templates")
}

impl Context {
    /// Wire up the Firestore client, SMTP relay and renderer described by
    /// `config`. SMTP is optional until a report job needs it.
    pub async fn from_config(home: &Path, config: &Config) -> Result<Self, SyncError> {
        let docs: Arc<dyn DocumentStore> =
            Arc::new(FirestoreClient::from_config(&config.document_store).await?);
        let mailer = match &config.smtp {
            Some(smtp) => {
                Some(Arc::new(SmtpMailer::from_config(smtp, &config.report.from)?) as Arc<dyn Mailer>)
            }
            None => None,
        };
        let renderer = Renderer::with_overrides(Some(&template_dir_at(home)))?;
        Ok(Context {
            home: home.to_path_buf(),
            lookup: StoreLookup::in_memory(docs, config.cache_ttl()),
            renderer,
            mailer,
            recipient: config.recipient().ok().map(str::to_owned),
            offset: config.utc_offset()?,
        })
    }

    /// Assemble a context from parts (tests, alternative stores).
    pub fn new(
        home: &Path,
        docs: Arc<dyn DocumentStore>,
        mailer: Option<Arc<dyn Mailer>>,
        recipient: Option<String>,
        offset: FixedOffset,
        cache_ttl: Duration,
    ) -> Result<Self, SyncError> {
        Ok(Context {
            home: home.to_path_buf(),
            lookup: StoreLookup::in_memory(docs, cache_ttl),
            renderer: Renderer::with_overrides(Some(&template_dir_at(home)))?,
            mailer,
            recipient,
            offset,
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn lookup(&self) -> &StoreLookup {
        &self.lookup
    }

    pub fn docs(&self) -> &dyn DocumentStore {
        self.lookup.docs()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    fn report_settings(&self) -> Result<(ReportSettings, &dyn Mailer), SyncError> {
        let recipient = self
            .recipient
            .clone()
            .ok_or(ConfigError::Missing("report.recipient"))?;
        let mailer = self.mailer.as_deref().ok_or(ConfigError::Missing("smtp"))?;
        Ok((
            ReportSettings {
                recipient,
                offset: self.offset,
            },
            mailer,
        ))
    }
}

/// Run one job against the registry under the context's home.
///
/// This is the canonical entrypoint for both `restock <job>` and the daemon.
///
/// The daily report mails its own failures, including a registry that cannot
/// be opened. It only returns `Err` when there is nobody to mail.
pub async fn run(ctx: &Context, job: Job, now: DateTime<Utc>) -> Result<JobOutcome, SyncError> {
    if job == Job::DailyReport {
        return run_daily_report(ctx, now).await;
    }
    let mut registry = FileRegistry::open_at(&ctx.home)?;
    info!(?job, "running job");
    let outcome = match job {
        Job::Intake(options) => {
            JobOutcome::Intake(run_intake(&mut registry, ctx.docs(), &options).await?)
        }
        Job::Sync => JobOutcome::Sync(reconcile(&mut registry, &ctx.lookup, now).await?),
        Job::DeleteFlagged => JobOutcome::Delete(delete_flagged(&mut registry, &ctx.lookup).await?),
        Job::DailyReport => return run_daily_report(ctx, now).await,
        Job::RefreshReportSheet => JobOutcome::ReportSheet {
            rows: refresh_report_sheet(&mut registry, &ctx.lookup, ctx.offset).await?,
        },
    };
    Ok(outcome)
}

async fn run_daily_report(ctx: &Context, now: DateTime<Utc>) -> Result<JobOutcome, SyncError> {
    let (settings, mailer) = ctx.report_settings()?;
    info!(job = ?Job::DailyReport, "running job");
    let mut registry = match FileRegistry::open_at(&ctx.home) {
        Ok(registry) => registry,
        Err(e) => {
            // No audit trail without a registry; the mail is the only record.
            let message = format!("registry could not be opened: {e}");
            error!(error = %message, "daily report failed");
            // Send failures are already logged inside.
            let _ = send_error_report(&ctx.renderer, mailer, &settings.recipient, &message).await;
            return Ok(JobOutcome::Report(ReportOutcome::Failed { message }));
        }
    };
    Ok(JobOutcome::Report(
        send_daily_report(&mut registry, &ctx.lookup, &ctx.renderer, mailer, &settings, now).await,
    ))
}
