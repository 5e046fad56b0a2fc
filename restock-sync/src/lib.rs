//! # restock-sync
//!
//! The batch workflows that move data between the registry and the document
//! store, and the daily report built on top of them.
//!
//! Every workflow is an independent job: [`pipeline::run`] opens the
//! registry, runs one [`pipeline::Job`], and returns its outcome. Document
//! calls inside a job may run concurrently but are always joined before the
//! outcome is decided.

pub mod audit;
pub mod cache;
pub mod delete;
pub mod error;
pub mod intake;
pub mod mailer;
pub mod pipeline;
pub mod public;
pub mod reconcile;
pub mod report;

pub use cache::{CacheBackend, MokaCache, StoreLookup};
pub use delete::{delete_flagged, DeleteOutcome};
pub use error::SyncError;
pub use intake::{run_intake, IntakeOptions, IntakeOutcome, IntakeSummary};
pub use mailer::{MailError, Mailer, Outbox, SmtpMailer};
pub use pipeline::{Context, Job, JobOutcome};
pub use public::{lookup_store, submit_report, LookupOutcome};
pub use reconcile::{reconcile, SyncOutcome};
pub use report::{refresh_report_sheet, send_daily_report, ReportOutcome, ReportSettings};
