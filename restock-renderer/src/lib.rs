//! # restock-renderer
//!
//! Tera templates for the daily report mail, the report error mail and the
//! public reporting page.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use restock_renderer::{ReportContext, Renderer};
//!
//! fn subject_line() -> Option<String> {
//!     let renderer = Renderer::new().ok()?;
//!     let date = NaiveDate::from_ymd_opt(2024, 10, 19)?;
//!     let ctx = ReportContext::new(date, vec![]);
//!     renderer.render_daily_report(&ctx).ok().map(|mail| mail.subject)
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{ErrorMailContext, PageContext, ReportContext, ReportEntryCtx, StoreCtx};
pub use engine::{RenderedMail, Renderer, TemplateKind};
pub use error::RenderError;
