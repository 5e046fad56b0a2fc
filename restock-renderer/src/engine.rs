//! Tera rendering engine: [`TemplateKind`] enum and [`Renderer`].
//!
//! # Templates
//!
//! | Kind                 | Template name                    |
//! |----------------------|----------------------------------|
//! | DailyReportSubject   | `mail/daily_report_subject.txt`  |
//! | DailyReportBody      | `mail/daily_report_body.txt`     |
//! | ReportErrorSubject   | `mail/report_error_subject.txt`  |
//! | ReportErrorBody      | `mail/report_error_body.txt`     |
//! | StorePage            | `page/store.html`                |
//! | ThanksPage           | `page/thanks.html`               |
//! | ErrorPage            | `page/error.html`                |
//!
//! Any of them can be overridden by dropping `<name>.tera` into the override
//! directory (`~/.restock/templates/` for the binaries). `.html` templates are
//! autoescaped; mail templates are not.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::{ErrorMailContext, PageContext, ReportContext};
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (
        "mail/daily_report_subject.txt",
        include_str!("templates/mail/daily_report_subject.txt.tera"),
    ),
    (
        "mail/daily_report_body.txt",
        include_str!("templates/mail/daily_report_body.txt.tera"),
    ),
    (
        "mail/report_error_subject.txt",
        include_str!("templates/mail/report_error_subject.txt.tera"),
    ),
    (
        "mail/report_error_body.txt",
        include_str!("templates/mail/report_error_body.txt.tera"),
    ),
    ("page/_layout.html", include_str!("templates/page/_layout.html.tera")),
    (
        "page/_manual_entry.html",
        include_str!("templates/page/_manual_entry.html.tera"),
    ),
    ("page/store.html", include_str!("templates/page/store.html.tera")),
    ("page/thanks.html", include_str!("templates/page/thanks.html.tera")),
    ("page/error.html", include_str!("templates/page/error.html.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Override {
        path: path.into(),
        source,
    }
}

/// `page\Store.html.tera` → `page/store.html`
fn normalize_template_name(path: &Path) -> String {
    let name = path.to_string_lossy().replace('\\', "/").to_lowercase();
    match name.strip_suffix(".tera") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_override_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents));
    }
    Ok(templates)
}

fn build_tera(override_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| ((*name).to_string(), (*content).to_string()))
        .collect();
    if let Some(dir) = override_dir {
        templates.extend(load_override_templates(dir)?);
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())
        .map_err(RenderError::Templates)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateKind
// ---------------------------------------------------------------------------

/// Every template the workspace renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    DailyReportSubject,
    DailyReportBody,
    ReportErrorSubject,
    ReportErrorBody,
    StorePage,
    ThanksPage,
    ErrorPage,
}

impl TemplateKind {
    pub fn all() -> &'static [TemplateKind] {
        &[
            TemplateKind::DailyReportSubject,
            TemplateKind::DailyReportBody,
            TemplateKind::ReportErrorSubject,
            TemplateKind::ReportErrorBody,
            TemplateKind::StorePage,
            TemplateKind::ThanksPage,
            TemplateKind::ErrorPage,
        ]
    }

    pub fn template_name(self) -> &'static str {
        match self {
            TemplateKind::DailyReportSubject => "mail/daily_report_subject.txt",
            TemplateKind::DailyReportBody    => "mail/daily_report_body.txt",
            TemplateKind::ReportErrorSubject => "mail/report_error_subject.txt",
            TemplateKind::ReportErrorBody    => "mail/report_error_body.txt",
            TemplateKind::StorePage          => "page/store.html",
            TemplateKind::ThanksPage         => "page/thanks.html",
            TemplateKind::ErrorPage          => "page/error.html",
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// A rendered plain-text mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub body: String,
}

/// Tera-based renderer. Create once and share; rendering takes `&self`.
pub struct Renderer {
    tera: Tera,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl Renderer {
    /// Embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_overrides(None)
    }

    /// Embedded templates, replaced by any `.tera` files under `dir`.
    pub fn with_overrides(dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Renderer { tera: build_tera(dir)? })
    }

    fn render(&self, kind: TemplateKind, ctx: &tera::Context) -> Result<String, RenderError> {
        let template = kind.template_name();
        let out = self
            .tera
            .render(template, ctx)
            .map_err(|source| RenderError::Render { template, source })?;
        Ok(out.replace('\r', ""))
    }

    fn render_mail(
        &self,
        subject: TemplateKind,
        body: TemplateKind,
        ctx: &tera::Context,
    ) -> Result<RenderedMail, RenderError> {
        // Subjects are single-line; a header with a newline is rejected by SMTP.
        let subject = self
            .render(subject, ctx)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(RenderedMail {
            subject,
            body: self.render(body, ctx)?,
        })
    }

    pub fn render_daily_report(&self, ctx: &ReportContext) -> Result<RenderedMail, RenderError> {
        self.render_mail(
            TemplateKind::DailyReportSubject,
            TemplateKind::DailyReportBody,
            &ctx.to_tera_context()?,
        )
    }

    pub fn render_report_error(&self, ctx: &ErrorMailContext) -> Result<RenderedMail, RenderError> {
        self.render_mail(
            TemplateKind::ReportErrorSubject,
            TemplateKind::ReportErrorBody,
            &ctx.to_tera_context()?,
        )
    }

    /// Render one of the page templates to HTML.
    pub fn render_page(&self, kind: TemplateKind, ctx: &PageContext) -> Result<String, RenderError> {
        self.render(kind, &ctx.to_tera_context()?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
