//! Error types for restock-renderer.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The embedded templates plus overrides do not compile as one set.
    #[error("templates failed to load: {0}")]
    Templates(#[source] tera::Error),

    #[error("cannot read template override {path}: {source}")]
    Override {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mail or page context could not be turned into template variables.
    #[error("cannot build {context} variables: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: tera::Error,
    },

    /// Usually an override that references a variable the context lacks.
    #[error("failed to render {template}: {source}")]
    Render {
        template: &'static str,
        #[source]
        source: tera::Error,
    },
}

impl RenderError {
    pub(crate) fn context(context: &'static str) -> impl FnOnce(tera::Error) -> RenderError {
        move |source| RenderError::Context { context, source }
    }
}
