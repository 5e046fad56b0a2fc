use std::path::Path;
use std::sync::Arc;

use restock_core::Config;
use restock_docstore::{DocumentStore, FirestoreClient};
use restock_renderer::Renderer;
use restock_sync::pipeline::template_dir_at;

use crate::error::WebError;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    docs: Arc<dyn DocumentStore>,
    renderer: Renderer,
}

impl AppState {
    pub fn new(docs: Arc<dyn DocumentStore>, renderer: Renderer) -> Self {
        AppState {
            inner: Arc::new(Inner { docs, renderer }),
        }
    }

    /// Firestore from `config`, templates from `<home>/.restock/templates/`.
    pub async fn from_config(home: &Path, config: &Config) -> Result<Self, WebError> {
        let docs = FirestoreClient::from_config(&config.document_store).await?;
        let renderer = Renderer::with_overrides(Some(&template_dir_at(home)))?;
        Ok(AppState::new(Arc::new(docs), renderer))
    }

    pub fn docs(&self) -> &dyn DocumentStore {
        self.inner.docs.as_ref()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.inner.renderer
    }
}
