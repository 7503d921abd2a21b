use anyhow::{Context, Result};
use checklist_pdf_core::{AppConfig, DocumentAssembler};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::document_store::DocumentStore;

/// A generated document waiting to be downloaded.
///
/// The PDF and its audit record live in the [`DocumentStore`].
pub struct StoredDocument {
    /// Download file name, without extension
    pub file_stem: String,
    pub created_at: Instant,
}

/// Global application state
pub struct AppState {
    /// Shared by every request; assembly itself holds no per-request state
    pub assembler: Arc<DocumentAssembler>,
    /// Template bytes, read once at startup
    pub template: Arc<Vec<u8>>,
    pub template_name: String,
    documents: RwLock<HashMap<Uuid, StoredDocument>>,
    store: DocumentStore,
    max_age: Duration,
}

impl AppState {
    pub fn new(config: AppConfig, template_path: &Path, max_age: Duration) -> Result<Self> {
        let template = std::fs::read(template_path)
            .with_context(|| format!("Failed to read template: {}", template_path.display()))?;
        let template_name = template_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("template.pdf")
            .to_string();

        Self::with_template(config, template, template_name, max_age)
    }

    pub fn with_template(
        config: AppConfig,
        template: Vec<u8>,
        template_name: String,
        max_age: Duration,
    ) -> Result<Self> {
        let assembler = DocumentAssembler::new(config).context("Failed to load fonts")?;
        let store = DocumentStore::new().context("Failed to create document store")?;

        Ok(Self {
            assembler: Arc::new(assembler),
            template: Arc::new(template),
            template_name,
            documents: RwLock::new(HashMap::new()),
            store,
            max_age,
        })
    }

    // =========================================================================
    // Document registry
    // =========================================================================

    /// Register a document whose files have been written.
    pub async fn register(&self, id: Uuid, file_stem: String) {
        let document = StoredDocument {
            file_stem,
            created_at: Instant::now(),
        };
        self.documents.write().await.insert(id, document);
        debug!("Registered document {}", id);
    }

    /// Look up a document by ID string and map it inside the read lock.
    ///
    /// Returns `None` if the ID is not a valid UUID or the document expired.
    pub async fn with_document<F, R>(&self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(Uuid, &StoredDocument) -> R,
    {
        let uuid = Uuid::parse_str(id).ok()?;
        let documents = self.documents.read().await;
        documents.get(&uuid).map(|doc| f(uuid, doc))
    }

    pub fn pdf_path(&self, id: Uuid) -> PathBuf {
        self.store.pdf_path(id)
    }

    pub fn audit_path(&self, id: Uuid) -> PathBuf {
        self.store.audit_path(id)
    }

    /// Drop documents older than the configured maximum age.
    pub async fn cleanup_expired(&self) -> usize {
        let mut documents = self.documents.write().await;
        let now = Instant::now();
        let expired: Vec<Uuid> = documents
            .iter()
            .filter(|(_, doc)| now.duration_since(doc.created_at) >= self.max_age)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            documents.remove(id);
            self.store.remove(*id);
        }
        if !expired.is_empty() {
            info!("Expired {} documents", expired.len());
        }
        expired.len()
    }
}
