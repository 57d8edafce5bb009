use crate::aggregate::merge;
use crate::config::{AppConfig, ConfigManager};
use crate::db::Store;
use crate::error::{Error, Result};
use crate::facets::folder_facets;
use crate::models::{Document, DocumentPatch, NewDocument};
use crate::ranking::{rank, Filters, FolderFilter};
use crate::scanner::{self, is_file_id};
use serde::Serialize;
use std::sync::Arc;

/// Parameters of a document listing.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub folder: Option<String>,
    /// Return folder facets instead of documents.
    pub folders_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Documents(Vec<Document>),
    Folders(Vec<String>),
}

/// Merges database documents with scanned Markdown files.
///
/// Nothing is cached: every call reads the database and rescans the
/// configured roots.
#[derive(Clone)]
pub struct DocumentService {
    store: Store,
    config: Arc<ConfigManager>,
}

impl DocumentService {
    pub fn new(store: Store, config: Arc<ConfigManager>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Listing> {
        let config = self.config.get().await;

        if query.folders_only {
            return self.folders(&config).await.map(Listing::Folders);
        }

        let filters = Filters::new(
            query.search.as_deref(),
            FolderFilter::from_param(query.folder.as_deref()),
        );

        // Folder equality can be pushed down to the database.
        let db_folder = match &filters.folder {
            FolderFilter::Named(name) => Some(name.clone()),
            FolderFilter::All => None,
        };
        let (files, db_docs) = tokio::join!(
            self.scan_files(&config),
            self.with_store(move |store| match db_folder {
                Some(folder) => store.get_documents_by_folder(&folder),
                None => store.get_documents(),
            })
        );
        let merged = merge(files, db_docs?);

        let ranked = rank(merged, &filters);
        log::debug!("Listing {} documents ({:?})", ranked.len(), filters);
        Ok(Listing::Documents(ranked))
    }

    /// Folder facets across both sources plus the configured baseline.
    pub async fn folders(&self, config: &AppConfig) -> Result<Vec<String>> {
        let (files, db_folders) = tokio::join!(
            self.scan_files(config),
            self.with_store(|store| store.get_folders())
        );
        Ok(folder_facets(
            &db_folders?,
            &files,
            &config.baseline_folders,
        ))
    }

    /// Look up one document. File ids are resolved against a fresh scan, so
    /// only files under a configured root can be returned.
    pub async fn get(&self, id: &str) -> Result<Document> {
        if is_file_id(id) {
            let config = self.config.get().await;
            return self
                .scan_files(&config)
                .await
                .into_iter()
                .find(|doc| doc.id == id)
                .ok_or_else(|| Error::document_not_found(id));
        }

        let id_owned = id.to_string();
        self.with_store(move |store| store.get_document(&id_owned))
            .await?
            .ok_or_else(|| Error::document_not_found(id))
    }

    pub async fn create(&self, doc: NewDocument) -> Result<Document> {
        if doc.title.trim().is_empty() {
            return Err(Error::InvalidInput("Title is required".to_string()));
        }
        self.with_store(move |store| store.create_document(doc)).await
    }

    pub async fn update(&self, id: &str, patch: DocumentPatch) -> Result<Document> {
        ensure_writable(id)?;
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(Error::InvalidInput("Title cannot be empty".to_string()));
        }

        let id_owned = id.to_string();
        self.with_store(move |store| store.update_document(&id_owned, patch))
            .await?
            .ok_or_else(|| Error::document_not_found(id))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        ensure_writable(id)?;

        let id_owned = id.to_string();
        let deleted = self
            .with_store(move |store| store.delete_document(&id_owned))
            .await?;
        if deleted {
            Ok(())
        } else {
            Err(Error::document_not_found(id))
        }
    }

    /// Scan the configured roots on the blocking pool. A failed scan task
    /// contributes no documents instead of failing the request.
    async fn scan_files(&self, config: &AppConfig) -> Vec<Document> {
        let roots = config.scan_roots.clone();
        let skip_dirs = config.skip_dirs.clone();

        match tokio::task::spawn_blocking(move || scanner::scan_roots(&roots, &skip_dirs)).await {
            Ok(docs) => docs,
            Err(e) => {
                log::error!("Filesystem scan failed, serving database documents only: {}", e);
                Vec::new()
            }
        }
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store)).await?
    }
}

/// File-backed documents cannot be modified through the service.
fn ensure_writable(id: &str) -> Result<()> {
    if is_file_id(id) {
        return Err(Error::ReadOnly(id.to_string()));
    }
    Ok(())
}
