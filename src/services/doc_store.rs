use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::clients::doc_service_client::DocServiceClient;
use crate::config::Config;
use crate::models::DocumentUpdate;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Text and version the hub seeds a room with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub content: String,
    pub version: i64,
}

/// Durable home of document content. The hub only reads it when a room opens
/// and writes it back when a dirty room closes.
pub trait DocumentStore: Send + Sync {
    /// Load a document. `Ok(None)` means it does not exist.
    fn load<'a>(&'a self, document_id: &'a str) -> StoreFuture<'a, Option<StoredDocument>>;

    /// Replace a document's content.
    fn save<'a>(&'a self, document_id: &'a str, content: &'a str) -> StoreFuture<'a, ()>;
}

#[derive(Debug)]
pub enum StoreError {
    Http(reqwest::Error),
    Token(jsonwebtoken::errors::Error),
    Status(u16),
    NotFound(String),
    InvalidId(String),
    InvalidUrl(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Http(e) => write!(f, "Document service request failed: {}", e),
            StoreError::Token(e) => write!(f, "Failed to sign service token: {}", e),
            StoreError::Status(code) => write!(f, "Document service answered with status {}", code),
            StoreError::NotFound(id) => write!(f, "Document '{}' not found", id),
            StoreError::InvalidId(id) => write!(f, "Invalid document id '{}'", id),
            StoreError::InvalidUrl(url) => write!(f, "Invalid document service URL '{}'", url),
        }
    }
}

impl std::error::Error for StoreError {}

/// Store backed by the external document service.
pub struct HttpDocumentStore {
    client: DocServiceClient,
}

impl HttpDocumentStore {
    pub fn new(client: DocServiceClient) -> Self {
        Self { client }
    }
}

impl DocumentStore for HttpDocumentStore {
    fn load<'a>(&'a self, document_id: &'a str) -> StoreFuture<'a, Option<StoredDocument>> {
        Box::pin(async move {
            let record = self.client.get_document(document_id).await?;
            Ok(record.map(|r| StoredDocument { content: r.content, version: r.version }))
        })
    }

    fn save<'a>(&'a self, document_id: &'a str, content: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let update = DocumentUpdate { title: None, content: Some(content.to_string()) };
            match self.client.update_document(document_id, &update).await? {
                Some(_) => Ok(()),
                None => Err(StoreError::NotFound(document_id.to_string())),
            }
        })
    }
}

/// In-process store. Unknown ids load as empty documents.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<HashMap<String, StoredDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, replacing any previous content.
    pub fn insert(&self, document_id: &str, content: &str) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(document_id.to_string(), StoredDocument { content: content.to_string(), version: 0 });
        }
    }

    pub fn get(&self, document_id: &str) -> Option<StoredDocument> {
        self.docs.lock().ok()?.get(document_id).cloned()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load<'a>(&'a self, document_id: &'a str) -> StoreFuture<'a, Option<StoredDocument>> {
        Box::pin(async move {
            let doc = self.get(document_id).unwrap_or(StoredDocument { content: String::new(), version: 0 });
            Ok(Some(doc))
        })
    }

    fn save<'a>(&'a self, document_id: &'a str, content: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if let Ok(mut docs) = self.docs.lock() {
                let entry = docs
                    .entry(document_id.to_string())
                    .or_insert(StoredDocument { content: String::new(), version: 0 });
                entry.content = content.to_string();
                entry.version += 1;
            }
            Ok(())
        })
    }
}

/// Pick the store the configuration asks for.
pub fn store_from_config(config: &Config) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match &config.doc_service_url {
        Some(url) if !url.is_empty() => {
            let mut client = DocServiceClient::new(url.clone(), config.doc_service_timeout())?;
            if let Some(secret) = config.auth_jwt_secret.as_ref().filter(|s| !s.is_empty()) {
                client = client.with_service_token(secret.clone(), config.cloud_service_name.clone());
            }
            info!("Using document service at {}", url);
            Ok(Arc::new(HttpDocumentStore::new(client)))
        }
        _ => {
            warn!("No document service configured - documents live in memory only");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}
