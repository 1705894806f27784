//! Remote document store contract.
//!
//! The [`Store`] trait defines every operation the engine consumes from the
//! document service, enabling pluggable backends (HTTP against the real
//! service, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    Document, DocumentPreview, DocumentVersion, MetadataPatch, NewDocument, RagResponse,
    SearchHit, Tag,
};

/// Abstract backend for the remote document store.
///
/// All operations are async (via `async-trait`). The in-memory
/// implementation returns immediately-ready futures.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_documents`](Store::list_documents) | One page of the document list |
/// | [`get_document`](Store::get_document) | Retrieve a single document |
/// | [`upload`](Store::upload) | Create a document from a file + metadata |
/// | [`update_document`](Store::update_document) | Metadata edit with base-version check |
/// | [`replace_file`](Store::replace_file) | Swap content, keep identity and history |
/// | [`delete_document`](Store::delete_document) | Remove a document |
/// | [`list_versions`](Store::list_versions) | Snapshot history, newest first |
/// | [`rollback`](Store::rollback) | Restore a snapshot as a new version |
/// | [`semantic_search`](Store::semantic_search) | Ranked chunk-level hits |
/// | [`rag_query`](Store::rag_query) | Answer plus source hits |
/// | [`preview`](Store::preview) | Extracted text content |
/// | [`list_tags`](Store::list_tags) | Tag catalog |
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch one page of documents, ordered by the service.
    async fn list_documents(&self, skip: i64, limit: i64) -> Result<Vec<Document>, StoreError>;

    /// Retrieve a single document by id.
    async fn get_document(&self, id: i64) -> Result<Document, StoreError>;

    /// Create a document. The service assigns the id, the storage filename,
    /// and version 1 with its initial snapshot.
    async fn upload(&self, new: NewDocument) -> Result<Document, StoreError>;

    /// Apply a metadata patch.
    ///
    /// `base_version` is the version the edit was made against; the service
    /// rejects the update with a conflict when it no longer matches.
    /// A successful update bumps the version and appends a snapshot.
    async fn update_document(
        &self,
        id: i64,
        patch: MetadataPatch,
        base_version: i64,
    ) -> Result<Document, StoreError>;

    /// Replace the stored file while keeping the document's identity.
    ///
    /// Updates the file fields, bumps the version, and appends a snapshot.
    async fn replace_file(&self, id: i64, new: NewDocument) -> Result<Document, StoreError>;

    /// Delete a document and its history.
    async fn delete_document(&self, id: i64) -> Result<(), StoreError>;

    /// Snapshot history for a document, descending by version number.
    async fn list_versions(&self, document_id: i64) -> Result<Vec<DocumentVersion>, StoreError>;

    /// Restore the given snapshot's metadata as a new, forward-moving
    /// version. Returns the document in its post-rollback state.
    async fn rollback(&self, document_id: i64, version_id: i64) -> Result<Document, StoreError>;

    /// Run a semantic query, returning ranked chunk-level hits.
    async fn semantic_search(&self, query: &str, top_k: i64)
        -> Result<Vec<SearchHit>, StoreError>;

    /// Run a RAG query, returning an answer plus its source hits.
    async fn rag_query(&self, query: &str, top_k: i64) -> Result<RagResponse, StoreError>;

    /// Extracted text content of a document.
    async fn preview(&self, id: i64) -> Result<DocumentPreview, StoreError>;

    /// All tags known to the service.
    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;
}
