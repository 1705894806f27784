//! The document session: mutation coordination, version view, selection,
//! and the cached document list.
//!
//! [`DocumentSession`] owns every piece of client state the consumer is
//! allowed to observe. All reads and mutations go through its methods; the
//! cache is written only here, and only by wholesale replacement after a
//! mutation settles. Methods take `&self` — internal state lives behind a
//! `std::sync::RwLock` that is locked only for short synchronous sections
//! and never held across an await point.
//!
//! Mutation discipline: each logical operation issues its store calls
//! (concurrently for bulk operations), joins them, then invalidates and
//! reloads the cache exactly once. A reload that finishes after the view
//! changed is discarded, leaving the cache dirty for the next read.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use docvault_core::aggregate::{aggregate, excerpt};
use docvault_core::models::{
    file_extension, AggregatedResult, Document, DocumentPreview, DocumentVersion, MetadataPatch,
    NewDocument, Tag, Visibility,
};
use docvault_core::selection::SelectionSet;
use docvault_core::store::Store;

use crate::cache::DocumentCache;
use crate::config::Config;
use crate::confirm::Confirmation;
use crate::error::{EngineError, Outcome};

/// Tunables the session reads from configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Page size for document-list loads.
    pub page_limit: i64,
    /// Result count requested from semantic search.
    pub top_k: i64,
    /// Source count requested from RAG queries.
    pub rag_top_k: i64,
    /// Character budget for chunk excerpts.
    pub preview_chars: usize,
    /// Lowercased file extensions accepted for upload and replacement.
    pub allowed_types: Vec<String>,
    /// Upper bound on uploaded file size in bytes.
    pub max_file_size: i64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_limit: 100,
            top_k: 5,
            rag_top_k: 3,
            preview_chars: 200,
            allowed_types: vec!["pdf".to_string(), "docx".to_string(), "doc".to_string()],
            max_file_size: 50_000_000,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_limit: config.server.page_limit,
            top_k: config.search.top_k,
            rag_top_k: config.search.rag_top_k,
            preview_chars: config.search.preview_chars,
            allowed_types: config.upload.allowed_types.clone(),
            max_file_size: config.upload.max_file_size,
        }
    }
}

/// A file staged for upload or replacement.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// The upload form's state, consumed by [`DocumentSession::upload`].
#[derive(Debug, Clone, Default)]
pub struct UploadDraft {
    pub file: Option<StagedFile>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
}

/// An in-progress metadata edit, pre-filled from the cached document.
///
/// `base_version` is the version the draft was opened against; the store
/// rejects the save if the document has moved past it.
#[derive(Debug, Clone)]
pub struct EditDraft {
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub base_version: i64,
}

/// What a document is doing right now, as the consumer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    /// An edit draft is open.
    Editing,
    /// A mutation is in flight; conflicting operations are rejected.
    Saving,
}

/// Which screen the consumer currently shows. Reloads started under one
/// view are discarded if the view changes before they finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Documents,
    Upload,
}

/// The version view's state, with loading/error display independent of the
/// document list's.
#[derive(Debug, Clone)]
pub struct VersionView {
    pub document_id: i64,
    pub versions: Vec<DocumentVersion>,
    pub error: Option<String>,
}

/// A RAG answer prepared for display: sources in the service's ranked
/// order, chunk content cut to the configured excerpt length.
#[derive(Debug, Clone)]
pub struct RagView {
    pub answer: String,
    pub sources: Vec<SourceView>,
}

#[derive(Debug, Clone)]
pub struct SourceView {
    pub document_id: i64,
    pub filename: String,
    pub excerpt: String,
    pub score: f64,
}

struct SessionState {
    cache: DocumentCache,
    selection: SelectionSet,
    view: View,
    /// Bumped on every view change; a reload is applied only if the epoch
    /// it started under is still current.
    epoch: u64,
    upload: UploadDraft,
    edits: HashMap<i64, EditDraft>,
    saving: HashSet<i64>,
    errors: HashMap<i64, String>,
    versions: Option<VersionView>,
}

impl SessionState {
    fn new() -> Self {
        let mut cache = DocumentCache::default();
        cache.invalidate();
        Self {
            cache,
            selection: SelectionSet::new(),
            view: View::Documents,
            epoch: 0,
            upload: UploadDraft::default(),
            edits: HashMap::new(),
            saving: HashSet::new(),
            errors: HashMap::new(),
            versions: None,
        }
    }
}

/// The engine: Mutation Coordinator, Version Controller, Document State
/// Cache, and Selection Set behind one value.
pub struct DocumentSession {
    store: Arc<dyn Store>,
    confirm: Arc<dyn Confirmation>,
    options: SessionOptions,
    state: RwLock<SessionState>,
}

impl DocumentSession {
    pub fn new(
        store: Arc<dyn Store>,
        confirm: Arc<dyn Confirmation>,
        options: SessionOptions,
    ) -> Self {
        Self {
            store,
            confirm,
            options,
            state: RwLock::new(SessionState::new()),
        }
    }

    // --- cache ---

    /// The current document list, reloading first if the cache is dirty.
    pub async fn documents(&self) -> Result<Vec<Document>, EngineError> {
        let dirty = self.state.read().unwrap().cache.is_dirty();
        if dirty {
            self.reload().await?;
        }
        Ok(self.state.read().unwrap().cache.documents().to_vec())
    }

    /// One cached document. Does not hit the network.
    pub fn cached_document(&self, id: i64) -> Option<Document> {
        self.state.read().unwrap().cache.get(id).cloned()
    }

    /// Fetch the full list and replace the cache wholesale.
    ///
    /// Pages through the store until a short page. If the view changed
    /// while the fetch was in flight the result is discarded, the cache
    /// stays dirty, and [`EngineError::StaleView`] is returned.
    async fn reload(&self) -> Result<(), EngineError> {
        let epoch = self.state.read().unwrap().epoch;
        let limit = self.options.page_limit;

        let mut all: Vec<Document> = Vec::new();
        let mut skip = 0;
        loop {
            let page = self
                .store
                .list_documents(skip, limit)
                .await
                .map_err(|e| EngineError::request(e, "Failed to load documents"))?;
            let page_len = page.len() as i64;
            all.extend(page);
            if page_len < limit {
                break;
            }
            skip += limit;
        }

        let mut state = self.state.write().unwrap();
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, "discarding stale reload");
            state.cache.invalidate();
            return Err(EngineError::StaleView);
        }
        state.cache.replace(all);
        let ids = state.cache.ids();
        state.selection.retain(&ids);
        debug!(documents = state.cache.len(), "cache reloaded");
        Ok(())
    }

    /// Invalidate and reload after a settled mutation. A stale reload is
    /// swallowed here: the mutation itself succeeded and the next read of
    /// the new view will load fresh anyway.
    async fn settle(&self) -> Result<(), EngineError> {
        self.state.write().unwrap().cache.invalidate();
        match self.reload().await {
            Err(EngineError::StaleView) => Ok(()),
            other => other,
        }
    }

    // --- views ---

    pub fn view(&self) -> View {
        self.state.read().unwrap().view
    }

    /// Switch screens. Leaving the documents view clears the selection;
    /// any reload still in flight for the old view will be discarded.
    pub fn set_view(&self, view: View) {
        let mut state = self.state.write().unwrap();
        if state.view == view {
            return;
        }
        if state.view == View::Documents {
            state.selection.clear();
        }
        state.view = view;
        state.epoch += 1;
    }

    // --- selection ---

    /// Flip selection of a cached document. Returns whether it is selected
    /// afterwards.
    pub fn toggle_selection(&self, id: i64) -> Result<bool, EngineError> {
        let mut state = self.state.write().unwrap();
        if !state.cache.contains(id) {
            return Err(EngineError::Validation(format!(
                "document {} is not in the current list",
                id
            )));
        }
        Ok(state.selection.toggle(id))
    }

    /// Select every document currently in the cache.
    pub fn select_all(&self) {
        let mut state = self.state.write().unwrap();
        let ids = state.cache.ids();
        state.selection.select_all(ids);
    }

    pub fn clear_selection(&self) {
        self.state.write().unwrap().selection.clear();
    }

    /// Selected ids in ascending order.
    pub fn selection(&self) -> Vec<i64> {
        self.state.read().unwrap().selection.ids()
    }

    // --- per-document status ---

    pub fn activity(&self, id: i64) -> Activity {
        let state = self.state.read().unwrap();
        if state.saving.contains(&id) {
            Activity::Saving
        } else if state.edits.contains_key(&id) {
            Activity::Editing
        } else {
            Activity::Idle
        }
    }

    /// The last mutation error recorded for this document, if any.
    pub fn last_error(&self, id: i64) -> Option<String> {
        self.state.read().unwrap().errors.get(&id).cloned()
    }

    /// Mark `id` saving, rejecting the transition when a conflicting
    /// mutation is already in flight.
    fn begin_saving(&self, id: i64) -> Result<(), EngineError> {
        let mut state = self.state.write().unwrap();
        if !state.saving.insert(id) {
            return Err(EngineError::Busy(id));
        }
        state.errors.remove(&id);
        Ok(())
    }

    /// Mark a whole batch saving atomically. If any id is already saving
    /// (an operation started during the confirmation await), nothing is
    /// marked and `Busy` is returned.
    fn begin_saving_all(&self, ids: &[i64]) -> Result<(), EngineError> {
        let mut state = self.state.write().unwrap();
        if let Some(&busy) = ids.iter().find(|id| state.saving.contains(id)) {
            return Err(EngineError::Busy(busy));
        }
        for &id in ids {
            state.saving.insert(id);
            state.errors.remove(&id);
        }
        Ok(())
    }

    fn end_saving(&self, id: i64, error: Option<&EngineError>) {
        let mut state = self.state.write().unwrap();
        state.saving.remove(&id);
        if let Some(err) = error {
            state.errors.insert(id, err.to_string());
        }
    }

    // --- upload ---

    /// Open the upload view with a fresh draft.
    pub fn open_upload(&self) {
        self.set_view(View::Upload);
        self.state.write().unwrap().upload = UploadDraft::default();
    }

    pub fn set_upload_draft(&self, draft: UploadDraft) {
        self.state.write().unwrap().upload = draft;
    }

    /// Check a staged file against the configured type and size limits.
    fn validate_file(&self, file: &StagedFile) -> Result<(), EngineError> {
        let file_type = file_extension(&file.name);
        if !self.options.allowed_types.contains(&file_type) {
            return Err(EngineError::Validation(format!(
                "file type '{}' is not allowed (allowed: {})",
                file_type,
                self.options.allowed_types.join(", ")
            )));
        }
        if file.content.len() as i64 > self.options.max_file_size {
            return Err(EngineError::Validation(format!(
                "file exceeds the maximum size of {} bytes",
                self.options.max_file_size
            )));
        }
        Ok(())
    }

    /// Upload the drafted file. On success the draft is cleared, the view
    /// switches to the document list, and the cache is reloaded once.
    pub async fn upload(&self) -> Result<Document, EngineError> {
        let draft = self.state.read().unwrap().upload.clone();
        let file = draft
            .file
            .ok_or_else(|| EngineError::Validation("no file selected".to_string()))?;
        self.validate_file(&file)?;

        let new = NewDocument {
            file_name: file.name,
            content: file.content,
            description: draft.description,
            tags: draft.tags,
            visibility: draft.visibility,
        };
        let doc = self
            .store
            .upload(new)
            .await
            .map_err(|e| EngineError::request(e, "Upload failed"))?;

        info!(document_id = doc.id, filename = %doc.original_filename, "uploaded");
        {
            let mut state = self.state.write().unwrap();
            state.upload = UploadDraft::default();
            if state.view != View::Documents {
                state.view = View::Documents;
                state.epoch += 1;
            }
        }
        self.settle().await?;
        Ok(doc)
    }

    // --- metadata edits ---

    /// Open an edit draft pre-filled from the cached document, recording
    /// its current version as the edit's base.
    pub fn begin_edit(&self, id: i64) -> Result<EditDraft, EngineError> {
        let mut state = self.state.write().unwrap();
        if state.saving.contains(&id) {
            return Err(EngineError::Busy(id));
        }
        let doc = state
            .cache
            .get(id)
            .ok_or_else(|| EngineError::Validation(format!("unknown document: {}", id)))?;
        let draft = EditDraft {
            description: doc.description.clone(),
            tags: doc.tag_names(),
            visibility: doc.visibility,
            base_version: doc.version,
        };
        state.edits.insert(id, draft.clone());
        Ok(draft)
    }

    /// Apply changed fields onto the open draft. `None` fields are left as
    /// the draft has them.
    pub fn amend_edit(&self, id: i64, patch: MetadataPatch) -> Result<(), EngineError> {
        let mut state = self.state.write().unwrap();
        let draft = state
            .edits
            .get_mut(&id)
            .ok_or_else(|| EngineError::Validation(format!("no edit in progress for {}", id)))?;
        if let Some(description) = patch.description {
            draft.description = if description.is_empty() {
                None
            } else {
                Some(description)
            };
        }
        if let Some(tags) = patch.tags {
            draft.tags = tags;
        }
        if let Some(visibility) = patch.visibility {
            draft.visibility = visibility;
        }
        Ok(())
    }

    pub fn cancel_edit(&self, id: i64) {
        self.state.write().unwrap().edits.remove(&id);
    }

    /// Save the open draft as a single metadata update carrying the base
    /// version. On success the cache reloads once and, if the version view
    /// is open for this document, the version list is refreshed too.
    pub async fn save_edit(&self, id: i64) -> Result<Document, EngineError> {
        let draft = {
            let state = self.state.read().unwrap();
            state
                .edits
                .get(&id)
                .cloned()
                .ok_or_else(|| EngineError::Validation(format!("no edit in progress for {}", id)))?
        };
        self.begin_saving(id)?;

        let patch = MetadataPatch {
            description: Some(draft.description.unwrap_or_default()),
            tags: Some(draft.tags),
            visibility: Some(draft.visibility),
        };
        let result = self
            .store
            .update_document(id, patch, draft.base_version)
            .await
            .map_err(|e| EngineError::request(e, "Failed to update document"));
        self.end_saving(id, result.as_ref().err());
        // The draft is spent either way: on a conflict its base version is
        // stale, so a retry has to re-open against fresh state.
        self.state.write().unwrap().edits.remove(&id);
        let doc = result?;

        info!(document_id = id, version = doc.version, "metadata updated");
        self.settle().await?;
        self.refresh_versions_if_open(id).await;
        Ok(doc)
    }

    // --- file replacement ---

    /// Replace a document's content, keeping its identity and history. The
    /// new file carries the supplied metadata; the version is bumped and a
    /// snapshot appended server-side.
    pub async fn replace_file(
        &self,
        id: i64,
        file: StagedFile,
        description: Option<String>,
        tags: Vec<String>,
        visibility: Visibility,
    ) -> Result<Document, EngineError> {
        if !self.state.read().unwrap().cache.contains(id) {
            return Err(EngineError::Validation(format!("unknown document: {}", id)));
        }
        self.validate_file(&file)?;
        self.begin_saving(id)?;

        let new = NewDocument {
            file_name: file.name,
            content: file.content,
            description,
            tags,
            visibility,
        };
        let result = self
            .store
            .replace_file(id, new)
            .await
            .map_err(|e| EngineError::request(e, "Failed to replace file"));
        self.end_saving(id, result.as_ref().err());
        let doc = result?;

        info!(document_id = id, version = doc.version, filename = %doc.original_filename, "file replaced");
        self.settle().await?;
        self.refresh_versions_if_open(id).await;
        Ok(doc)
    }

    // --- deletion ---

    /// Delete one document after confirmation. A declined confirmation
    /// completes with [`Outcome::Declined`] and touches nothing.
    pub async fn delete(&self, id: i64) -> Result<Outcome, EngineError> {
        let name = {
            let state = self.state.read().unwrap();
            if state.saving.contains(&id) {
                return Err(EngineError::Busy(id));
            }
            state
                .cache
                .get(id)
                .map(|d| d.original_filename.clone())
                .ok_or_else(|| EngineError::Validation(format!("unknown document: {}", id)))?
        };

        let prompt = format!("Delete \"{}\"? This cannot be undone.", name);
        if !self.confirm.confirm(&prompt).await {
            return Ok(Outcome::Declined);
        }

        self.begin_saving(id)?;
        let result = self
            .store
            .delete_document(id)
            .await
            .map_err(|e| EngineError::request(e, "Failed to delete document"));
        self.end_saving(id, result.as_ref().err());
        result?;

        info!(document_id = id, "deleted");
        {
            let mut state = self.state.write().unwrap();
            state.selection.remove(id);
            state.edits.remove(&id);
        }
        self.settle().await?;
        Ok(Outcome::Completed)
    }

    /// Delete a batch concurrently behind one confirmation.
    ///
    /// Failed items do not stop the others; the cache is reloaded exactly
    /// once at the end, and failures come back as a single
    /// [`EngineError::PartialBatch`].
    pub async fn bulk_delete(&self, ids: &[i64]) -> Result<Outcome, EngineError> {
        self.check_batch(ids)?;

        let prompt = format!("Delete {} documents? This cannot be undone.", ids.len());
        if !self.confirm.confirm(&prompt).await {
            return Ok(Outcome::Declined);
        }

        self.begin_saving_all(ids)?;
        let mut handles = Vec::new();
        for &id in ids {
            let store = Arc::clone(&self.store);
            handles.push(tokio::spawn(async move {
                (id, store.delete_document(id).await)
            }));
        }

        let mut failures: Vec<(i64, String)> = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((_, Ok(()))) => {}
                Ok((id, Err(err))) => {
                    let mapped = EngineError::request(err, "Failed to delete document");
                    failures.push((id, mapped.to_string()));
                }
                Err(join_err) => {
                    failures.push((0, format!("delete task failed: {}", join_err)));
                }
            }
        }
        for &id in ids {
            self.end_saving(id, None);
        }
        self.state.write().unwrap().selection.clear();
        self.settle().await?;

        if failures.is_empty() {
            info!(count = ids.len(), "bulk delete completed");
            Ok(Outcome::Completed)
        } else {
            warn!(
                attempted = ids.len(),
                failed = failures.len(),
                "bulk delete finished with failures"
            );
            Err(EngineError::PartialBatch {
                attempted: ids.len(),
                failures,
            })
        }
    }

    /// Apply one metadata patch to a batch concurrently behind one
    /// confirmation. Per-id base versions are taken from the cache; the
    /// same join/single-reload/aggregate-notice semantics as
    /// [`bulk_delete`](DocumentSession::bulk_delete).
    pub async fn bulk_edit(&self, ids: &[i64], patch: MetadataPatch) -> Result<Outcome, EngineError> {
        if patch.is_empty() {
            return Err(EngineError::Validation(
                "nothing to change: the patch is empty".to_string(),
            ));
        }
        self.check_batch(ids)?;
        let bases: Vec<(i64, i64)> = {
            let state = self.state.read().unwrap();
            ids.iter()
                .map(|&id| (id, state.cache.get(id).map(|d| d.version).unwrap_or(1)))
                .collect()
        };

        let prompt = format!("Update {} documents?", ids.len());
        if !self.confirm.confirm(&prompt).await {
            return Ok(Outcome::Declined);
        }

        self.begin_saving_all(ids)?;
        let mut handles = Vec::new();
        for (id, base) in bases {
            let store = Arc::clone(&self.store);
            let patch = patch.clone();
            handles.push(tokio::spawn(async move {
                (id, store.update_document(id, patch, base).await)
            }));
        }

        let mut failures: Vec<(i64, String)> = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((_, Ok(_))) => {}
                Ok((id, Err(err))) => {
                    let mapped = EngineError::request(err, "Failed to update document");
                    failures.push((id, mapped.to_string()));
                }
                Err(join_err) => {
                    failures.push((0, format!("update task failed: {}", join_err)));
                }
            }
        }
        for &id in ids {
            self.end_saving(id, None);
        }
        self.state.write().unwrap().selection.clear();
        self.settle().await?;

        if failures.is_empty() {
            info!(count = ids.len(), "bulk edit completed");
            Ok(Outcome::Completed)
        } else {
            warn!(
                attempted = ids.len(),
                failed = failures.len(),
                "bulk edit finished with failures"
            );
            Err(EngineError::PartialBatch {
                attempted: ids.len(),
                failures,
            })
        }
    }

    /// Pre-flight for a bulk operation: non-empty, every id cached, none
    /// already saving.
    fn check_batch(&self, ids: &[i64]) -> Result<(), EngineError> {
        if ids.is_empty() {
            return Err(EngineError::Validation("no documents selected".to_string()));
        }
        let state = self.state.read().unwrap();
        for &id in ids {
            if !state.cache.contains(id) {
                return Err(EngineError::Validation(format!("unknown document: {}", id)));
            }
            if state.saving.contains(&id) {
                return Err(EngineError::Busy(id));
            }
        }
        Ok(())
    }

    // --- versions ---

    /// Open the version view for a document, fetching history fresh.
    ///
    /// A fetch failure lands in the version view's own error slot — the
    /// document list's error state is untouched.
    pub async fn open_versions(&self, id: i64) -> Result<Vec<DocumentVersion>, EngineError> {
        {
            let mut state = self.state.write().unwrap();
            state.versions = Some(VersionView {
                document_id: id,
                versions: Vec::new(),
                error: None,
            });
        }

        match self.store.list_versions(id).await {
            Ok(versions) => {
                let mut state = self.state.write().unwrap();
                match &mut state.versions {
                    Some(view) if view.document_id == id => {
                        view.versions = versions.clone();
                        Ok(versions)
                    }
                    // View closed or retargeted while the fetch ran.
                    _ => Err(EngineError::StaleView),
                }
            }
            Err(err) => {
                let mapped = EngineError::request(err, "Failed to load version history");
                let mut state = self.state.write().unwrap();
                if let Some(view) = &mut state.versions {
                    if view.document_id == id {
                        view.error = Some(mapped.to_string());
                    }
                }
                Err(mapped)
            }
        }
    }

    pub fn close_versions(&self) {
        self.state.write().unwrap().versions = None;
    }

    pub fn version_view(&self) -> Option<VersionView> {
        self.state.read().unwrap().versions.clone()
    }

    /// Re-fetch the open version view after a mutation touched its
    /// document. Failures stay in the view's error slot.
    async fn refresh_versions_if_open(&self, id: i64) {
        let open_for = self
            .state
            .read()
            .unwrap()
            .versions
            .as_ref()
            .map(|v| v.document_id);
        if open_for != Some(id) {
            return;
        }
        match self.store.list_versions(id).await {
            Ok(versions) => {
                let mut state = self.state.write().unwrap();
                if let Some(view) = &mut state.versions {
                    if view.document_id == id {
                        view.versions = versions;
                        view.error = None;
                    }
                }
            }
            Err(err) => {
                let mapped = EngineError::request(err, "Failed to load version history");
                let mut state = self.state.write().unwrap();
                if let Some(view) = &mut state.versions {
                    if view.document_id == id {
                        view.error = Some(mapped.to_string());
                    }
                }
            }
        }
    }

    /// Restore a snapshot as a new forward-moving version, after
    /// confirmation. On success the version view closes and the cache
    /// reloads once.
    pub async fn rollback(&self, document_id: i64, version_id: i64) -> Result<Outcome, EngineError> {
        if self.state.read().unwrap().saving.contains(&document_id) {
            return Err(EngineError::Busy(document_id));
        }

        let prompt = format!(
            "Roll back document {} to an earlier version? A new version will be created.",
            document_id
        );
        if !self.confirm.confirm(&prompt).await {
            return Ok(Outcome::Declined);
        }

        self.begin_saving(document_id)?;
        let result = self
            .store
            .rollback(document_id, version_id)
            .await
            .map_err(|e| EngineError::request(e, "Failed to roll back document"));
        self.end_saving(document_id, result.as_ref().err());
        let doc = result?;

        info!(document_id, version = doc.version, "rolled back");
        self.close_versions();
        self.settle().await?;
        Ok(Outcome::Completed)
    }

    // --- search ---

    /// Semantic search, aggregated to one ranked entry per document.
    /// Entries missing a joined document payload are filled from the cache.
    pub async fn search(&self, query: &str) -> Result<Vec<AggregatedResult>, EngineError> {
        let hits = self
            .store
            .semantic_search(query, self.options.top_k)
            .await
            .map_err(|e| EngineError::request(e, "Search failed"))?;
        let mut results = aggregate(&hits);
        let state = self.state.read().unwrap();
        for result in &mut results {
            if result.document.is_none() {
                result.document = state.cache.get(result.document_id).cloned();
            }
        }
        Ok(results)
    }

    /// RAG query. Sources keep the service's ranking; chunk content is cut
    /// to the configured excerpt length.
    pub async fn ask(&self, query: &str) -> Result<RagView, EngineError> {
        let response = self
            .store
            .rag_query(query, self.options.rag_top_k)
            .await
            .map_err(|e| EngineError::request(e, "Query failed"))?;
        let sources = response
            .sources
            .iter()
            .map(|hit| SourceView {
                document_id: hit.document_id,
                filename: hit.filename.clone(),
                excerpt: excerpt(&hit.chunk_content, self.options.preview_chars),
                score: hit.score,
            })
            .collect();
        Ok(RagView {
            answer: response.answer,
            sources,
        })
    }

    // --- supplementary reads ---

    pub async fn preview(&self, id: i64) -> Result<DocumentPreview, EngineError> {
        self.store
            .preview(id)
            .await
            .map_err(|e| EngineError::request(e, "Failed to load preview"))
    }

    pub async fn tags(&self) -> Result<Vec<Tag>, EngineError> {
        self.store
            .list_tags()
            .await
            .map_err(|e| EngineError::request(e, "Failed to load tags"))
    }
}
