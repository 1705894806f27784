//! End-to-end tests for the document session against the in-memory store.
//!
//! A scripted confirmation gate stands in for the interactive prompt, and a
//! wrapper store injects failures and delays to exercise partial batches,
//! busy guards, and stale-view handling.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use docvault::confirm::{AssumeYes, Confirmation};
use docvault::error::{EngineError, Outcome};
use docvault::session::{
    Activity, DocumentSession, SessionOptions, StagedFile, UploadDraft, View,
};
use docvault_core::error::StoreError;
use docvault_core::models::{
    Document, DocumentPreview, DocumentVersion, MetadataPatch, NewDocument, RagResponse,
    SearchHit, Tag, Visibility,
};
use docvault_core::store::memory::InMemoryStore;
use docvault_core::store::Store;

/// Confirmation gate that answers from a script and records every prompt.
struct ScriptedConfirm {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Confirmation for ScriptedConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer
    }
}

/// Store wrapper with failure injection and gates for interleaving tests.
#[derive(Default)]
struct TestStore {
    inner: InMemoryStore,
    fail_deletes: RwLock<HashSet<i64>>,
    fail_versions: AtomicBool,
    /// When set, `list_documents` waits for a permit before answering.
    list_gate: Option<Arc<Semaphore>>,
    /// When set, `update_document` waits for a permit before answering.
    update_gate: Option<Arc<Semaphore>>,
}

impl TestStore {
    fn new() -> Self {
        Self::default()
    }

    fn fail_delete_of(&self, id: i64) {
        self.fail_deletes.write().unwrap().insert(id);
    }
}

#[async_trait]
impl Store for TestStore {
    async fn list_documents(&self, skip: i64, limit: i64) -> Result<Vec<Document>, StoreError> {
        if let Some(gate) = &self.list_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.inner.list_documents(skip, limit).await
    }

    async fn get_document(&self, id: i64) -> Result<Document, StoreError> {
        self.inner.get_document(id).await
    }

    async fn upload(&self, new: NewDocument) -> Result<Document, StoreError> {
        self.inner.upload(new).await
    }

    async fn update_document(
        &self,
        id: i64,
        patch: MetadataPatch,
        base_version: i64,
    ) -> Result<Document, StoreError> {
        if let Some(gate) = &self.update_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.inner.update_document(id, patch, base_version).await
    }

    async fn replace_file(&self, id: i64, new: NewDocument) -> Result<Document, StoreError> {
        self.inner.replace_file(id, new).await
    }

    async fn delete_document(&self, id: i64) -> Result<(), StoreError> {
        if self.fail_deletes.read().unwrap().contains(&id) {
            return Err(StoreError::Api {
                status: 500,
                message: format!("Could not delete document {}", id),
            });
        }
        self.inner.delete_document(id).await
    }

    async fn list_versions(&self, document_id: i64) -> Result<Vec<DocumentVersion>, StoreError> {
        if self.fail_versions.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 500,
                message: "Version history unavailable".to_string(),
            });
        }
        self.inner.list_versions(document_id).await
    }

    async fn rollback(&self, document_id: i64, version_id: i64) -> Result<Document, StoreError> {
        self.inner.rollback(document_id, version_id).await
    }

    async fn semantic_search(&self, query: &str, top_k: i64) -> Result<Vec<SearchHit>, StoreError> {
        self.inner.semantic_search(query, top_k).await
    }

    async fn rag_query(&self, query: &str, top_k: i64) -> Result<RagResponse, StoreError> {
        self.inner.rag_query(query, top_k).await
    }

    async fn preview(&self, id: i64) -> Result<DocumentPreview, StoreError> {
        self.inner.preview(id).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.inner.list_tags().await
    }
}

fn staged(name: &str) -> StagedFile {
    StagedFile {
        name: name.to_string(),
        content: b"test content".to_vec(),
    }
}

fn draft(name: &str, description: &str, tags: &[&str]) -> UploadDraft {
    UploadDraft {
        file: Some(staged(name)),
        description: if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        },
        tags: tags.iter().map(|t| t.to_string()).collect(),
        visibility: Visibility::Private,
    }
}

fn session_over(store: Arc<TestStore>) -> DocumentSession {
    DocumentSession::new(store, Arc::new(AssumeYes), SessionOptions::default())
}

async fn upload_one(session: &DocumentSession, name: &str, description: &str) -> Document {
    session.open_upload();
    session.set_upload_draft(draft(name, description, &[]));
    session.upload().await.unwrap()
}

fn description_patch(text: &str) -> MetadataPatch {
    MetadataPatch {
        description: Some(text.to_string()),
        ..MetadataPatch::default()
    }
}

#[tokio::test]
async fn test_upload_edit_rollback_lifecycle() {
    let store = Arc::new(TestStore::new());
    let session = session_over(Arc::clone(&store));

    let doc = upload_one(&session, "report.pdf", "first").await;
    assert_eq!(session.documents().await.unwrap().len(), 1);
    assert_eq!(doc.version, 1);

    // Two successful edits advance the version by one each.
    session.begin_edit(doc.id).unwrap();
    session.amend_edit(doc.id, description_patch("second")).unwrap();
    let doc2 = session.save_edit(doc.id).await.unwrap();
    assert_eq!(doc2.version, 2);

    session.begin_edit(doc.id).unwrap();
    session.amend_edit(doc.id, description_patch("third")).unwrap();
    let doc3 = session.save_edit(doc.id).await.unwrap();
    assert_eq!(doc3.version, 3);

    let versions = session.open_versions(doc.id).await.unwrap();
    assert_eq!(versions.len(), 3);
    let v1 = versions.iter().find(|v| v.version_number == 1).unwrap().clone();

    // Rollback restores v1's metadata and appends version 4.
    let outcome = session.rollback(doc.id, v1.id).await.unwrap();
    assert_eq!(outcome, Outcome::Completed);
    assert!(session.version_view().is_none());

    let current = session.cached_document(doc.id).unwrap();
    assert_eq!(current.version, 4);
    assert_eq!(current.description.as_deref(), Some("first"));

    let history = session.open_versions(doc.id).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].version_number, 4);
}

#[tokio::test]
async fn test_upload_validation_never_reaches_store() {
    let store = Arc::new(TestStore::new());
    let session = session_over(Arc::clone(&store));

    // No file selected.
    session.open_upload();
    let err = session.upload().await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Disallowed extension.
    session.set_upload_draft(draft("notes.txt", "", &[]));
    let err = session.upload().await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(err.to_string().contains("txt"));

    // Oversized file.
    let mut oversized = draft("big.pdf", "", &[]);
    oversized.file = Some(StagedFile {
        name: "big.pdf".to_string(),
        content: vec![0u8; 51_000_000],
    });
    session.set_upload_draft(oversized);
    let err = session.upload().await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert!(store.inner.list_documents(0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_switches_view_and_clears_draft() {
    let store = Arc::new(TestStore::new());
    let session = session_over(store);

    session.open_upload();
    assert_eq!(session.view(), View::Upload);
    session.set_upload_draft(draft("report.pdf", "", &[]));
    session.upload().await.unwrap();

    assert_eq!(session.view(), View::Documents);
    // The draft is gone: a second upload attempt has no file.
    assert!(matches!(
        session.upload().await.unwrap_err(),
        EngineError::Validation(_)
    ));
}

#[tokio::test]
async fn test_stale_edit_is_rejected_as_conflict() {
    let store = Arc::new(TestStore::new());
    let session = session_over(Arc::clone(&store));

    let doc = upload_one(&session, "report.pdf", "original").await;
    session.begin_edit(doc.id).unwrap();

    // Another session edits the document underneath the open draft.
    store
        .inner
        .update_document(doc.id, description_patch("external edit"), 1)
        .await
        .unwrap();

    session.amend_edit(doc.id, description_patch("my edit")).unwrap();
    let err = session.save_edit(doc.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict { document_id, .. } if document_id == doc.id));
    assert_eq!(session.activity(doc.id), Activity::Idle);
    assert!(session.last_error(doc.id).is_some());

    // The external edit stands; the stale one changed nothing.
    let current = store.inner.get_document(doc.id).await.unwrap();
    assert_eq!(current.version, 2);
    assert_eq!(current.description.as_deref(), Some("external edit"));
}

#[tokio::test]
async fn test_bulk_delete_partial_failure() {
    let store = Arc::new(TestStore::new());
    let session = session_over(Arc::clone(&store));

    let a = upload_one(&session, "a.pdf", "").await;
    let b = upload_one(&session, "b.pdf", "").await;
    let c = upload_one(&session, "c.pdf", "").await;
    store.fail_delete_of(b.id);

    session.documents().await.unwrap();
    session.select_all();
    assert_eq!(session.selection().len(), 3);

    let err = session.bulk_delete(&[a.id, b.id, c.id]).await.unwrap_err();
    match err {
        EngineError::PartialBatch { attempted, failures } => {
            assert_eq!(attempted, 3);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, b.id);
            assert!(failures[0].1.contains("Could not delete"));
        }
        other => panic!("expected PartialBatch, got {:?}", other),
    }

    // The cache reflects what actually happened: only the failed one left.
    let docs = session.documents().await.unwrap();
    let ids: Vec<i64> = docs.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![b.id]);

    // Selection stays a subset of the cache (cleared on completion here).
    assert!(session.selection().is_empty());
}

#[tokio::test]
async fn test_declined_delete_touches_nothing() {
    let store = Arc::new(TestStore::new());
    let confirm = Arc::new(ScriptedConfirm::new(false));
    let session = DocumentSession::new(
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::clone(&confirm) as Arc<dyn Confirmation>,
        SessionOptions::default(),
    );

    let doc = upload_one(&session, "keep.pdf", "").await;
    session.documents().await.unwrap();

    assert_eq!(session.delete(doc.id).await.unwrap(), Outcome::Declined);
    assert_eq!(confirm.prompt_count(), 1);
    assert_eq!(session.documents().await.unwrap().len(), 1);
    assert!(session.last_error(doc.id).is_none());

    // One confirmation covers a whole batch.
    assert_eq!(
        session.bulk_delete(&[doc.id]).await.unwrap(),
        Outcome::Declined
    );
    assert_eq!(confirm.prompt_count(), 2);
}

#[tokio::test]
async fn test_conflicting_operations_are_blocked_while_saving() {
    let gate = Arc::new(Semaphore::new(0));
    let store = Arc::new(TestStore {
        update_gate: Some(Arc::clone(&gate)),
        ..TestStore::default()
    });
    let session = Arc::new(session_over(Arc::clone(&store)));

    let doc = upload_one(&session, "report.pdf", "original").await;
    session.begin_edit(doc.id).unwrap();
    session.amend_edit(doc.id, description_patch("edited")).unwrap();

    let saver = Arc::clone(&session);
    let save = tokio::spawn(async move { saver.save_edit(doc.id).await });
    // Let the save reach the gated store call.
    tokio::task::yield_now().await;
    assert_eq!(session.activity(doc.id), Activity::Saving);

    assert!(matches!(
        session.delete(doc.id).await.unwrap_err(),
        EngineError::Busy(id) if id == doc.id
    ));
    assert!(matches!(
        session.replace_file(doc.id, staged("new.pdf"), None, Vec::new(), Visibility::Private)
            .await
            .unwrap_err(),
        EngineError::Busy(id) if id == doc.id
    ));
    assert!(matches!(
        session.bulk_delete(&[doc.id]).await.unwrap_err(),
        EngineError::Busy(id) if id == doc.id
    ));

    gate.add_permits(1);
    let saved = save.await.unwrap().unwrap();
    assert_eq!(saved.version, 2);
    assert_eq!(session.activity(doc.id), Activity::Idle);
}

#[tokio::test]
async fn test_selection_rules() {
    let store = Arc::new(TestStore::new());
    let session = session_over(store);

    let a = upload_one(&session, "a.pdf", "").await;
    let b = upload_one(&session, "b.pdf", "").await;
    session.documents().await.unwrap();

    assert!(matches!(
        session.toggle_selection(999).unwrap_err(),
        EngineError::Validation(_)
    ));

    assert!(session.toggle_selection(a.id).unwrap());
    session.select_all();
    assert_eq!(session.selection(), vec![a.id, b.id]);

    // Navigating away clears the selection.
    session.set_view(View::Upload);
    assert!(session.selection().is_empty());
}

#[tokio::test]
async fn test_deleting_selected_document_drops_it_from_selection() {
    let store = Arc::new(TestStore::new());
    let session = session_over(store);

    let a = upload_one(&session, "a.pdf", "").await;
    let b = upload_one(&session, "b.pdf", "").await;
    session.documents().await.unwrap();
    session.select_all();

    assert_eq!(session.delete(a.id).await.unwrap(), Outcome::Completed);

    assert_eq!(session.selection(), vec![b.id]);
    assert_eq!(session.documents().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_version_view_error_slot_is_independent() {
    let store = Arc::new(TestStore::new());
    let session = session_over(Arc::clone(&store));

    let doc = upload_one(&session, "report.pdf", "").await;
    store.fail_versions.store(true, Ordering::SeqCst);

    let err = session.open_versions(doc.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Request(_)));

    let view = session.version_view().unwrap();
    assert_eq!(view.document_id, doc.id);
    assert!(view.error.as_deref().unwrap().contains("unavailable"));
    assert!(view.versions.is_empty());

    // The document list is untouched by the version fetch failure.
    assert_eq!(session.documents().await.unwrap().len(), 1);
    assert!(session.last_error(doc.id).is_none());
}

#[tokio::test]
async fn test_edit_refreshes_open_version_view() {
    let store = Arc::new(TestStore::new());
    let session = session_over(store);

    let doc = upload_one(&session, "report.pdf", "one").await;
    session.open_versions(doc.id).await.unwrap();
    assert_eq!(session.version_view().unwrap().versions.len(), 1);

    session.begin_edit(doc.id).unwrap();
    session.amend_edit(doc.id, description_patch("two")).unwrap();
    session.save_edit(doc.id).await.unwrap();

    let view = session.version_view().unwrap();
    assert_eq!(view.versions.len(), 2);
    assert_eq!(view.versions[0].version_number, 2);
}

#[tokio::test]
async fn test_replace_file_keeps_identity_and_history() {
    let store = Arc::new(TestStore::new());
    let session = session_over(store);

    let doc = upload_one(&session, "old.pdf", "desc").await;
    session.documents().await.unwrap();

    let replaced = session
        .replace_file(
            doc.id,
            staged("new.docx"),
            Some("desc".to_string()),
            Vec::new(),
            Visibility::Private,
        )
        .await
        .unwrap();

    assert_eq!(replaced.id, doc.id);
    assert_eq!(replaced.version, 2);
    assert_eq!(replaced.original_filename, "new.docx");

    let versions = session.open_versions(doc.id).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(
        versions[0].change_summary.as_deref(),
        Some("Replaced file with new.docx")
    );
}

#[tokio::test]
async fn test_bulk_edit_applies_patch_to_all() {
    let store = Arc::new(TestStore::new());
    let session = session_over(Arc::clone(&store));

    let a = upload_one(&session, "a.pdf", "").await;
    let b = upload_one(&session, "b.pdf", "").await;
    session.documents().await.unwrap();

    let patch = MetadataPatch {
        visibility: Some(Visibility::Public),
        ..MetadataPatch::default()
    };
    let outcome = session.bulk_edit(&[a.id, b.id], patch).await.unwrap();
    assert_eq!(outcome, Outcome::Completed);

    for doc in session.documents().await.unwrap() {
        assert_eq!(doc.visibility, Visibility::Public);
        assert_eq!(doc.version, 2);
    }

    // An empty patch is rejected before confirmation or network.
    assert!(matches!(
        session.bulk_edit(&[a.id], MetadataPatch::default()).await.unwrap_err(),
        EngineError::Validation(_)
    ));
}

#[tokio::test]
async fn test_stale_reload_is_discarded() {
    let gate = Arc::new(Semaphore::new(0));
    let store = Arc::new(TestStore {
        list_gate: Some(Arc::clone(&gate)),
        ..TestStore::default()
    });
    store
        .inner
        .upload(NewDocument {
            file_name: "seed.pdf".to_string(),
            content: b"seed".to_vec(),
            description: None,
            tags: Vec::new(),
            visibility: Visibility::Private,
        })
        .await
        .unwrap();
    let session = Arc::new(session_over(Arc::clone(&store)));

    let reader = Arc::clone(&session);
    let read = tokio::spawn(async move { reader.documents().await });
    tokio::task::yield_now().await;

    // The view changes while the reload is waiting on the store.
    session.set_view(View::Upload);
    gate.add_permits(1);

    let err = read.await.unwrap().unwrap_err();
    assert!(matches!(err, EngineError::StaleView));

    // The discarded result was not applied; the next read loads fresh.
    gate.add_permits(1);
    let docs = session.documents().await.unwrap();
    assert_eq!(docs.len(), 1);
}

#[tokio::test]
async fn test_search_aggregates_and_joins_cache() {
    let store = Arc::new(TestStore::new());
    let session = session_over(Arc::clone(&store));

    let doc1 = upload_one(&session, "alpha.pdf", "").await;
    let doc2 = upload_one(&session, "beta.pdf", "").await;
    session.documents().await.unwrap();

    let hit = |id: i64, score: f64, content: &str| SearchHit {
        document_id: id,
        filename: format!("doc-{}", id),
        chunk_content: content.to_string(),
        score,
        document: None,
    };
    store.inner.seed_search(
        "budget",
        vec![
            hit(doc1.id, 0.9, "best chunk"),
            hit(doc2.id, 0.5, "other doc"),
            hit(doc1.id, 0.7, "weaker chunk"),
        ],
    );

    let results = session.search("budget").await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].document_id, doc1.id);
    assert!((results[0].score - 0.9).abs() < 1e-9);
    assert_eq!(results[0].match_count, 2);
    assert_eq!(results[0].chunk_content, "best chunk");
    assert_eq!(results[1].document_id, doc2.id);
    assert_eq!(results[1].match_count, 1);
    // Metadata joined from the store or cache.
    assert_eq!(
        results[0].document.as_ref().unwrap().original_filename,
        "alpha.pdf"
    );
}

#[tokio::test]
async fn test_ask_excerpts_sources_in_order() {
    let store = Arc::new(TestStore::new());
    let session = session_over(Arc::clone(&store));

    let long_chunk = "é".repeat(450);
    store.inner.seed_answer(
        "what is in the report?",
        RagResponse {
            answer: "The report covers Q3 revenue.".to_string(),
            sources: vec![
                SearchHit {
                    document_id: 2,
                    filename: "b.pdf".to_string(),
                    chunk_content: long_chunk,
                    score: 0.4,
                    document: None,
                },
                SearchHit {
                    document_id: 1,
                    filename: "a.pdf".to_string(),
                    chunk_content: "short".to_string(),
                    score: 0.9,
                    document: None,
                },
            ],
        },
    );

    let view = session.ask("what is in the report?").await.unwrap();

    assert_eq!(view.answer, "The report covers Q3 revenue.");
    // Sources stay in the service's order, even when scores disagree.
    assert_eq!(view.sources[0].document_id, 2);
    assert_eq!(view.sources[0].excerpt.chars().count(), 200);
    assert!(view.sources[0].excerpt.chars().all(|c| c == 'é'));
    assert_eq!(view.sources[1].excerpt, "short");
}

#[tokio::test]
async fn test_failed_mutation_keeps_list_usable() {
    let store = Arc::new(TestStore::new());
    let session = session_over(Arc::clone(&store));

    let doc = upload_one(&session, "report.pdf", "").await;
    store.fail_delete_of(doc.id);
    session.documents().await.unwrap();

    let err = session.delete(doc.id).await.unwrap_err();
    assert!(err.to_string().contains("Could not delete"));
    assert_eq!(
        session.last_error(doc.id).as_deref(),
        Some(format!("Could not delete document {}", doc.id).as_str())
    );

    // The list is still there and still mutable.
    assert_eq!(session.documents().await.unwrap().len(), 1);
    session.begin_edit(doc.id).unwrap();
    session.amend_edit(doc.id, description_patch("still works")).unwrap();
    assert_eq!(session.save_edit(doc.id).await.unwrap().version, 2);
}
