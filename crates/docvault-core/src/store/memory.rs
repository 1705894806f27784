//! In-memory [`Store`] implementation for tests.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety;
//! locks are held only across short synchronous sections. This store is the
//! reference implementation of the service's versioning contract: version 1
//! is seeded at upload, every mutation appends a post-change snapshot, and
//! rollback appends rather than rewrites.
//!
//! Retrieval ranking is an external collaborator, so search and RAG results
//! are not computed here — tests seed them per query with
//! [`seed_search`](InMemoryStore::seed_search) and
//! [`seed_answer`](InMemoryStore::seed_answer).

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    file_extension, Document, DocumentPreview, DocumentVersion, MetadataPatch, NewDocument,
    RagResponse, SearchHit, Tag, Visibility,
};

use super::Store;

struct StoredDocument {
    doc: Document,
    content: Vec<u8>,
    versions: Vec<DocumentVersion>,
}

/// In-memory document store. Single-principal: every document and snapshot
/// is owned by user id 1.
pub struct InMemoryStore {
    docs: RwLock<HashMap<i64, StoredDocument>>,
    tags: RwLock<HashMap<String, Tag>>,
    search_results: RwLock<HashMap<String, Vec<SearchHit>>>,
    rag_answers: RwLock<HashMap<String, RagResponse>>,
    next_document_id: AtomicI64,
    next_version_id: AtomicI64,
    next_tag_id: AtomicI64,
}

const OWNER_ID: i64 = 1;

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            tags: RwLock::new(HashMap::new()),
            search_results: RwLock::new(HashMap::new()),
            rag_answers: RwLock::new(HashMap::new()),
            next_document_id: AtomicI64::new(1),
            next_version_id: AtomicI64::new(1),
            next_tag_id: AtomicI64::new(1),
        }
    }

    /// Set the hits the next [`semantic_search`](Store::semantic_search)
    /// calls for `query` will return.
    pub fn seed_search(&self, query: &str, hits: Vec<SearchHit>) {
        let mut results = self.search_results.write().unwrap();
        results.insert(query.to_string(), hits);
    }

    /// Set the response [`rag_query`](Store::rag_query) returns for `query`.
    pub fn seed_answer(&self, query: &str, response: RagResponse) {
        let mut answers = self.rag_answers.write().unwrap();
        answers.insert(query.to_string(), response);
    }

    /// Resolve tag names to tag records, interning new names. Duplicate
    /// names within one document are collapsed.
    fn intern_tags(&self, names: &[String]) -> Vec<Tag> {
        let mut tags = self.tags.write().unwrap();
        let mut seen: Vec<Tag> = Vec::new();
        for name in names {
            if seen.iter().any(|t| &t.name == name) {
                continue;
            }
            let tag = tags.entry(name.clone()).or_insert_with(|| Tag {
                id: self.next_tag_id.fetch_add(1, Ordering::SeqCst),
                name: name.clone(),
            });
            seen.push(tag.clone());
        }
        seen
    }

    fn snapshot(&self, doc: &Document, summary: &str) -> DocumentVersion {
        DocumentVersion {
            id: self.next_version_id.fetch_add(1, Ordering::SeqCst),
            document_id: doc.id,
            version_number: doc.version,
            description: doc.description.clone(),
            tags_snapshot: doc.tag_names(),
            is_public_snapshot: doc.visibility,
            created_at: Utc::now(),
            created_by_id: doc.owner_id,
            change_summary: Some(summary.to_string()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary vocabulary the service uses for metadata edits.
fn change_summary(description: bool, tags: bool, visibility: bool) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if description {
        parts.push("description");
    }
    if tags {
        parts.push("tags");
    }
    if parts.is_empty() {
        if visibility {
            return "Changed visibility".to_string();
        }
        return "Updated metadata".to_string();
    }
    if visibility {
        parts.push("visibility");
    }
    format!("Updated {}", parts.join(" and "))
}

fn sorted(names: &[String]) -> Vec<String> {
    let mut out = names.to_vec();
    out.sort();
    out
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_documents(&self, skip: i64, limit: i64) -> Result<Vec<Document>, StoreError> {
        if skip < 0 || limit <= 0 {
            return Ok(Vec::new());
        }
        let docs = self.docs.read().unwrap();
        let mut all: Vec<Document> = docs.values().map(|s| s.doc.clone()).collect();
        all.sort_by_key(|d| d.id);
        Ok(all
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn get_document(&self, id: i64) -> Result<Document, StoreError> {
        let docs = self.docs.read().unwrap();
        docs.get(&id)
            .map(|s| s.doc.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn upload(&self, new: NewDocument) -> Result<Document, StoreError> {
        if new.file_name.is_empty() {
            return Err(StoreError::Validation("file name must not be empty".to_string()));
        }

        let tags = self.intern_tags(&new.tags);
        let id = self.next_document_id.fetch_add(1, Ordering::SeqCst);
        let filename = format!("{}_{}", Uuid::new_v4(), new.file_name);
        let file_type = file_extension(&new.file_name);
        let doc = Document {
            id,
            filename,
            original_filename: new.file_name,
            file_type,
            file_size: new.content.len() as i64,
            upload_date: Utc::now(),
            owner_id: OWNER_ID,
            description: new.description,
            visibility: new.visibility,
            tags,
            last_modified: None,
            version: 1,
        };
        let first = self.snapshot(&doc, "Initial version");

        let mut docs = self.docs.write().unwrap();
        docs.insert(
            id,
            StoredDocument {
                doc: doc.clone(),
                content: new.content,
                versions: vec![first],
            },
        );
        Ok(doc)
    }

    async fn update_document(
        &self,
        id: i64,
        patch: MetadataPatch,
        base_version: i64,
    ) -> Result<Document, StoreError> {
        let tags = patch.tags.as_deref().map(|names| self.intern_tags(names));

        let mut docs = self.docs.write().unwrap();
        let stored = docs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if stored.doc.version != base_version {
            return Err(StoreError::Conflict {
                document_id: id,
                message: format!(
                    "document {} is at version {}, edit was based on version {}",
                    id, stored.doc.version, base_version
                ),
            });
        }

        let mut desc_changed = false;
        let mut tags_changed = false;
        let mut vis_changed = false;

        if let Some(description) = patch.description {
            let next = if description.is_empty() {
                None
            } else {
                Some(description)
            };
            desc_changed = stored.doc.description != next;
            stored.doc.description = next;
        }
        if let Some(tags) = tags {
            tags_changed = sorted(&stored.doc.tag_names()) != sorted(&tag_names(&tags));
            stored.doc.tags = tags;
        }
        if let Some(visibility) = patch.visibility {
            vis_changed = stored.doc.visibility != visibility;
            stored.doc.visibility = visibility;
        }

        stored.doc.version += 1;
        stored.doc.last_modified = Some(Utc::now());
        let summary = change_summary(desc_changed, tags_changed, vis_changed);
        let snap = self.snapshot(&stored.doc, &summary);
        stored.versions.push(snap);

        Ok(stored.doc.clone())
    }

    async fn replace_file(&self, id: i64, new: NewDocument) -> Result<Document, StoreError> {
        if new.file_name.is_empty() {
            return Err(StoreError::Validation("file name must not be empty".to_string()));
        }
        let tags = self.intern_tags(&new.tags);

        let mut docs = self.docs.write().unwrap();
        let stored = docs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        stored.doc.filename = format!("{}_{}", Uuid::new_v4(), new.file_name);
        stored.doc.file_type = file_extension(&new.file_name);
        stored.doc.file_size = new.content.len() as i64;
        stored.doc.original_filename = new.file_name;
        stored.doc.description = new.description;
        stored.doc.tags = tags;
        stored.doc.visibility = new.visibility;
        stored.doc.version += 1;
        stored.doc.last_modified = Some(Utc::now());
        stored.content = new.content;

        let summary = format!("Replaced file with {}", stored.doc.original_filename);
        let snap = self.snapshot(&stored.doc, &summary);
        stored.versions.push(snap);

        Ok(stored.doc.clone())
    }

    async fn delete_document(&self, id: i64) -> Result<(), StoreError> {
        let mut docs = self.docs.write().unwrap();
        docs.remove(&id).ok_or(StoreError::NotFound(id))?;
        Ok(())
    }

    async fn list_versions(&self, document_id: i64) -> Result<Vec<DocumentVersion>, StoreError> {
        let docs = self.docs.read().unwrap();
        let stored = docs.get(&document_id).ok_or(StoreError::NotFound(document_id))?;
        let mut versions = stored.versions.clone();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    async fn rollback(&self, document_id: i64, version_id: i64) -> Result<Document, StoreError> {
        let restored_tags;
        {
            let docs = self.docs.read().unwrap();
            let stored = docs.get(&document_id).ok_or(StoreError::NotFound(document_id))?;
            let version = stored
                .versions
                .iter()
                .find(|v| v.id == version_id)
                .ok_or(StoreError::Api {
                    status: 404,
                    message: "Version not found".to_string(),
                })?;
            restored_tags = version.tags_snapshot.clone();
        }
        // Intern outside the docs lock; tag interning takes its own lock.
        let tags = self.intern_tags(&restored_tags);

        let mut docs = self.docs.write().unwrap();
        let stored = docs.get_mut(&document_id).ok_or(StoreError::NotFound(document_id))?;
        let version = stored
            .versions
            .iter()
            .find(|v| v.id == version_id)
            .ok_or(StoreError::Api {
                status: 404,
                message: "Version not found".to_string(),
            })?
            .clone();

        let max_number = stored
            .versions
            .iter()
            .map(|v| v.version_number)
            .max()
            .unwrap_or(stored.doc.version);

        stored.doc.description = version.description.clone();
        stored.doc.tags = tags;
        stored.doc.visibility = version.is_public_snapshot;
        stored.doc.version = max_number + 1;
        stored.doc.last_modified = Some(Utc::now());

        let summary = format!("Rolled back to version {}", version.version_number);
        let snap = self.snapshot(&stored.doc, &summary);
        stored.versions.push(snap);

        Ok(stored.doc.clone())
    }

    async fn semantic_search(
        &self,
        query: &str,
        _top_k: i64,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let results = self.search_results.read().unwrap();
        let mut hits = results.get(query).cloned().unwrap_or_default();
        drop(results);

        // The service joins the owning document into each hit.
        let docs = self.docs.read().unwrap();
        for hit in &mut hits {
            if hit.document.is_none() {
                hit.document = docs.get(&hit.document_id).map(|s| s.doc.clone());
            }
        }
        Ok(hits)
    }

    async fn rag_query(&self, query: &str, _top_k: i64) -> Result<RagResponse, StoreError> {
        let answers = self.rag_answers.read().unwrap();
        Ok(answers.get(query).cloned().unwrap_or(RagResponse {
            answer: String::new(),
            sources: Vec::new(),
        }))
    }

    async fn preview(&self, id: i64) -> Result<DocumentPreview, StoreError> {
        let docs = self.docs.read().unwrap();
        let stored = docs.get(&id).ok_or(StoreError::NotFound(id))?;
        let content = String::from_utf8_lossy(&stored.content).to_string();
        Ok(DocumentPreview {
            document_id: id,
            original_filename: stored.doc.original_filename.clone(),
            file_type: stored.doc.file_type.clone(),
            preview_length: content.chars().count(),
            content,
        })
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let tags = self.tags.read().unwrap();
        let mut all: Vec<Tag> = tags.values().cloned().collect();
        all.sort_by_key(|t| t.id);
        Ok(all)
    }
}

fn tag_names(tags: &[Tag]) -> Vec<String> {
    tags.iter().map(|t| t.name.clone()).collect()
}
