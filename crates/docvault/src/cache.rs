//! Client-side snapshot of the server's document list.

use std::collections::HashSet;

use docvault_core::models::Document;

/// Wholesale-replaced snapshot of the server's document list.
///
/// The cache is either clean (contents match the last successful load) or
/// dirty (a mutation ran, or a load failed, since the snapshot was taken).
/// Contents are never partially updated: a reload replaces everything or
/// nothing, and a failed reload keeps the previous snapshot readable.
#[derive(Default)]
pub struct DocumentCache {
    docs: Vec<Document>,
    dirty: bool,
}

impl DocumentCache {
    pub fn replace(&mut self, docs: Vec<Document>) {
        self.docs = docs;
        self.dirty = false;
    }

    /// Keep current contents but mark them stale.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, id: i64) -> Option<&Document> {
        self.docs.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> HashSet<i64> {
        self.docs.iter().map(|d| d.id).collect()
    }

    /// Documents in server list order.
    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docvault_core::models::Visibility;

    fn make_doc(id: i64) -> Document {
        Document {
            id,
            filename: format!("stored_{}.pdf", id),
            original_filename: format!("{}.pdf", id),
            file_type: "pdf".to_string(),
            file_size: 10,
            upload_date: Utc::now(),
            owner_id: 1,
            description: None,
            visibility: Visibility::Private,
            tags: Vec::new(),
            last_modified: None,
            version: 1,
        }
    }

    #[test]
    fn test_replace_clears_dirty() {
        let mut cache = DocumentCache::default();
        cache.invalidate();
        assert!(cache.is_dirty());

        cache.replace(vec![make_doc(1), make_doc(2)]);

        assert!(!cache.is_dirty());
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(1));
        assert!(!cache.contains(3));
    }

    #[test]
    fn test_invalidate_keeps_contents() {
        let mut cache = DocumentCache::default();
        cache.replace(vec![make_doc(1)]);

        cache.invalidate();

        assert!(cache.is_dirty());
        assert_eq!(cache.get(1).map(|d| d.id), Some(1));
    }
}
