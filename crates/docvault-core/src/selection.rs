//! Selection tracking for bulk actions.

use std::collections::HashSet;

/// The set of document ids chosen for a bulk action.
///
/// Membership must stay a subset of the current document list: after every
/// cache reload the owner calls [`retain`](SelectionSet::retain) with the
/// fresh id list, dropping anything that no longer exists.
#[derive(Debug, Default)]
pub struct SelectionSet {
    ids: HashSet<i64>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`. Returns whether the id is selected afterwards.
    pub fn toggle(&mut self, id: i64) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Replace the whole selection.
    pub fn select_all<I: IntoIterator<Item = i64>>(&mut self, ids: I) {
        self.ids = ids.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn remove(&mut self, id: i64) -> bool {
        self.ids.remove(&id)
    }

    /// Drop every selected id that is not in `valid` (the fresh cache ids).
    pub fn retain(&mut self, valid: &HashSet<i64>) {
        self.ids.retain(|id| valid.contains(id));
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in ascending order, for stable display.
    pub fn ids(&self) -> Vec<i64> {
        let mut out: Vec<i64> = self.ids.iter().copied().collect();
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_membership() {
        let mut sel = SelectionSet::new();
        assert!(sel.toggle(1));
        assert!(sel.contains(1));
        assert!(!sel.toggle(1));
        assert!(!sel.contains(1));
    }

    #[test]
    fn test_select_all_replaces() {
        let mut sel = SelectionSet::new();
        sel.toggle(99);
        sel.select_all(vec![1, 2, 3]);
        assert_eq!(sel.ids(), vec![1, 2, 3]);
        assert!(!sel.contains(99));
    }

    #[test]
    fn test_retain_drops_missing_ids() {
        let mut sel = SelectionSet::new();
        sel.select_all(vec![1, 2, 3]);

        let valid: HashSet<i64> = [2, 3, 4].into_iter().collect();
        sel.retain(&valid);

        assert_eq!(sel.ids(), vec![2, 3]);
    }

    #[test]
    fn test_clear_empties() {
        let mut sel = SelectionSet::new();
        sel.select_all(vec![5, 6]);
        sel.clear();
        assert!(sel.is_empty());
    }

    #[test]
    fn test_retain_against_empty_cache() {
        let mut sel = SelectionSet::new();
        sel.select_all(vec![1, 2]);
        sel.retain(&HashSet::new());
        assert!(sel.is_empty());
    }
}
