//! Checkbox selection state for entity-list screens
//!
//! A [`SelectionStore`] remembers which ids the user has checked. It never
//! learns the full set of ids that exist: every aggregate query takes the
//! ids currently on screen ("candidates") from the caller.
//!
//! One store is created per list screen and handed to whatever renders or
//! acts on that list.
//!
//! ```rust,ignore
//! let mut selection = SelectionStore::<EntityId>::new();
//! let visible: Vec<EntityId> = todos.iter().map(|t| t.id()).collect();
//!
//! selection.toggle_all(&visible);
//! assert!(selection.is_all_selected(&visible));
//!
//! let report = todos_client.delete_many(selection.selected_ids()).await;
//! selection.clear();
//! ```

use std::collections::HashSet;
use std::hash::Hash;

/// Set of checked ids for one list screen
#[derive(Debug, Clone)]
pub struct SelectionStore<K> {
    selected: HashSet<K>,
}

impl<K> Default for SelectionStore<K> {
    fn default() -> Self {
        Self {
            selected: HashSet::new(),
        }
    }
}

impl<K> SelectionStore<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`
    pub fn toggle(&mut self, id: K) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Select every candidate, or deselect them if they are all selected already
    ///
    /// Ids outside `candidates` (another page, filtered out) keep their state.
    pub fn toggle_all(&mut self, candidates: &[K]) {
        if self.is_all_selected(candidates) {
            for id in candidates {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(candidates.iter().cloned());
        }
    }

    /// Drop every selected id
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Replace the selection with exactly `ids`
    pub fn set_all<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = K>,
    {
        self.selected = ids.into_iter().collect();
    }

    pub fn is_selected(&self, id: &K) -> bool {
        self.selected.contains(id)
    }

    /// True when `candidates` is non-empty and every one of them is selected
    pub fn is_all_selected(&self, candidates: &[K]) -> bool {
        !candidates.is_empty() && candidates.iter().all(|id| self.selected.contains(id))
    }

    /// The "indeterminate" checkbox state: some but not all candidates selected
    pub fn is_partially_selected(&self, candidates: &[K]) -> bool {
        let mut any = false;
        let mut all = true;
        for id in candidates {
            if self.selected.contains(id) {
                any = true;
            } else {
                all = false;
            }
        }
        any && !all
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Snapshot of the selected ids, in no particular order
    pub fn selected_ids(&self) -> Vec<K> {
        self.selected.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.selected.iter()
    }
}
