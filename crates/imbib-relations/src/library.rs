//! In-memory library implementing `ActiveCollection`
//!
//! Keeps entries in insertion order with a DOI index for membership lookup,
//! plus a bounded undo/redo history of `UndoUnit`s.

use std::collections::HashMap;

use crate::collection::{ActiveCollection, UndoUnit};
use crate::domain::Entry;
use crate::identity::Doi;

/// Undo units kept when no limit is configured
pub const DEFAULT_UNDO_LIMIT: usize = 50;

/// Undo/redo stack of collection mutations
#[derive(Clone, Debug)]
pub struct UndoHistory {
    undo_stack: Vec<UndoUnit>,
    redo_stack: Vec<UndoUnit>,
    max_size: usize,
}

impl UndoHistory {
    /// A limit of zero is raised to one so the latest unit can always be undone
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    pub fn push(&mut self, unit: UndoUnit) {
        self.undo_stack.push(unit);
        self.redo_stack.clear(); // Clear redo stack on new action

        // Limit stack size
        while self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
    }

    fn pop_undo(&mut self) -> Option<UndoUnit> {
        let unit = self.undo_stack.pop()?;
        self.redo_stack.push(unit.clone());
        Some(unit)
    }

    fn pop_redo(&mut self) -> Option<UndoUnit> {
        let unit = self.redo_stack.pop()?;
        self.undo_stack.push(unit.clone());
        Some(unit)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    /// Description of the unit the next undo would revert
    pub fn next_undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|u| u.description.as_str())
    }
}

/// A library of entries
#[derive(Clone, Debug)]
pub struct Library {
    entries: Vec<Entry>,
    by_doi: HashMap<Doi, usize>,
    history: UndoHistory,
}

impl Library {
    pub fn new(undo_limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            by_doi: HashMap::new(),
            history: UndoHistory::new(undo_limit),
        }
    }

    /// Build a library from existing entries without recording undo history
    pub fn with_entries(entries: Vec<Entry>, undo_limit: usize) -> Self {
        let mut library = Self::new(undo_limit);
        library.append_all(entries);
        library
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Add a single entry outside of any undo unit
    pub fn insert(&mut self, entry: Entry) {
        self.append_all(vec![entry]);
    }

    /// Revert the most recent undo unit. Returns its description.
    pub fn undo(&mut self) -> Option<String> {
        if !self.history.can_undo() {
            tracing::debug!("Nothing to undo");
            return None;
        }
        let unit = self.history.pop_undo()?;
        unit.operation.inverse().apply(self);
        tracing::debug!("Undid '{}'", unit.description);
        Some(unit.description)
    }

    /// Re-apply the most recently undone unit. Returns its description.
    pub fn redo(&mut self) -> Option<String> {
        if !self.history.can_redo() {
            tracing::debug!("Nothing to redo");
            return None;
        }
        let unit = self.history.pop_redo()?;
        unit.operation.apply(self);
        tracing::debug!("Redid '{}'", unit.description);
        Some(unit.description)
    }

    /// Rebuild the DOI index; the first entry carrying a DOI wins, as in `append_all`
    fn reindex(&mut self) {
        self.by_doi.clear();
        for (idx, entry) in self.entries.iter().enumerate() {
            if let Some(doi) = entry.doi.as_deref().and_then(Doi::parse) {
                self.by_doi.entry(doi).or_insert(idx);
            }
        }
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

impl ActiveCollection for Library {
    fn contains(&self, doi: &Doi) -> bool {
        self.by_doi.contains_key(doi)
    }

    fn find_by_doi(&self, doi: &Doi) -> Option<&Entry> {
        self.by_doi.get(doi).and_then(|&idx| self.entries.get(idx))
    }

    fn append_all(&mut self, entries: Vec<Entry>) {
        for entry in entries {
            if let Some(doi) = entry.doi.as_deref().and_then(Doi::parse) {
                self.by_doi.entry(doi).or_insert(self.entries.len());
            }
            self.entries.push(entry);
        }
    }

    fn remove_all(&mut self, ids: &[String]) {
        self.entries.retain(|e| !ids.contains(&e.id));
        self.reindex();
    }

    fn register_undo_unit(&mut self, unit: UndoUnit) {
        self.history.push(unit);
    }
}
