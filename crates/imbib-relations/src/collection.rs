//! Active collection interface and undo units

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Entry;
use crate::identity::Doi;

/// The user's working set of entries.
///
/// Only membership lookup and batched mutation are needed here; storage and
/// the undo stack itself belong to the host.
pub trait ActiveCollection {
    /// Whether an entry with this DOI is already present
    fn contains(&self, doi: &Doi) -> bool;

    /// Find the member carrying this DOI
    fn find_by_doi(&self, doi: &Doi) -> Option<&Entry>;

    /// Append a batch of entries in order
    fn append_all(&mut self, entries: Vec<Entry>);

    /// Remove the entries with these ids
    fn remove_all(&mut self, ids: &[String]);

    /// Register one user-revertible unit of work
    fn register_undo_unit(&mut self, unit: UndoUnit);
}

/// A reversible mutation of the collection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CollectionOperation {
    Append { entries: Vec<Entry> },
    Remove { entries: Vec<Entry> },
}

impl CollectionOperation {
    /// Create the inverse operation (for undo)
    pub fn inverse(&self) -> Self {
        match self {
            Self::Append { entries } => Self::Remove {
                entries: entries.clone(),
            },
            Self::Remove { entries } => Self::Append {
                entries: entries.clone(),
            },
        }
    }

    /// Apply this operation to a collection
    pub fn apply<C: ActiveCollection + ?Sized>(&self, collection: &mut C) {
        match self {
            Self::Append { entries } => collection.append_all(entries.clone()),
            Self::Remove { entries } => {
                let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
                collection.remove_all(&ids);
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Append { entries } | Self::Remove { entries } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One atomic, user-revertible batch of mutations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UndoUnit {
    pub description: String,
    pub operation: CollectionOperation,
    pub registered_at: DateTime<Utc>,
}

impl UndoUnit {
    pub fn new(description: impl Into<String>, operation: CollectionOperation) -> Self {
        Self {
            description: description.into(),
            operation,
            registered_at: Utc::now(),
        }
    }
}
