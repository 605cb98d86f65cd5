//! Import of selected related entries into the active collection

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classify::RelatedEntry;
use crate::collection::{ActiveCollection, CollectionOperation, UndoUnit};
use crate::identity::Doi;

/// Result of an import operation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct ImportOutcome {
    /// Ids (in the collection) of the entries that were added
    pub imported_ids: Vec<String>,
    /// Entries skipped because the collection already has them
    pub skipped_local: u32,
}

impl ImportOutcome {
    pub fn imported(&self) -> usize {
        self.imported_ids.len()
    }
}

/// Request to focus an entry that is already in the collection
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct FocusRequest {
    pub entry_id: String,
    pub cite_key: String,
}

/// Merge the selected entries into `collection` as one undoable unit.
///
/// Membership is re-checked now, since the collection may have changed
/// since classification. Entries selected twice (same DOI) are imported
/// once. Imported entries get fresh ids. No undo unit is registered when
/// nothing was imported.
pub fn import_selected<C>(selected: &[RelatedEntry], collection: &mut C) -> ImportOutcome
where
    C: ActiveCollection + ?Sized,
{
    let mut outcome = ImportOutcome::default();
    let mut seen: HashSet<Doi> = HashSet::new();
    let mut to_add = Vec::new();

    for related in selected {
        match related.doi() {
            // The classification flag may be stale; current membership decides
            Some(doi) if collection.contains(&doi) => {
                outcome.skipped_local += 1;
            }
            Some(doi) if !seen.insert(doi.clone()) => {
                // Already queued in this batch
                outcome.skipped_local += 1;
            }
            _ => to_add.push(related.entry.with_new_id()),
        }
    }

    if to_add.is_empty() {
        tracing::debug!(
            "Nothing to import ({} selected, {} already local)",
            selected.len(),
            outcome.skipped_local
        );
        return outcome;
    }

    outcome.imported_ids = to_add.iter().map(|e| e.id.clone()).collect();
    let description = match to_add.len() {
        1 => "Import 1 related entry".to_string(),
        n => format!("Import {} related entries", n),
    };

    collection.append_all(to_add.clone());
    collection.register_undo_unit(UndoUnit::new(
        description,
        CollectionOperation::Append { entries: to_add },
    ));

    tracing::info!(
        "Imported {} related entries ({} skipped as local)",
        outcome.imported(),
        outcome.skipped_local
    );
    outcome
}

/// Locate an already-local related entry in the collection. No mutation.
pub fn focus_existing<C>(related: &RelatedEntry, collection: &C) -> Option<FocusRequest>
where
    C: ActiveCollection + ?Sized,
{
    let doi = related.doi()?;
    collection.find_by_doi(&doi).map(|entry| FocusRequest {
        entry_id: entry.id.clone(),
        cite_key: entry.cite_key.clone(),
    })
}
