//! Local-membership classification of fetched entries

use serde::{Deserialize, Serialize};

use crate::collection::ActiveCollection;
use crate::domain::Entry;
use crate::identity::Doi;

/// A fetched entry tagged with whether the library already has it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct RelatedEntry {
    pub entry: Entry,
    pub is_local: bool,
}

impl RelatedEntry {
    /// The entry's normalized DOI, if it has a usable one
    pub fn doi(&self) -> Option<Doi> {
        self.entry.doi.as_deref().and_then(Doi::parse)
    }
}

/// Mark each fetched entry as local or candidate, preserving fetch order.
///
/// Entries without a DOI are never local.
pub fn classify<C>(raw_entries: &[Entry], collection: &C) -> Vec<RelatedEntry>
where
    C: ActiveCollection + ?Sized,
{
    raw_entries
        .iter()
        .map(|entry| {
            let is_local = entry
                .doi
                .as_deref()
                .and_then(Doi::parse)
                .is_some_and(|doi| collection.contains(&doi));
            RelatedEntry {
                entry: entry.clone(),
                is_local,
            }
        })
        .collect()
}

/// Count of entries already in the library
pub fn local_count(entries: &[RelatedEntry]) -> usize {
    entries.iter().filter(|e| e.is_local).count()
}

/// Entries that can still be imported
pub fn candidates(entries: &[RelatedEntry]) -> impl Iterator<Item = &RelatedEntry> {
    entries.iter().filter(|e| !e.is_local)
}
