//! imbib-relations: Citation and reference discovery for imbib
//!
//! This crate provides:
//! - **Identity**: DOI resolution for a pivot entry
//! - **Fetch**: the `RelationFetcher` service trait and a Semantic Scholar backend
//! - **State**: the `Pending → Success | Failure` fetch result model
//! - **Coordinator**: single-flight, cancellable, reloadable fetch cycles per pivot
//! - **Classify**: marking fetched entries that are already in the library
//! - **Import**: merging selected entries as one undoable unit
//!
//! # Flow
//!
//! ```text
//! resolve(pivot) → RelationCoordinator ──fetch──▶ StateChange stream
//!                                                     │ Success
//!                                                     ▼
//!                        classify(entries, library) → import_selected(..)
//! ```

pub mod classify;
pub mod collection;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod import;
pub mod library;
pub mod state;

pub use classify::{candidates, classify, local_count, RelatedEntry};
pub use collection::{ActiveCollection, CollectionOperation, UndoUnit};
pub use config::RelationsConfig;
pub use coordinator::{LoadOutcome, RelatedEntries, RelationCoordinator, StateChange};
pub use domain::Entry;
pub use error::{ConfigError, FetchError, RelationError, Result};
#[cfg(feature = "native")]
pub use fetch::SemanticScholarFetcher;
pub use fetch::{RelationFetcher, RelationKind};
pub use identity::{can_fetch, resolve, Doi};
pub use import::{focus_existing, import_selected, FocusRequest, ImportOutcome};
pub use library::{Library, UndoHistory};
pub use state::{FetchResult, RelationState};

// Setup UniFFI when the feature is enabled
#[cfg(feature = "uniffi")]
uniffi::setup_scaffolding!();

/// Returns the version of imbib-relations
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
