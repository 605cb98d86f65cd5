//! Relation fetch service
//!
//! The coordinator only knows the `RelationFetcher` trait; the transport
//! behind it is opaque. Cancellation is cooperative: implementations receive
//! a `CancellationToken` by value and must return `FetchError::Cancelled`
//! promptly once it fires.

#[cfg(feature = "native")]
pub mod http;
pub mod semantic_scholar;

#[cfg(feature = "native")]
pub use http::HttpClient;
pub use semantic_scholar::parse_relations_response;
#[cfg(feature = "native")]
pub use semantic_scholar::SemanticScholarFetcher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::domain::Entry;
use crate::error::FetchError;
use crate::identity::Doi;

/// Direction of the relation being explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Enum))]
pub enum RelationKind {
    /// Works that cite the pivot
    Citations,
    /// Works cited by the pivot
    References,
}

impl RelationKind {
    /// Path segment used by the Graph API
    pub fn path(&self) -> &'static str {
        match self {
            RelationKind::Citations => "citations",
            RelationKind::References => "references",
        }
    }

    /// Heading shown above the related-entries list
    pub fn heading(&self) -> &'static str {
        match self {
            RelationKind::Citations => "Cited By",
            RelationKind::References => "Cites",
        }
    }
}

/// External lookup of entries related to a DOI
#[async_trait]
pub trait RelationFetcher: Send + Sync {
    /// Fetch related entries in the order the source returns them.
    ///
    /// Single attempt; retries are a caller concern.
    async fn fetch(
        &self,
        doi: &Doi,
        kind: RelationKind,
        cancel: CancellationToken,
    ) -> Result<Vec<Entry>, FetchError>;
}
