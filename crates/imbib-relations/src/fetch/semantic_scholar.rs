//! Semantic Scholar relation source
//!
//! API docs: https://api.semanticscholar.org/api-docs/graph
//! Rate limit: ~1 req/sec without an API key

use serde::Deserialize;
use std::collections::HashMap;

use super::RelationKind;
use crate::domain::{generate_cite_key, Entry};
use crate::error::FetchError;

#[derive(Debug, Deserialize)]
struct RelationsResponse {
    #[serde(default)]
    data: Option<Vec<RelationEdge>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelationEdge {
    citing_paper: Option<Paper>,
    cited_paper: Option<Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paper {
    paper_id: Option<String>,
    external_ids: Option<HashMap<String, serde_json::Value>>,
    title: Option<String>,
    year: Option<i32>,
    venue: Option<String>,
    authors: Option<Vec<PaperAuthor>>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    url: Option<String>,
    citation_count: Option<i32>,
    publication_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PaperAuthor {
    name: Option<String>,
}

/// Fields requested for every related paper
pub const PAPER_FIELDS: &str =
    "paperId,externalIds,title,year,venue,authors,abstract,url,citationCount,publicationTypes";

/// Parse a `/citations` or `/references` response into entries.
///
/// Papers without a title are dropped; order is preserved otherwise.
pub fn parse_relations_response(json: &str, kind: RelationKind) -> Result<Vec<Entry>, FetchError> {
    let response: RelationsResponse =
        serde_json::from_str(json).map_err(|e| FetchError::Parse {
            message: format!("Invalid Semantic Scholar JSON: {}", e),
        })?;

    Ok(response
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|edge| match kind {
            RelationKind::Citations => edge.citing_paper,
            RelationKind::References => edge.cited_paper,
        })
        .filter_map(paper_to_entry)
        .collect())
}

fn paper_to_entry(paper: Paper) -> Option<Entry> {
    let title = paper.title.filter(|t| !t.trim().is_empty())?;

    let authors: Vec<String> = paper
        .authors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| a.name)
        .collect();

    let mut external_ids = paper.external_ids.unwrap_or_default();
    let doi = external_ids
        .remove("DOI")
        .and_then(|v| v.as_str().map(str::to_string));

    let paper_id = paper.paper_id.unwrap_or_default();
    let cite_key = generate_cite_key(&authors, paper.year, &title, &paper_id);

    let entry_type = match paper.publication_types.as_deref() {
        Some(types) if types.iter().any(|t| t == "Conference") => "inproceedings",
        Some(types) if types.iter().any(|t| t == "Book") => "book",
        _ => "article",
    };

    let mut entry = Entry::new(cite_key, entry_type.to_string(), title);
    entry.authors = authors;
    entry.year = paper.year;
    entry.venue = paper.venue.filter(|v| !v.is_empty());
    entry.doi = doi;
    entry.abstract_text = paper.abstract_text;
    entry.url = paper.url;
    entry.citation_count = paper.citation_count;
    if !paper_id.is_empty() {
        entry
            .extra_fields
            .insert("semanticscholar".to_string(), paper_id);
    }
    for (key, value) in external_ids {
        if let Some(value) = value.as_str() {
            entry.extra_fields.insert(key.to_lowercase(), value.to_string());
        }
    }

    Some(entry)
}

#[cfg(feature = "native")]
mod client {
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::{parse_relations_response, PAPER_FIELDS};
    use crate::config::RelationsConfig;
    use crate::domain::Entry;
    use crate::error::FetchError;
    use crate::fetch::{HttpClient, RelationFetcher, RelationKind};
    use crate::identity::Doi;

    /// `RelationFetcher` backed by the Semantic Scholar Graph API
    pub struct SemanticScholarFetcher {
        client: HttpClient,
        base_url: String,
        limit: String,
    }

    impl SemanticScholarFetcher {
        pub fn new(config: &RelationsConfig) -> Result<Self, FetchError> {
            Ok(Self {
                client: HttpClient::from_config(config)?,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                limit: config.result_limit.to_string(),
            })
        }

        pub fn relations_url(&self, doi: &Doi, kind: RelationKind) -> String {
            // DOI slashes stay literal; everything else inside a segment is escaped
            let doi_path = doi
                .as_str()
                .split('/')
                .map(|segment| urlencoding::encode(segment).into_owned())
                .collect::<Vec<_>>()
                .join("/");
            format!("{}/paper/DOI:{}/{}", self.base_url, doi_path, kind.path())
        }
    }

    #[async_trait]
    impl RelationFetcher for SemanticScholarFetcher {
        async fn fetch(
            &self,
            doi: &Doi,
            kind: RelationKind,
            cancel: CancellationToken,
        ) -> Result<Vec<Entry>, FetchError> {
            let url = self.relations_url(doi, kind);
            let params = [("fields", PAPER_FIELDS), ("limit", self.limit.as_str())];

            let body = self.client.get_with_params(&url, &params, &cancel).await?;
            let entries = parse_relations_response(&body, kind)?;
            tracing::debug!("Fetched {} {} for {}", entries.len(), kind.path(), doi);
            Ok(entries)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_relations_url() {
            let fetcher = SemanticScholarFetcher::new(&RelationsConfig::default()).unwrap();
            let doi = Doi::parse("10.1038/nature12373").unwrap();
            assert_eq!(
                fetcher.relations_url(&doi, RelationKind::References),
                "https://api.semanticscholar.org/graph/v1/paper/DOI:10.1038/nature12373/references"
            );
        }
    }
}

#[cfg(feature = "native")]
pub use client::SemanticScholarFetcher;
