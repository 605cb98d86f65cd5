//! Pivot identity resolution
//!
//! Extracts the lookup key (a DOI) from an entry. The same normalized key is
//! used both to query the relation service and to test library membership.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::domain::Entry;

lazy_static! {
    // Registrant codes are not length-constrained here; short test DOIs like
    // "10.1/x" must resolve.
    static ref DOI_PATTERN: Regex = Regex::new(r"^10\.\d+/\S+$").unwrap();
}

/// A normalized, case-folded DOI
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Doi(String);

impl Doi {
    /// Parse and normalize a DOI, returning `None` if it does not look like one
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_doi(raw);
        DOI_PATTERN
            .is_match(&normalized)
            .then(|| Doi(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Doi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Doi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Doi::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid DOI: {}", raw)))
    }
}

/// Strip resolver prefixes and trailing punctuation, then lower-case
fn normalize_doi(doi: &str) -> String {
    let mut result = doi.trim();

    let prefixes = [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi:",
        "DOI:",
    ];

    for prefix in prefixes {
        if let Some(stripped) = result.strip_prefix(prefix) {
            result = stripped.trim_start();
            break;
        }
    }

    result
        .trim_end_matches(['.', ',', ';'])
        .to_lowercase()
}

/// Resolve the pivot's lookup key
pub fn resolve(pivot: &Entry) -> Option<Doi> {
    pivot.doi.as_deref().and_then(Doi::parse)
}

/// Whether a relation lookup is possible for this pivot at all
pub fn can_fetch(pivot: &Entry) -> bool {
    resolve(pivot).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_doi(doi: Option<&str>) -> Entry {
        let mut entry = Entry::new("k".into(), "article".into(), "T".into());
        entry.doi = doi.map(str::to_string);
        entry
    }

    #[test]
    fn test_parse_normalizes() {
        let doi = Doi::parse("https://doi.org/10.1038/Nature12373.").unwrap();
        assert_eq!(doi.as_str(), "10.1038/nature12373");
        assert_eq!(Doi::parse("doi: 10.1/x").unwrap().as_str(), "10.1/x");
    }

    #[test]
    fn test_parse_rejects_non_doi() {
        assert!(Doi::parse("").is_none());
        assert!(Doi::parse("arXiv:2301.12345").is_none());
        assert!(Doi::parse("10.1234").is_none());
    }

    #[test]
    fn test_case_insensitive_equality() {
        assert_eq!(Doi::parse("10.1000/ABC"), Doi::parse("10.1000/abc"));
    }

    #[test]
    fn test_resolve_and_can_fetch() {
        assert!(can_fetch(&entry_with_doi(Some("10.1/x"))));
        assert!(!can_fetch(&entry_with_doi(None)));
        assert!(!can_fetch(&entry_with_doi(Some("   "))));
        assert_eq!(
            resolve(&entry_with_doi(Some("10.1/x"))).map(|d| d.to_string()),
            Some("10.1/x".to_string())
        );
    }

    #[test]
    fn test_serde_as_string() {
        let doi = Doi::parse("10.1/x").unwrap();
        assert_eq!(serde_json::to_string(&doi).unwrap(), "\"10.1/x\"");
        assert!(serde_json::from_str::<Doi>("\"nope\"").is_err());
    }
}
