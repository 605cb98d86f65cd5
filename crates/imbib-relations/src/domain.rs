//! Entry domain model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// A bibliographic entry (pivot, fetched relation, or library member)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct Entry {
    pub id: String,
    pub cite_key: String,
    pub entry_type: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub abstract_text: Option<String>,
    pub url: Option<String>,
    pub citation_count: Option<i32>,

    // Additional fields (catch-all for non-standard fields)
    pub extra_fields: HashMap<String, String>,
}

impl Entry {
    /// Create a new entry with required fields
    pub fn new(cite_key: String, entry_type: String, title: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            cite_key,
            entry_type,
            title,
            authors: Vec::new(),
            year: None,
            venue: None,
            doi: None,
            abstract_text: None,
            url: None,
            citation_count: None,
            extra_fields: HashMap::new(),
        }
    }

    /// Builder-style DOI setter
    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    /// Copy of this entry under a fresh id
    pub fn with_new_id(&self) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }
}

/// Generate a cite key in `FamilyYEARFirstword` form.
///
/// Falls back to `fallback` when neither authors nor year are known.
pub fn generate_cite_key(
    authors: &[String],
    year: Option<i32>,
    title: &str,
    fallback: &str,
) -> String {
    let family = authors
        .first()
        .and_then(|name| name.split_whitespace().last())
        .map(ascii_fold)
        .unwrap_or_default();

    if family.is_empty() && year.is_none() {
        return ascii_fold(fallback);
    }

    let first_word = title
        .split_whitespace()
        .map(ascii_fold)
        .find(|w| w.len() > 3)
        .unwrap_or_default();

    let mut key = family;
    if let Some(year) = year {
        key.push_str(&year.to_string());
    }
    key.push_str(&capitalize(&first_word));
    key
}

/// Strip diacritics and drop everything that is not ASCII alphanumeric
fn ascii_fold(s: &str) -> String {
    s.nfkd().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
