use std::fmt;

use serde::{Serialize, Serializer};

/// Namespace of GEMET thesaurus concepts.
pub const GEMET_CONCEPT_PREFIX: &str = "http://www.eionet.europa.eu/gemet/concept/";

/// One Europeana object on a results page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultItem {
    /// Zero-based position in the response, stable within one render only.
    pub index: usize,
    pub title: String,
    pub authors: Vec<String>,
    /// Description, truncated to 500 characters plus the truncation marker.
    pub description: String,
    pub content_type: String,
    pub content_provider: String,
    pub content_link: String,
    pub picture: Option<String>,
    /// `edm:ProvidedCHO` IRI of the object.
    pub object: String,
}

/// Items from one search together with the (possibly capped) row count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub items: Vec<SearchResultItem>,
    pub count: ResultCount,
}

/// Number of rows a search produced.
///
/// When the row count reaches the query `LIMIT` the real number is unknown, so the count
/// renders as `"100+"` instead of an exact integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCount {
    Exact(usize),
    AtLeast(usize),
}

impl ResultCount {
    pub fn from_rows(rows: usize, limit: usize) -> Self {
        if rows >= limit {
            ResultCount::AtLeast(limit)
        } else {
            ResultCount::Exact(rows)
        }
    }
}

impl fmt::Display for ResultCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCount::Exact(n) => write!(f, "{n}"),
            ResultCount::AtLeast(n) => write!(f, "{n}+"),
        }
    }
}

impl Serialize for ResultCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResultCount::Exact(n) => serializer.serialize_u64(*n as u64),
            ResultCount::AtLeast(_) => serializer.collect_str(self),
        }
    }
}

/// DBpedia summary of a person, taken from the first matching row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorInfo {
    pub name: String,
    /// English abstract, truncated to 1000 characters plus the truncation marker.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub image: Option<String>,
    pub link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Plain,
    GemetConcept,
}

impl SubjectKind {
    pub fn classify(uri: &str) -> Self {
        if uri.starts_with(GEMET_CONCEPT_PREFIX) {
            SubjectKind::GemetConcept
        } else {
            SubjectKind::Plain
        }
    }
}

/// A subject of an object, serialized as a `[label, uri]` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectEntry {
    pub label: String,
    pub uri: String,
    pub kind: SubjectKind,
}

impl SubjectEntry {
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            label: uri.clone(),
            kind: SubjectKind::classify(&uri),
            uri,
        }
    }

    /// Replace the label with the thesaurus-prefixed form.
    pub fn with_gemet_label(mut self, label: &str) -> Self {
        self.label = format!("GEMET: {label}");
        self
    }
}

impl Serialize for SubjectEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.label, &self.uri).serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectList {
    pub subjects: Vec<SubjectEntry>,
}
