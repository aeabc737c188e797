/// Flattening of SPARQL JSON result sets into the records the pages render.
///
/// Documents are decoded with `sparesults`; each solution becomes a [`Row`] mapping
/// variable names to the lexical value of the bound term. Missing required bindings fail
/// with [`FlattenError::MissingBinding`]; optional variables map to `Option`.
use std::collections::HashMap;

use oxrdf::Term;
use sparesults::{
    QueryResultsFormat, QueryResultsParseError, QueryResultsParser, QuerySolution,
    ReaderQueryResultsParserOutput,
};

use crate::error::FlattenError;
use crate::model::{AuthorInfo, ResultCount, SearchResultItem, SearchResults, SubjectEntry};
use crate::query::{AUTHOR_SEPARATOR, RESULT_LIMIT};

pub const TRUNCATION_MARKER: &str = " [...]";
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_ABSTRACT_LEN: usize = 1000;

/// Decoded answer to a `SELECT` query.
#[derive(Debug, Clone, Default)]
pub struct SparqlResults {
    /// Variables declared in the result head, in order.
    pub variables: Vec<String>,
    pub rows: Vec<Row>,
}

impl SparqlResults {
    /// Decode an `application/sparql-results+json` document.
    ///
    /// Returns `None` for a boolean (`ASK`) document.
    pub fn from_json(body: &[u8]) -> Result<Option<Self>, QueryResultsParseError> {
        let solutions =
            match QueryResultsParser::from_format(QueryResultsFormat::Json).for_reader(body)? {
                ReaderQueryResultsParserOutput::Solutions(solutions) => solutions,
                ReaderQueryResultsParserOutput::Boolean(_) => return Ok(None),
            };
        let variables = solutions
            .variables()
            .iter()
            .map(|var| var.as_str().to_string())
            .collect();
        let rows = solutions
            .map(|solution| solution.map(|s| Row::from(&s)))
            .collect::<Result<_, _>>()?;
        Ok(Some(Self { variables, rows }))
    }

    /// Fails on the first variable of `projection` the head does not declare.
    pub fn require_variables(&self, projection: &[&str]) -> Result<(), FlattenError> {
        match projection
            .iter()
            .find(|var| !self.variables.iter().any(|declared| declared == *var))
        {
            Some(var) => Err(FlattenError::MissingVariable(var.to_string())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(HashMap<String, String>);

impl Row {
    pub fn get(&self, var: &str) -> Result<&str, FlattenError> {
        self.optional(var)
            .ok_or_else(|| FlattenError::MissingBinding(var.to_string()))
    }

    pub fn optional(&self, var: &str) -> Option<&str> {
        self.0.get(var).map(String::as_str)
    }
}

impl From<&QuerySolution> for Row {
    fn from(solution: &QuerySolution) -> Self {
        solution
            .iter()
            .map(|(var, term)| (var.as_str().to_string(), lexical_value(term)))
            .collect()
    }
}

impl FromIterator<(String, String)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}

/// IRI text or literal value; other terms keep their N-Triples form.
fn lexical_value(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::Literal(literal) => literal.value().to_string(),
        other => other.to_string(),
    }
}

/// A record built from one result row.
pub trait FromRow: Sized {
    fn from_row(index: usize, row: &Row) -> Result<Self, FlattenError>;
}

/// Convert every row, assigning zero-based indices in emission order.
pub fn flatten<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, FlattenError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| T::from_row(index, row))
        .collect()
}

impl FromRow for SearchResultItem {
    fn from_row(index: usize, row: &Row) -> Result<Self, FlattenError> {
        Ok(SearchResultItem {
            index,
            title: row.get("title")?.to_string(),
            authors: split_authors(row.get("authors")?),
            description: truncate(row.get("description")?, MAX_DESCRIPTION_LEN),
            content_type: row.get("type")?.to_string(),
            content_provider: row.get("provider")?.to_string(),
            content_link: row.get("link")?.to_string(),
            picture: row.optional("picture").map(str::to_string),
            object: row.get("object")?.to_string(),
        })
    }
}

impl FromRow for AuthorInfo {
    fn from_row(_index: usize, row: &Row) -> Result<Self, FlattenError> {
        Ok(AuthorInfo {
            name: row.get("name")?.to_string(),
            abstract_text: truncate(row.get("abstract")?, MAX_ABSTRACT_LEN),
            image: row.optional("image").map(str::to_string),
            link: row.get("link")?.to_string(),
        })
    }
}

impl FromRow for SubjectEntry {
    fn from_row(_index: usize, row: &Row) -> Result<Self, FlattenError> {
        Ok(SubjectEntry::new(row.get("subject")?))
    }
}

impl SearchResults {
    pub fn from_results(results: &SparqlResults) -> Result<Self, FlattenError> {
        let rows = &results.rows;
        Ok(SearchResults {
            items: flatten(rows)?,
            count: ResultCount::from_rows(rows.len(), RESULT_LIMIT),
        })
    }
}

impl AuthorInfo {
    /// First row wins; `None` when the lookup matched nothing.
    pub fn from_results(results: &SparqlResults) -> Result<Option<Self>, FlattenError> {
        results
            .rows
            .first()
            .map(|row| AuthorInfo::from_row(0, row))
            .transpose()
    }
}

/// Keep the first `max_chars` characters and append [`TRUNCATION_MARKER`] when longer.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Split a `GROUP_CONCAT`-ed author list.
///
/// Names containing the separator themselves are split too; the Europeana data has not
/// been checked for such names.
pub fn split_authors(joined: &str) -> Vec<String> {
    joined
        .split(AUTHOR_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryKind;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(var, value)| (var.to_string(), value.to_string()))
            .collect()
    }

    fn search_row(title: &str, description: &str) -> Row {
        row(&[
            ("object", "http://data.europeana.eu/item/9200579/abc"),
            ("title", title),
            ("authors", "Monet, Claude;Renoir, Pierre-Auguste"),
            ("description", description),
            ("type", "IMAGE"),
            ("provider", "Rijksmuseum"),
            ("link", "http://www.rijksmuseum.nl/item/abc"),
        ])
    }

    #[test]
    fn truncates_to_exact_length_with_marker() {
        let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        let out = truncate(&long, MAX_DESCRIPTION_LEN);
        assert_eq!(out.chars().count(), MAX_DESCRIPTION_LEN + TRUNCATION_MARKER.len());
        assert!(out.ends_with(" [...]"));
        assert!(out.starts_with(&"x".repeat(MAX_DESCRIPTION_LEN)));

        let abstract_text = "é".repeat(1500);
        let out = truncate(&abstract_text, MAX_ABSTRACT_LEN);
        assert_eq!(out.chars().count(), 1006);
    }

    #[test]
    fn text_at_threshold_is_untouched() {
        let exact = "y".repeat(MAX_DESCRIPTION_LEN);
        assert_eq!(truncate(&exact, MAX_DESCRIPTION_LEN), exact);
        assert_eq!(truncate("", MAX_DESCRIPTION_LEN), "");
    }

    #[test]
    fn authors_split_on_separator() {
        assert_eq!(
            split_authors("Monet, Claude;Renoir, Pierre-Auguste; "),
            vec!["Monet, Claude", "Renoir, Pierre-Auguste"]
        );
        assert!(split_authors("").is_empty());
    }

    #[test]
    fn search_items_are_indexed_in_order() {
        let rows = vec![search_row("Water Lilies", "Pond"), search_row("Haystacks", "Field")];
        let items: Vec<SearchResultItem> = flatten(&rows).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].index, 0);
        assert_eq!(items[0].title, "Water Lilies");
        assert_eq!(items[1].index, 1);
        assert_eq!(items[1].authors, vec!["Monet, Claude", "Renoir, Pierre-Auguste"]);
        assert_eq!(items[1].picture, None);
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let rows = vec![search_row("Water Lilies", &"d".repeat(800))];
        let items: Vec<SearchResultItem> = flatten(&rows).unwrap();
        assert_eq!(items[0].description.len(), 506);
    }

    #[test]
    fn missing_binding_is_reported() {
        let rows = vec![row(&[("title", "Untitled")])];
        let err = flatten::<SearchResultItem>(&rows).unwrap_err();
        assert!(matches!(err, FlattenError::MissingBinding(_)));
    }

    #[test]
    fn undeclared_projection_variable_is_reported() {
        let results = SparqlResults {
            variables: vec!["subject".to_string()],
            rows: vec![],
        };
        assert_eq!(results.require_variables(&["subject"]), Ok(()));
        assert_eq!(
            results.require_variables(&["subject", "label"]),
            Err(FlattenError::MissingVariable("label".to_string()))
        );
    }

    #[test]
    fn boolean_document_has_no_rows() {
        let doc = br#"{ "head": {}, "boolean": true }"#;
        assert!(SparqlResults::from_json(doc).unwrap().is_none());
        assert!(SparqlResults::from_json(b"<html>").is_err());
    }

    #[test]
    fn parses_sparql_json_and_caps_count() {
        let row_json = r#"{
            "object": { "type": "uri", "value": "http://data.europeana.eu/item/1" },
            "title": { "type": "literal", "value": "T" },
            "authors": { "type": "literal", "value": "A" },
            "description": { "type": "literal", "xml:lang": "en", "value": "D" },
            "type": { "type": "literal", "value": "TEXT" },
            "provider": { "type": "literal", "value": "P" },
            "link": { "type": "uri", "value": "http://example.org/1" },
            "picture": { "type": "uri", "value": "http://example.org/1.jpg" }
        }"#;
        let rows = vec![row_json; RESULT_LIMIT].join(",");
        let doc = format!(
            r#"{{ "head": {{ "vars": ["object", "title", "authors", "description", "type",
                "provider", "link", "picture"] }},
                "results": {{ "bindings": [{rows}] }} }}"#
        );
        let parsed = SparqlResults::from_json(doc.as_bytes()).unwrap().unwrap();
        assert_eq!(parsed.require_variables(QueryKind::Search.projection()), Ok(()));
        assert_eq!(parsed.rows[0].get("description"), Ok("D"));
        let results = SearchResults::from_results(&parsed).unwrap();
        assert_eq!(results.items.len(), RESULT_LIMIT);
        assert_eq!(results.count.to_string(), "100+");
        assert_eq!(
            results.items[99].picture.as_deref(),
            Some("http://example.org/1.jpg")
        );
    }

    #[test]
    fn author_info_takes_first_row_only() {
        let long_abstract = "a".repeat(1200);
        let doc = SparqlResults {
            variables: vec![],
            rows: vec![
                row(&[
                    ("name", "Claude Monet"),
                    ("abstract", long_abstract.as_str()),
                    ("link", "http://en.wikipedia.org/wiki/Claude_Monet"),
                ]),
                row(&[("name", "Other"), ("abstract", "b"), ("link", "c")]),
            ],
        };
        let info = AuthorInfo::from_results(&doc).unwrap().unwrap();
        assert_eq!(info.name, "Claude Monet");
        assert_eq!(info.abstract_text.chars().count(), MAX_ABSTRACT_LEN + 6);
        assert_eq!(info.image, None);

        assert_eq!(
            AuthorInfo::from_results(&SparqlResults::default()).unwrap(),
            None
        );
    }
}
