/// SPARQL query templates for the Europeana, DBpedia and GEMET endpoints.
///
/// Every [`QueryKind`] owns a fixed template body with numbered placeholders (`%0`, `%1`, ...)
/// and a fixed list of slot types. [`build_query`] checks the argument count against the
/// slot list and renders each argument as an `oxrdf` term before substitution: literals go
/// through the N-Triples string escaping, IRIs must parse as absolute IRIs.
use std::fmt;
use std::str::FromStr;

use oxrdf::{Literal, NamedNode};

use crate::error::QueryError;
use crate::sparql::Endpoint;

macro_rules! author_separator {
    () => {
        ";"
    };
}

macro_rules! result_limit {
    () => {
        "100"
    };
}

/// Separator used by `GROUP_CONCAT` for the `?authors` projection and by the flattener
/// when splitting it back apart.
pub const AUTHOR_SEPARATOR: &str = author_separator!();

/// `LIMIT` applied by every Europeana search template.
pub const RESULT_LIMIT: usize = 100;

/// Languages OR-ed together by [`QueryKind::SearchMultLangs`].
pub const SEARCH_LANGUAGES: [&str; 7] = ["en", "de", "fr", "it", "es", "nl", "pl"];

macro_rules! europeana_search {
    ($pattern:literal) => {
        concat!(
            "PREFIX dc: <http://purl.org/dc/elements/1.1/>\n",
            "PREFIX edm: <http://www.europeana.eu/schemas/edm/>\n",
            "PREFIX ore: <http://www.openarchives.org/ore/terms/>\n",
            "SELECT ?object (SAMPLE(?t) AS ?title) ",
            "(GROUP_CONCAT(DISTINCT ?creator; separator=\"",
            author_separator!(),
            "\") AS ?authors) ",
            "(SAMPLE(?d) AS ?description) (SAMPLE(?ty) AS ?type) ",
            "(SAMPLE(?prov) AS ?provider) (SAMPLE(?l) AS ?link) (SAMPLE(?pic) AS ?picture)\n",
            "WHERE {\n",
            $pattern,
            "  ?proxy ore:proxyFor ?object ;\n",
            "         dc:title ?t ;\n",
            "         dc:creator ?creator ;\n",
            "         dc:description ?d .\n",
            "  ?object edm:type ?ty .\n",
            "  ?aggregation edm:aggregatedCHO ?object ;\n",
            "               edm:dataProvider ?prov ;\n",
            "               edm:isShownAt ?l .\n",
            "  OPTIONAL { ?aggregation edm:object ?pic }\n",
            "}\n",
            "GROUP BY ?object\n",
            "LIMIT ",
            result_limit!(),
            "\n",
        )
    };
}

const SEARCH: &str = europeana_search!("  { ?proxy dc:subject %0 } UNION { ?proxy dc:subject %1 }\n");

const SEARCH_SUBJECT: &str = europeana_search!("  ?proxy dc:subject %0 .\n");

const SEARCH_URI: &str =
    europeana_search!("  { ?proxy dc:subject %0 } UNION { ?proxy edm:hasMet %0 }\n");

const SEARCH_AUTHOR: &str = europeana_search!("  ?proxy dc:creator %0 .\n");

const SEARCH_MULT_LANGS: &str = europeana_search!("  %0\n");

const AUTHOR_INFO: &str = r#"PREFIX dbo: <http://dbpedia.org/ontology/>
PREFIX foaf: <http://xmlns.com/foaf/0.1/>
SELECT ?person ?name ?abstract ?image ?link
WHERE {
  ?person a dbo:Person ;
          foaf:name ?name ;
          dbo:abstract ?abstract ;
          foaf:isPrimaryTopicOf ?link .
  FILTER (str(?name) = %0)
  FILTER (langMatches(lang(?abstract), "en"))
  OPTIONAL { ?person dbo:thumbnail ?image }
}
LIMIT 1
"#;

const LIST_SUBJECTS: &str = r#"PREFIX dc: <http://purl.org/dc/elements/1.1/>
PREFIX ore: <http://www.openarchives.org/ore/terms/>
SELECT DISTINCT ?subject
WHERE {
  ?proxy ore:proxyFor %0 ;
         dc:subject ?subject .
}
"#;

const GEMET_LABEL: &str = r#"PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
SELECT ?label
WHERE {
  %0 skos:prefLabel ?label .
  FILTER (langMatches(lang(?label), "en"))
}
LIMIT 1
"#;

/// How an argument is rendered into its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotType {
    /// Double-quoted simple literal.
    Literal,
    /// `<...>` reference to an absolute IRI.
    Iri,
    /// One `dc:subject` pattern per entry of [`SEARCH_LANGUAGES`], joined with `UNION`.
    LanguageUnion,
}

const SEARCH_PROJECTION: &[&str] = &[
    "object",
    "title",
    "authors",
    "description",
    "type",
    "provider",
    "link",
    "picture",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Subject match OR-ing a capitalized and a lowercased first letter.
    Search,
    /// Subject match on a single literal.
    SearchSubject,
    /// Subject or `edm:hasMet` match on an IRI.
    SearchUri,
    SearchAuthor,
    /// Subject match across the language tags in [`SEARCH_LANGUAGES`].
    SearchMultLangs,
    AuthorInfo,
    ListSubjects,
    GemetLabel,
}

impl QueryKind {
    pub const ALL: [QueryKind; 8] = [
        QueryKind::Search,
        QueryKind::SearchSubject,
        QueryKind::SearchUri,
        QueryKind::SearchAuthor,
        QueryKind::SearchMultLangs,
        QueryKind::AuthorInfo,
        QueryKind::ListSubjects,
        QueryKind::GemetLabel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            QueryKind::Search => "search",
            QueryKind::SearchSubject => "search_subject",
            QueryKind::SearchUri => "search_uri",
            QueryKind::SearchAuthor => "search_author",
            QueryKind::SearchMultLangs => "search_mult_langs",
            QueryKind::AuthorInfo => "author_info",
            QueryKind::ListSubjects => "list_subjects",
            QueryKind::GemetLabel => "gemet_label",
        }
    }

    pub fn slots(self) -> &'static [SlotType] {
        match self {
            QueryKind::Search => &[SlotType::Literal, SlotType::Literal],
            QueryKind::SearchSubject | QueryKind::SearchAuthor | QueryKind::AuthorInfo => {
                &[SlotType::Literal]
            }
            QueryKind::SearchMultLangs => &[SlotType::LanguageUnion],
            QueryKind::SearchUri | QueryKind::ListSubjects | QueryKind::GemetLabel => {
                &[SlotType::Iri]
            }
        }
    }

    /// Variables the template's `SELECT` clause declares.
    pub fn projection(self) -> &'static [&'static str] {
        match self {
            QueryKind::Search
            | QueryKind::SearchSubject
            | QueryKind::SearchUri
            | QueryKind::SearchAuthor
            | QueryKind::SearchMultLangs => SEARCH_PROJECTION,
            QueryKind::AuthorInfo => &["person", "name", "abstract", "image", "link"],
            QueryKind::ListSubjects => &["subject"],
            QueryKind::GemetLabel => &["label"],
        }
    }

    pub fn endpoint(self) -> Endpoint {
        match self {
            QueryKind::AuthorInfo => Endpoint::Dbpedia,
            QueryKind::GemetLabel => Endpoint::Gemet,
            _ => Endpoint::Europeana,
        }
    }

    fn template(self) -> &'static str {
        match self {
            QueryKind::Search => SEARCH,
            QueryKind::SearchSubject => SEARCH_SUBJECT,
            QueryKind::SearchUri => SEARCH_URI,
            QueryKind::SearchAuthor => SEARCH_AUTHOR,
            QueryKind::SearchMultLangs => SEARCH_MULT_LANGS,
            QueryKind::AuthorInfo => AUTHOR_INFO,
            QueryKind::ListSubjects => LIST_SUBJECTS,
            QueryKind::GemetLabel => GEMET_LABEL,
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueryKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| QueryError::UnknownKind(s.to_string()))
    }
}

/// Render `kind`'s template with `args` substituted into its slots.
pub fn build_query(kind: QueryKind, args: &[&str]) -> Result<String, QueryError> {
    let slots = kind.slots();
    if slots.len() != args.len() {
        return Err(QueryError::SlotCount {
            kind,
            expected: slots.len(),
            actual: args.len(),
        });
    }

    let rendered = slots
        .iter()
        .zip(args)
        .map(|(slot, arg)| match slot {
            SlotType::Literal => Ok(escape_literal(arg)),
            SlotType::Iri => iri_ref(arg),
            SlotType::LanguageUnion => language_union(arg),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(substitute(kind.template(), &rendered))
}

/// Quote `value` as a SPARQL simple literal.
pub fn escape_literal(value: &str) -> String {
    Literal::new_simple_literal(value).to_string()
}

/// Render `value` as `<value>` once it parses as an absolute IRI.
pub fn iri_ref(value: &str) -> Result<String, QueryError> {
    NamedNode::new(value)
        .map(|node| node.to_string())
        .map_err(|e| QueryError::InvalidIri {
            iri: value.to_string(),
            reason: e.to_string(),
        })
}

fn language_union(value: &str) -> Result<String, QueryError> {
    let patterns = SEARCH_LANGUAGES
        .iter()
        .map(|lang| {
            Literal::new_language_tagged_literal(value, *lang)
                .map(|tagged| format!("{{ ?proxy dc:subject {tagged} }}"))
                .map_err(|_| QueryError::InvalidLanguage(lang.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(patterns.join("\n  UNION "))
}

/// True when `text` should be searched as a resource IRI rather than a literal.
pub fn looks_like_uri(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Capitalized and lowercased first-letter variants of `term`.
///
/// Returns `None` when the first character has no case distinction (digits, CJK, ...).
pub fn case_variants(term: &str) -> Option<(String, String)> {
    let mut chars = term.chars();
    let first = chars.next()?;
    let rest = chars.as_str();
    let upper: String = first.to_uppercase().chain(rest.chars()).collect();
    let lower: String = first.to_lowercase().chain(rest.chars()).collect();
    (upper != lower).then_some((upper, lower))
}

/// Pick the search template for free-text or URI input and build its argument list.
pub fn search_plan(text: &str, all_languages: bool) -> (QueryKind, Vec<String>) {
    if looks_like_uri(text) {
        return (QueryKind::SearchUri, vec![text.to_string()]);
    }
    if all_languages {
        return (QueryKind::SearchMultLangs, vec![text.to_string()]);
    }
    match case_variants(text) {
        Some((upper, lower)) => (QueryKind::Search, vec![upper, lower]),
        None => (QueryKind::SearchSubject, vec![text.to_string()]),
    }
}

/// Single pass over `template`; inserted values are never re-scanned.
fn substitute(template: &str, rendered: &[String]) -> String {
    let extra: usize = rendered.iter().map(String::len).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            let slot = chars
                .peek()
                .and_then(|d| d.to_digit(10))
                .and_then(|idx| rendered.get(idx as usize));
            if let Some(value) = slot {
                chars.next();
                out.push_str(value);
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(template: &str) -> Vec<usize> {
        let mut found: Vec<usize> = template
            .match_indices('%')
            .filter_map(|(i, _)| template[i + 1..].chars().next()?.to_digit(10))
            .map(|d| d as usize)
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    #[test]
    fn every_slot_is_used_and_no_placeholder_is_dangling() {
        for kind in QueryKind::ALL {
            let expected: Vec<usize> = (0..kind.slots().len()).collect();
            assert_eq!(placeholders(kind.template()), expected, "kind {kind}");
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in QueryKind::ALL {
            assert_eq!(kind.name().parse::<QueryKind>(), Ok(kind));
        }
        assert_eq!(
            "search_everything".parse::<QueryKind>(),
            Err(QueryError::UnknownKind("search_everything".to_string()))
        );
    }

    #[test]
    fn search_author_places_name_in_creator_pattern() {
        let query = build_query(QueryKind::SearchAuthor, &["Monet"]).unwrap();
        assert!(query.contains("?proxy dc:creator \"Monet\" ."));
        assert!(query.contains("GROUP_CONCAT(DISTINCT ?creator; separator=\";\")"));
        assert!(query.contains("LIMIT 100"));
    }

    #[test]
    fn literal_slots_are_escaped() {
        let query =
            build_query(QueryKind::SearchAuthor, &["Mo\"net\" } ; DROP ALL #\nx\\"]).unwrap();
        assert!(query.contains(r#"dc:creator "Mo\"net\" } ; DROP ALL #\nx\\" ."#));
        let literal_line = query
            .lines()
            .find(|l| l.contains("dc:creator \""))
            .unwrap();
        assert!(literal_line.ends_with(" ."));
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let query = build_query(QueryKind::Search, &["%1", "b"]).unwrap();
        assert!(query.contains("dc:subject \"%1\" } UNION { ?proxy dc:subject \"b\" }"));
    }

    #[test]
    fn slot_count_mismatch_is_rejected() {
        assert_eq!(
            build_query(QueryKind::Search, &["Paris"]),
            Err(QueryError::SlotCount {
                kind: QueryKind::Search,
                expected: 2,
                actual: 1,
            })
        );
        assert!(build_query(QueryKind::GemetLabel, &[]).is_err());
    }

    #[test]
    fn iri_slots_must_be_absolute_iris() {
        for bad in [
            "foo",
            "not-an-iri",
            "http://example.org/a b",
            "http://example.org/a>",
            "http://example.org/%zz",
            "::::",
            "http://[bad/x",
            "",
        ] {
            assert!(
                matches!(iri_ref(bad), Err(QueryError::InvalidIri { ref iri, .. }) if iri == bad),
                "{bad:?} was accepted"
            );
        }
        assert_eq!(
            iri_ref("http://data.europeana.eu/item/1/x").unwrap(),
            "<http://data.europeana.eu/item/1/x>"
        );
    }

    #[test]
    fn relative_object_is_rejected_before_querying() {
        assert!(matches!(
            build_query(QueryKind::ListSubjects, &["foo"]),
            Err(QueryError::InvalidIri { .. })
        ));
    }

    #[test]
    fn uri_search_binds_subject_and_has_met() {
        let query = build_query(QueryKind::SearchUri, &["http://dbpedia.org/resource/Paris"])
            .unwrap();
        assert!(query.contains(
            "{ ?proxy dc:subject <http://dbpedia.org/resource/Paris> } \
             UNION { ?proxy edm:hasMet <http://dbpedia.org/resource/Paris> }"
        ));
    }

    #[test]
    fn mult_langs_unions_every_language() {
        let query = build_query(QueryKind::SearchMultLangs, &["paris"]).unwrap();
        for lang in SEARCH_LANGUAGES {
            assert!(query.contains(&format!("dc:subject \"paris\"@{lang} }}")));
        }
        assert_eq!(query.matches("UNION").count(), SEARCH_LANGUAGES.len() - 1);
        assert!(query.contains("GROUP BY ?object"));

        let query = build_query(QueryKind::SearchMultLangs, &["a\"b"]).unwrap();
        assert!(query.contains(r#"dc:subject "a\"b"@de }"#));
    }

    #[test]
    fn http_input_selects_uri_template() {
        let (kind, args) = search_plan("http://dbpedia.org/resource/Paris", false);
        assert_eq!(kind, QueryKind::SearchUri);
        assert_eq!(args, vec!["http://dbpedia.org/resource/Paris"]);

        let (kind, _) = search_plan("http://dbpedia.org/resource/Paris", true);
        assert_eq!(kind, QueryKind::SearchUri);
    }

    #[test]
    fn text_input_selects_case_union() {
        let (kind, args) = search_plan("paris", false);
        assert_eq!(kind, QueryKind::Search);
        assert_eq!(args, vec!["Paris", "paris"]);

        let (kind, args) = search_plan("1789", false);
        assert_eq!(kind, QueryKind::SearchSubject);
        assert_eq!(args, vec!["1789"]);

        let (kind, _) = search_plan("paris", true);
        assert_eq!(kind, QueryKind::SearchMultLangs);
    }

    #[test]
    fn case_variants_only_touch_first_letter() {
        assert_eq!(
            case_variants("éCOLE"),
            Some(("ÉCOLE".to_string(), "éCOLE".to_string()))
        );
        assert_eq!(case_variants(""), None);
    }

    #[test]
    fn endpoints_follow_kind() {
        assert_eq!(QueryKind::AuthorInfo.endpoint(), Endpoint::Dbpedia);
        assert_eq!(QueryKind::GemetLabel.endpoint(), Endpoint::Gemet);
        assert_eq!(QueryKind::ListSubjects.endpoint(), Endpoint::Europeana);
    }
}
