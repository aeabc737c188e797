/// Error types shared by the query builder, the result flattener and the SPARQL client.
///
/// The web crate wraps `CommonError` via `#[from]` and maps each variant onto an HTTP
/// status. The variants mirror the failure taxonomy: caller input, template misuse,
/// endpoint transport failures and malformed upstream responses.
use crate::query::QueryKind;
use crate::sparql::SparqlError;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Flatten(#[from] FlattenError),

    #[error(transparent)]
    Sparql(#[from] SparqlError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("unknown query kind: {0}")]
    UnknownKind(String),

    #[error("query kind {kind} takes {expected} argument(s), got {actual}")]
    SlotCount {
        kind: QueryKind,
        expected: usize,
        actual: usize,
    },

    #[error("not a valid IRI: {iri:?} ({reason})")]
    InvalidIri { iri: String, reason: String },

    #[error("not a valid language tag: {0:?}")]
    InvalidLanguage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlattenError {
    #[error("result row has no binding for ?{0}")]
    MissingBinding(String),

    #[error("result set does not declare ?{0}")]
    MissingVariable(String),
}
