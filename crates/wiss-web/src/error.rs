use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};
use wiss_common::error::{CommonError, FlattenError, QueryError};
use wiss_common::sparql::SparqlError;

use crate::render;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no results for {0:?}")]
    NotFound(String),
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        AppError::Common(e.into())
    }
}

impl From<FlattenError> for AppError {
    fn from(e: FlattenError) -> Self {
        AppError::Common(e.into())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Common(e) => match e {
                CommonError::Query(QueryError::InvalidIri { .. }) => StatusCode::BAD_REQUEST,
                CommonError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CommonError::Flatten(_) => StatusCode::BAD_GATEWAY,
                CommonError::Sparql(SparqlError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
                CommonError::Sparql(SparqlError::Client(_)) => StatusCode::INTERNAL_SERVER_ERROR,
                CommonError::Sparql(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Config(_) => "internal",
            AppError::Common(e) => match e {
                CommonError::Query(QueryError::InvalidIri { .. }) => "invalid_input",
                CommonError::Query(_) => "internal",
                CommonError::Flatten(_) => "malformed_response",
                CommonError::Sparql(SparqlError::Timeout { .. }) => "endpoint_timeout",
                CommonError::Sparql(SparqlError::Unreachable { .. }) => "endpoint_unreachable",
                CommonError::Sparql(SparqlError::Upstream { .. }) => "upstream_error",
                CommonError::Sparql(
                    SparqlError::Malformed { .. } | SparqlError::NotSolutions { .. },
                ) => "malformed_response",
                CommonError::Sparql(SparqlError::Client(_)) => "internal",
            },
        }
    }

    fn log(&self) {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(kind = self.kind(), status = status.as_u16(), error = %self, "request rejected");
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

/// JSON error object for the `/a` and `/s` routes.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// HTML rendering of an [`AppError`] for the page routes.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(e: AppError) -> Self {
        PageError(e)
    }
}

impl From<CommonError> for PageError {
    fn from(e: CommonError) -> Self {
        PageError(e.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let err = self.0;
        err.log();
        let page = match &err {
            AppError::NotFound(query) => render::not_found_page(query),
            other => render::error_page(other.status(), &other.to_string()),
        };
        (err.status(), Html(page)).into_response()
    }
}
