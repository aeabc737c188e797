use std::fmt;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use sparesults::QueryResultsParseError;
use tracing::{debug, warn};

use crate::error::CommonError;
use crate::query::{build_query, QueryKind};
use crate::results::SparqlResults;

pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// The three knowledge graphs queried by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Europeana,
    Dbpedia,
    Gemet,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Endpoint::Europeana => "europeana",
            Endpoint::Dbpedia => "dbpedia",
            Endpoint::Gemet => "gemet",
        })
    }
}

/// Base URIs of the SPARQL endpoints. Fixed after startup.
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub europeana: String,
    pub dbpedia: String,
    pub gemet: String,
}

impl Endpoints {
    pub fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Europeana => &self.europeana,
            Endpoint::Dbpedia => &self.dbpedia,
            Endpoint::Gemet => &self.gemet,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            europeana: "http://sparql.europeana.eu/".to_string(),
            dbpedia: "https://dbpedia.org/sparql".to_string(),
            gemet: "https://www.eionet.europa.eu/gemet/sparql".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SparqlClientConfig {
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl Default for SparqlClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            timeout: Duration::from_secs(20),
            max_retries: 1,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_millis(2_000),
            max_error_body_bytes: 8 * 1024,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SparqlError {
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),

    #[error("{endpoint} endpoint timed out: {source}")]
    Timeout {
        endpoint: Endpoint,
        source: reqwest::Error,
    },

    #[error("{endpoint} endpoint unreachable: {source}")]
    Unreachable {
        endpoint: Endpoint,
        source: reqwest::Error,
    },

    #[error("{endpoint} endpoint returned error: status={status} body={body}")]
    Upstream {
        endpoint: Endpoint,
        status: StatusCode,
        body: String,
    },

    #[error("{endpoint} endpoint returned malformed results: {source}")]
    Malformed {
        endpoint: Endpoint,
        source: QueryResultsParseError,
    },

    #[error("{endpoint} endpoint answered a SELECT query with a boolean")]
    NotSolutions { endpoint: Endpoint },
}

impl SparqlError {
    fn from_transport(endpoint: Endpoint, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            SparqlError::Timeout { endpoint, source }
        } else {
            SparqlError::Unreachable { endpoint, source }
        }
    }

    /// Failures another attempt may cure: timeouts, refused connections, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            SparqlError::Timeout { .. } => true,
            SparqlError::Unreachable { source, .. } => source.is_connect(),
            SparqlError::Upstream { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}

/// SPARQL 1.1 protocol client: GET with a `query` parameter, JSON results.
#[derive(Clone)]
pub struct SparqlClient {
    config: SparqlClientConfig,
    http: reqwest::Client,
}

impl SparqlClient {
    pub fn new(config: SparqlClientConfig) -> Result<Self, SparqlError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("wiss/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SparqlError::Client)?;
        Ok(Self { config, http })
    }

    /// Build `kind` from `args` and run it against the kind's endpoint.
    ///
    /// The result head must declare every variable of the kind's projection.
    pub async fn run(&self, kind: QueryKind, args: &[&str]) -> Result<SparqlResults, CommonError> {
        let query = build_query(kind, args)?;
        debug!(query_kind = %kind, "running sparql query");
        let results = self.select(kind.endpoint(), &query).await?;
        results.require_variables(kind.projection())?;
        debug!(query_kind = %kind, rows = results.rows.len(), "sparql query returned");
        Ok(results)
    }

    /// Send `query` to `endpoint`, retrying transient failures up to `max_retries` times.
    pub async fn select(
        &self,
        endpoint: Endpoint,
        query: &str,
    ) -> Result<SparqlResults, SparqlError> {
        let mut retries = 0;
        loop {
            let err = match self.select_once(endpoint, query).await {
                Ok(results) => return Ok(results),
                Err(e) => e,
            };
            retries += 1;
            let Some(delay) = self.retry_delay(&err, retries) else {
                return Err(err);
            };
            warn!(
                %endpoint,
                retry = retries,
                delay_ms = delay.as_millis(),
                error = %err,
                "sparql request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn select_once(
        &self,
        endpoint: Endpoint,
        query: &str,
    ) -> Result<SparqlResults, SparqlError> {
        let resp = self
            .http
            .get(self.config.endpoints.url(endpoint))
            .query(&[("query", query)])
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| SparqlError::from_transport(endpoint, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_excerpt(resp, self.config.max_error_body_bytes).await;
            return Err(SparqlError::Upstream {
                endpoint,
                status,
                body,
            });
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| SparqlError::from_transport(endpoint, e))?;
        SparqlResults::from_json(&body)
            .map_err(|source| SparqlError::Malformed { endpoint, source })?
            .ok_or(SparqlError::NotSolutions { endpoint })
    }

    /// Wait before retry number `retry` (1-based), doubling from `initial_backoff` up to
    /// `max_backoff`. `None` once retries are exhausted or `err` is not transient.
    fn retry_delay(&self, err: &SparqlError, retry: u32) -> Option<Duration> {
        if retry > self.config.max_retries || !err.is_transient() {
            return None;
        }
        let factor = 1u32 << (retry - 1).min(16);
        Some(
            self.config
                .initial_backoff
                .saturating_mul(factor)
                .min(self.config.max_backoff),
        )
    }
}

/// Leading `max_bytes` of an error response, for logs and error messages.
async fn error_excerpt(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(body) => {
            let cut = body.len().min(max_bytes);
            String::from_utf8_lossy(&body[..cut]).trim().to_string()
        }
        Err(e) => format!("<unreadable body: {e}>"),
    }
}
