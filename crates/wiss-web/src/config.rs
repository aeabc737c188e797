use std::net::SocketAddr;
use std::time::Duration;

use wiss_common::sparql::{Endpoints, SparqlClientConfig};

use crate::error::AppError;

const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Application configuration loaded explicitly from environment variables.
///
/// Everything has a default, so an empty environment serves against the public
/// Europeana, DBpedia and GEMET endpoints on `127.0.0.1:5000`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server binds to.
    pub bind: SocketAddr,
    /// Endpoints, timeout and retry policy for outbound SPARQL requests.
    pub sparql: SparqlClientConfig,
    /// Whether GEMET concept subjects get a second lookup for their English label.
    pub gemet_labels: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `WISS_BIND` (default: "127.0.0.1:5000")
    /// - `EUROPEANA_SPARQL_URL`, `DBPEDIA_SPARQL_URL`, `GEMET_SPARQL_URL`
    /// - `SPARQL_TIMEOUT_SECS` (default: 20)
    /// - `SPARQL_MAX_RETRIES` (default: 1)
    /// - `SPARQL_RETRY_INITIAL_MS` (default: 250), `SPARQL_RETRY_MAX_MS` (default: 2000)
    /// - `SPARQL_MAX_ERROR_BODY_BYTES` (default: 8192)
    /// - `GEMET_LABELS` (default: false)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let bind_str = lookup("WISS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_str
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("WISS_BIND={bind_str:?} is invalid: {e}")))?;

        let defaults = SparqlClientConfig::default();
        let endpoint = |key: &str, default: String| -> Result<String, AppError> {
            let url = lookup(key).unwrap_or(default);
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Config(format!(
                    "{key}={url:?} must be an http(s) URL"
                )));
            }
            Ok(url)
        };
        let endpoints = Endpoints {
            europeana: endpoint("EUROPEANA_SPARQL_URL", defaults.endpoints.europeana)?,
            dbpedia: endpoint("DBPEDIA_SPARQL_URL", defaults.endpoints.dbpedia)?,
            gemet: endpoint("GEMET_SPARQL_URL", defaults.endpoints.gemet)?,
        };

        let number = |key: &str| -> Result<Option<u64>, AppError> {
            lookup(key)
                .map(|s| {
                    s.trim().parse::<u64>().map_err(|e| {
                        AppError::Config(format!("{key}={s:?} is not a number: {e}"))
                    })
                })
                .transpose()
        };

        let timeout = number("SPARQL_TIMEOUT_SECS")?
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let max_retries = number("SPARQL_MAX_RETRIES")?
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(defaults.max_retries);
        let initial_backoff = number("SPARQL_RETRY_INITIAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_backoff);
        let max_backoff = number("SPARQL_RETRY_MAX_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_backoff);
        let max_error_body_bytes = number("SPARQL_MAX_ERROR_BODY_BYTES")?
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(defaults.max_error_body_bytes);

        let gemet_labels = lookup("GEMET_LABELS")
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            bind,
            sparql: SparqlClientConfig {
                endpoints,
                timeout,
                max_retries,
                initial_backoff,
                max_backoff,
                max_error_body_bytes,
            },
            gemet_labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, AppError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.sparql.endpoints.dbpedia, "https://dbpedia.org/sparql");
        assert_eq!(config.sparql.timeout, Duration::from_secs(20));
        assert_eq!(config.sparql.max_retries, 1);
        assert!(!config.gemet_labels);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("WISS_BIND", "0.0.0.0:8080"),
            ("GEMET_SPARQL_URL", "http://localhost:3030/gemet"),
            ("SPARQL_TIMEOUT_SECS", "5"),
            ("SPARQL_MAX_RETRIES", "0"),
            ("GEMET_LABELS", "True"),
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.sparql.endpoints.gemet, "http://localhost:3030/gemet");
        assert_eq!(config.sparql.timeout, Duration::from_secs(5));
        assert_eq!(config.sparql.max_retries, 0);
        assert!(config.gemet_labels);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("WISS_BIND", "localhost")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("DBPEDIA_SPARQL_URL", "ftp://dbpedia.org/sparql")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("SPARQL_TIMEOUT_SECS", "soon")]),
            Err(AppError::Config(_))
        ));
    }
}
