/// HTTP routes of the search front-end.
///
/// - `GET /`: home page with the search form
/// - `GET /search?q=[&langs=all]`: subject/URI search over Europeana, HTML
/// - `GET /search/author?q=`: search by `dc:creator`, HTML
/// - `GET /a?author=`: DBpedia summary of an author, JSON
/// - `GET /s?obj=`: subjects of a Europeana object, JSON
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use wiss_common::error::CommonError;
use wiss_common::model::{AuthorInfo, SearchResults, SubjectEntry, SubjectKind, SubjectList};
use wiss_common::names::normalize;
use wiss_common::query::{search_plan, QueryKind};
use wiss_common::results::flatten;
use wiss_common::sparql::SparqlClient;

use crate::config::Config;
use crate::error::{AppError, PageError};
use crate::render;

/// Label lookups in flight at once for a single `/s` request.
const GEMET_LOOKUP_CONCURRENCY: usize = 4;

/// Immutable state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sparql: Arc<SparqlClient>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let sparql = SparqlClient::new(config.sparql.clone()).map_err(CommonError::from)?;
        Ok(Self {
            config: Arc::new(config),
            sparql: Arc::new(sparql),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/search/author", get(search_author))
        .route("/a", get(author_info))
        .route("/s", get(list_subjects))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    langs: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorParams {
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubjectParams {
    obj: Option<String>,
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("query parameter '{name}' is required")))
}

async fn home() -> Html<String> {
    Html(render::home_page())
}

async fn health() -> &'static str {
    "ok"
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, PageError> {
    let text = required(params.q.as_deref(), "q")?;
    let all_languages = params.langs.as_deref() == Some("all");
    let (kind, args) = search_plan(text, all_languages);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let results = run_search(&state, kind, &args, text).await?;
    Ok(Html(render::results_page(text, &results)))
}

async fn search_author(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, PageError> {
    let author = required(params.q.as_deref(), "q")?;
    let results = run_search(&state, QueryKind::SearchAuthor, &[author], author).await?;
    Ok(Html(render::results_page(author, &results)))
}

async fn run_search(
    state: &AppState,
    kind: QueryKind,
    args: &[&str],
    text: &str,
) -> Result<SearchResults, AppError> {
    let raw = state.sparql.run(kind, args).await?;
    let results = SearchResults::from_results(&raw)?;
    if results.items.is_empty() {
        return Err(AppError::NotFound(text.to_string()));
    }
    info!(query_kind = %kind, count = %results.count, "search complete");
    Ok(results)
}

async fn author_info(
    State(state): State<AppState>,
    Query(params): Query<AuthorParams>,
) -> Result<Response, AppError> {
    let raw_name = required(params.author.as_deref(), "author")?;
    let name = normalize(raw_name);
    if name.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "author {raw_name:?} is empty after normalization"
        )));
    }

    let results = state.sparql.run(QueryKind::AuthorInfo, &[&name]).await?;
    match AuthorInfo::from_results(&results)? {
        Some(info) => Ok(Json(info).into_response()),
        None => {
            info!(author = %name, "no author info found");
            Ok(StatusCode::OK.into_response())
        }
    }
}

async fn list_subjects(
    State(state): State<AppState>,
    Query(params): Query<SubjectParams>,
) -> Result<Json<SubjectList>, AppError> {
    let obj = required(params.obj.as_deref(), "obj")?;
    let results = state.sparql.run(QueryKind::ListSubjects, &[obj]).await?;
    let subjects: Vec<SubjectEntry> = flatten(&results.rows)?;

    let subjects = futures::stream::iter(subjects)
        .map(|entry| label_subject(&state, entry))
        .buffered(GEMET_LOOKUP_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    Ok(Json(SubjectList { subjects }))
}

async fn label_subject(state: &AppState, entry: SubjectEntry) -> SubjectEntry {
    match entry.kind {
        SubjectKind::Plain => entry,
        SubjectKind::GemetConcept if !state.config.gemet_labels => {
            debug!(uri = %entry.uri, "gemet label lookup disabled");
            entry
        }
        SubjectKind::GemetConcept => match gemet_label(state, &entry.uri).await {
            Ok(Some(label)) => entry.with_gemet_label(&label),
            Ok(None) => {
                warn!(uri = %entry.uri, "gemet concept has no english label");
                entry
            }
            Err(e) => {
                warn!(uri = %entry.uri, error = %e, "gemet label lookup failed");
                entry
            }
        },
    }
}

async fn gemet_label(state: &AppState, uri: &str) -> Result<Option<String>, CommonError> {
    let results = state.sparql.run(QueryKind::GemetLabel, &[uri]).await?;
    let label = results
        .rows
        .first()
        .map(|row| row.get("label").map(str::to_string))
        .transpose()?;
    Ok(label)
}
