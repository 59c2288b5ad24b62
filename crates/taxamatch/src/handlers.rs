use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use backbone_match::{
    Candidate, MatchEngine, MatchQuery, MatchResult, RankedName, project, ranked, render_notes,
};
use backbone_types::{Classification, MatchType, Rank, TaxonUsage, TaxonomicStatus};

pub const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 5;
pub const MAX_AUTOCOMPLETE_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
}

/// Query or batch-item parameters. Several fields accept two spellings to
/// stay compatible with both the short and the DarwinCore parameter names.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchParams {
    pub usage_key: Option<String>,
    pub name: Option<String>,
    pub scientific_name: Option<String>,
    pub authorship: Option<String>,
    pub scientific_name_authorship: Option<String>,
    pub rank: Option<String>,
    pub taxon_rank: Option<String>,
    pub generic_name: Option<String>,
    pub specific_epithet: Option<String>,
    pub infraspecific_epithet: Option<String>,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    #[serde(rename = "class")]
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub subgenus: Option<String>,
    pub species: Option<String>,
    /// Comma separated usage ids whose subtrees must not match.
    pub exclude: Option<String>,
    pub strict: Option<String>,
    pub verbose: Option<String>,
}

#[derive(Deserialize)]
pub struct AutocompleteParams {
    pub prefix: Option<String>,
    pub limit: Option<usize>,
}

/// The classic flat match response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    usage_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scientific_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    canonical_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rank: Option<Rank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<TaxonomicStatus>,
    synonym: bool,
    match_type: MatchType,
    confidence: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kingdom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phylum: Option<String>,
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    genus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    species: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alternatives: Vec<MatchResponse>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn internal<E: std::fmt::Display>(e: E) -> Self {
        error!(error = %e, "request failed");
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/species/match", get(match_flat))
        .route("/species/match2", get(match2))
        .route("/species/batch", post(batch))
        .route("/species/auto-complete", get(auto_complete))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn match_flat(
    State(state): State<AppState>,
    axum::extract::Query(params): axum::extract::Query<MatchParams>,
) -> Result<Json<MatchResponse>, ApiError> {
    let query = to_query(params);
    let result = run_match(&state.engine, query).await?;
    Ok(Json(flat_response(&result)))
}

async fn match2(
    State(state): State<AppState>,
    axum::extract::Query(params): axum::extract::Query<MatchParams>,
) -> Result<Response, ApiError> {
    let query = to_query(params);
    let result = run_match(&state.engine, query).await?;
    let projected = project(state.engine.index(), &result).map_err(ApiError::internal)?;
    Ok(Json(projected).into_response())
}

/// Runs every batch item independently; one failing item reports its
/// failure inline and does not affect the rest.
async fn batch(
    State(state): State<AppState>,
    Json(items): Json<Vec<MatchParams>>,
) -> Result<Json<Vec<MatchResponse>>, ApiError> {
    let mut handles = Vec::with_capacity(items.len());
    for params in items {
        let engine = Arc::clone(&state.engine);
        handles.push(tokio::task::spawn_blocking(move || {
            engine.match_usage(&to_query(params))
        }));
    }
    let mut responses = Vec::with_capacity(handles.len());
    for handle in handles {
        let response = match handle.await {
            Ok(Ok(result)) => flat_response(&result),
            Ok(Err(e)) => failed_item(e.to_string()),
            Err(e) => failed_item(e.to_string()),
        };
        responses.push(response);
    }
    Ok(Json(responses))
}

async fn auto_complete(
    State(state): State<AppState>,
    axum::extract::Query(params): axum::extract::Query<AutocompleteParams>,
) -> Result<Json<Vec<RankedName>>, ApiError> {
    let Some(prefix) = params.prefix.filter(|p| !p.trim().is_empty()) else {
        return Err(ApiError::bad_request("prefix is required"));
    };
    let limit = params
        .limit
        .unwrap_or(DEFAULT_AUTOCOMPLETE_LIMIT)
        .clamp(1, MAX_AUTOCOMPLETE_LIMIT);
    let engine = Arc::clone(&state.engine);
    let usages = tokio::task::spawn_blocking(move || engine.index().autocomplete(&prefix, limit))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;
    Ok(Json(usages.iter().map(ranked).collect()))
}

/// The engine does blocking index reads, so match requests run off the
/// async workers.
async fn run_match(engine: &Arc<MatchEngine>, query: MatchQuery) -> Result<MatchResult, ApiError> {
    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || engine.match_usage(&query))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)
}

fn to_query(params: MatchParams) -> MatchQuery {
    let rank = first_non_blank(params.rank, params.taxon_rank).and_then(|r| Rank::parse(&r));
    MatchQuery {
        usage_key: non_blank(params.usage_key),
        name: first_non_blank(params.name, params.scientific_name),
        authorship: first_non_blank(params.authorship, params.scientific_name_authorship),
        generic_name: non_blank(params.generic_name),
        specific_epithet: non_blank(params.specific_epithet),
        infraspecific_epithet: non_blank(params.infraspecific_epithet),
        rank,
        classification: Classification {
            kingdom: non_blank(params.kingdom),
            phylum: non_blank(params.phylum),
            class: non_blank(params.class),
            order: non_blank(params.order),
            family: non_blank(params.family),
            genus: non_blank(params.genus),
            subgenus: non_blank(params.subgenus),
            species: non_blank(params.species),
        },
        exclude: parse_exclude(params.exclude.as_deref()),
        strict: parse_bool(params.strict.as_deref()),
        verbose: parse_bool(params.verbose.as_deref()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn first_non_blank(a: Option<String>, b: Option<String>) -> Option<String> {
    non_blank(a).or_else(|| non_blank(b))
}

fn parse_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn parse_exclude(value: Option<&str>) -> HashSet<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn flat_response(result: &MatchResult) -> MatchResponse {
    let mut response = flat_usage(result.usage.as_ref());
    response.match_type = result.match_type;
    response.confidence = result.confidence;
    response.note = render_notes(&result.notes);
    response.alternatives = result.alternatives.iter().map(flat_candidate).collect();
    response
}

fn flat_candidate(candidate: &Candidate) -> MatchResponse {
    let mut response = flat_usage(Some(&candidate.usage));
    response.match_type = candidate.match_type;
    response.confidence = candidate.confidence;
    response.note = render_notes(&candidate.notes);
    response
}

fn flat_usage(usage: Option<&TaxonUsage>) -> MatchResponse {
    MatchResponse {
        usage_key: usage.map(|u| u.id.clone()),
        scientific_name: usage.map(|u| u.scientific_name.clone()),
        canonical_name: usage.map(|u| u.canonical_name.clone()),
        authorship: usage.and_then(|u| u.authorship.clone()),
        rank: usage.and_then(|u| u.rank),
        status: usage.map(|u| u.status),
        synonym: usage.is_some_and(|u| u.status.is_synonym()),
        match_type: MatchType::None,
        confidence: 0,
        note: None,
        kingdom: usage.and_then(|u| u.kingdom.clone()),
        phylum: usage.and_then(|u| u.phylum.clone()),
        class: usage.and_then(|u| u.class.clone()),
        order: usage.and_then(|u| u.order.clone()),
        family: usage.and_then(|u| u.family.clone()),
        genus: usage.and_then(|u| u.genus.clone()),
        species: usage.and_then(|u| u.species.clone()),
        alternatives: Vec::new(),
    }
}

fn failed_item(error: String) -> MatchResponse {
    let mut response = flat_usage(None);
    response.note = Some(error);
    response
}
