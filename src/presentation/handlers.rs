// HTTP request handlers
use crate::domain::annotation::{Annotation, Dashboard};
use crate::domain::query::{LookupKind, QueryOptions, QueryTarget, RawTimeRange};
use crate::domain::series::QueryResponse;
use crate::application::datasource::FindResult;
use crate::error::DatasourceError;
use crate::infrastructure::alert_log::Alert;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SuggestRequest {
    #[serde(default)]
    pub query: String,
    #[serde(rename = "type")]
    pub kind: LookupKind,
    #[serde(default)]
    pub target: QueryTarget,
}

#[derive(Deserialize)]
pub struct LookupRequest {
    #[serde(rename = "type")]
    pub kind: LookupKind,
    #[serde(default)]
    pub target: QueryTarget,
}

#[derive(Deserialize)]
pub struct FindParams {
    pub query: String,
}

#[derive(Deserialize)]
pub struct AnnotationsRequest {
    pub range: RawTimeRange,
    pub dashboard: Dashboard,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(options): Json<QueryOptions>,
) -> Result<Json<QueryResponse>, DatasourceError> {
    let response = state.datasource.query(&options).await?;
    Ok(Json(response))
}

pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<Vec<String>>, DatasourceError> {
    let found = state
        .datasource
        .perform_suggest_query(&request.query, request.kind, &request.target)
        .await?;
    Ok(Json(found))
}

pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LookupRequest>,
) -> Result<Json<Vec<String>>, DatasourceError> {
    let found = state
        .datasource
        .perform_search_lookup(request.kind, &request.target)
        .await?;
    Ok(Json(found))
}

pub async fn find(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FindParams>,
) -> Result<Json<Vec<FindResult>>, DatasourceError> {
    let found = state.datasource.metric_find_query(&params.query).await?;
    Ok(Json(found))
}

/// `null` when the dashboard has annotations switched off
pub async fn annotations(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnnotationsRequest>,
) -> Json<Option<Vec<Annotation>>> {
    let list = state
        .annotations
        .get_annotations(&request.range, &request.dashboard)
        .await;
    Json(list.map(|l| l.as_ref().clone()))
}

pub async fn refresh_annotations(State(state): State<Arc<AppState>>) -> StatusCode {
    state.annotations.clear_cache();
    StatusCode::NO_CONTENT
}

pub async fn recent_alerts(State(state): State<Arc<AppState>>) -> Json<Vec<Alert>> {
    Json(state.alerts.recent())
}
