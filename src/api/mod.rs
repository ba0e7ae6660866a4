//! REST API over the insight store
//!
//! Endpoints, relative to the configured prefix (default `/api`):
//! - GET    /                 - API root
//! - GET    /insights/        - list, filtered by query parameters
//! - POST   /insights/        - create
//! - GET    /insights/{id}/   - retrieve
//! - PUT    /insights/{id}/   - replace
//! - PATCH  /insights/{id}/   - partial update
//! - DELETE /insights/{id}/   - delete
//!
//! Every route is also served without the trailing slash.

mod error;
mod input;

pub use error::ApiError;
pub use input::{apply_body, WriteMode};

use crate::commands::{cmd_delete, cmd_list, cmd_show};
use crate::error::Error;
use crate::filter::FilterParams;
use crate::models::{Insight, NewInsight};
use crate::store::InsightStore;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: InsightStore,
    /// Prefix without a trailing slash; empty when mounted at `/`
    base: Arc<str>,
}

impl AppState {
    pub fn new(store: InsightStore, api_prefix: &str) -> Self {
        Self {
            store,
            base: Arc::from(api_prefix.trim_end_matches('/')),
        }
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the axum router for the API
pub fn router(state: AppState) -> Router {
    let base = state.base.to_string();

    let mut app = Router::new()
        .route(&format!("{base}/"), get(api_root))
        .route(
            &format!("{base}/insights"),
            get(list_insights).post(create_insight),
        )
        .route(
            &format!("{base}/insights/"),
            get(list_insights).post(create_insight),
        )
        .route(
            &format!("{base}/insights/{{id}}"),
            get(retrieve_insight)
                .put(replace_insight)
                .patch(patch_insight)
                .delete(destroy_insight),
        )
        .route(
            &format!("{base}/insights/{{id}}/"),
            get(retrieve_insight)
                .put(replace_insight)
                .patch(patch_insight)
                .delete(destroy_insight),
        );

    if !base.is_empty() {
        app = app.route(&base, get(api_root));
    }

    app.layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Handled request"
    );
    response
}

async fn api_root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "insights": format!("{}/insights/", state.base) }))
}

async fn list_insights(
    State(state): State<AppState>,
    params: std::result::Result<Query<FilterParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Insight>>> {
    let Query(params) =
        params.map_err(|rejection| ApiError(Error::InvalidInput(rejection.body_text())))?;
    let rows = cmd_list(&state.store, params).await?;
    debug!(rows = rows.len(), "Listed insights");
    Ok(Json(rows))
}

async fn create_insight(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Insight>)> {
    let body = request_body(body)?;
    let new = apply_body(NewInsight::default(), &body, WriteMode::Full)?;
    let row = state.store.insert_insight(&new).await?;
    info!(id = row.id, "Created insight");
    Ok((StatusCode::CREATED, Json(row)))
}

async fn retrieve_insight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Insight>> {
    let id = parse_id(&id)?;
    Ok(Json(cmd_show(&state.store, id).await?))
}

async fn replace_insight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Insight>> {
    update(&state, &id, body, WriteMode::Full).await
}

async fn patch_insight(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Insight>> {
    update(&state, &id, body, WriteMode::Partial).await
}

async fn destroy_insight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    cmd_delete(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update(
    state: &AppState,
    id: &str,
    body: std::result::Result<Json<Value>, JsonRejection>,
    mode: WriteMode,
) -> ApiResult<Json<Insight>> {
    let id = parse_id(id)?;
    let existing = cmd_show(&state.store, id).await?;
    let body = request_body(body)?;
    let new = apply_body(existing.to_new(), &body, mode)?;

    let row = state
        .store
        .update_insight(id, &new)
        .await?
        .ok_or(Error::InsightNotFound(id))?;
    info!(id, "Updated insight");
    Ok(Json(row))
}

/// Ids that are not integers can never match a row
fn parse_id(raw: &str) -> crate::error::Result<i64> {
    raw.parse().map_err(|_| Error::InsightNotFound(0))
}

fn request_body(body: std::result::Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError(Error::InvalidInput(rejection.body_text())))
}
