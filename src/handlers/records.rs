//! Record CRUD handlers. Handlers translate the untyped HTTP surface into a
//! QuerySpec or record map; all validation against the live schema happens
//! in the service and compiler.

use crate::error::AppError;
use crate::response::{DeleteOutcome, RecordPage};
use crate::sql::{QuerySpec, SortOrder, DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
    /// JSON object, e.g. `filters={"status":"active","deleted_at":null}`.
    filters: Option<String>,
}

fn parse_filters(raw: Option<&str>) -> Result<HashMap<String, Value>, AppError> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(HashMap::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(m)) => Ok(m.into_iter().collect()),
        Ok(_) => Err(AppError::BadRequest("filters must be a JSON object".into())),
        Err(e) => Err(AppError::BadRequest(format!("filters is not valid JSON: {}", e))),
    }
}

fn body_to_map(value: Value) -> Result<HashMap<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<RecordPage>, AppError> {
    let spec = QuerySpec {
        page: params.page.unwrap_or(DEFAULT_PAGE),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        search: params.search,
        sort_by: params.sort_by,
        sort_order: SortOrder::parse(params.sort_order.as_deref()),
        filters: parse_filters(params.filters.as_deref())?,
    };
    Ok(Json(state.service.query(&name, spec).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.service.get_by_id(&name, &id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let record = body_to_map(body)?;
    let row = state.service.insert(&name, &record).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let record = body_to_map(body)?;
    Ok(Json(state.service.update(&name, &id, &record).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Json<DeleteOutcome>, AppError> {
    if !state.service.remove(&name, &id).await? {
        return Err(AppError::RecordNotFound(id));
    }
    Ok(Json(DeleteOutcome {
        message: format!("record '{}' deleted", id),
    }))
}
