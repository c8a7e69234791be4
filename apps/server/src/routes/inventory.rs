//! Inventory endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use rebill_core::{InventoryUpdate, InventoryView, NewInventoryItem};

use super::Message;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AdjustRequest {
    /// Signed change to stock.
    pub delta: f64,
}

/// `GET /inventory`
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<InventoryView>>> {
    Ok(Json(state.db.ledger().list().await?))
}

/// `GET /inventory/low-stock`
pub async fn low_stock(State(state): State<AppState>) -> ApiResult<Json<Vec<InventoryView>>> {
    Ok(Json(state.db.ledger().low_stock().await?))
}

/// `POST /inventory`
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewInventoryItem>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InventoryView>)> {
    let Json(input) = payload?;
    let view = state.db.ledger().create(input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /inventory/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<InventoryView>> {
    Ok(Json(state.db.ledger().get(id).await?))
}

/// `PUT /inventory/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<InventoryUpdate>, JsonRejection>,
) -> ApiResult<Json<InventoryView>> {
    let Json(update) = payload?;
    Ok(Json(state.db.ledger().update(id, update).await?))
}

/// `POST /inventory/{id}/adjust`
pub async fn adjust(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<AdjustRequest>, JsonRejection>,
) -> ApiResult<Json<InventoryView>> {
    let Json(request) = payload?;
    Ok(Json(state.db.ledger().adjust(id, request.delta).await?))
}

/// `DELETE /inventory/{id}`
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Message>> {
    state.db.ledger().delete(id).await?;
    Ok(Message::new(format!("Inventory item {} deleted", id)))
}
