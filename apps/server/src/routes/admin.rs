//! Destructive maintenance endpoints, guarded by the admin password.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedCounts {
    pub bills: u64,
    pub products: u64,
}

fn authorize(state: &AppState, payload: Result<Json<PasswordRequest>, JsonRejection>) -> ApiResult<()> {
    let Json(request) = payload?;
    if !state.check_password(&request.password) {
        warn!("Rejected admin request with wrong password");
        return Err(ApiError::unauthorized());
    }
    Ok(())
}

/// `POST /bills/clear`: deletes every bill and restarts numbering.
pub async fn clear_bills(
    State(state): State<AppState>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> ApiResult<Json<ClearedCounts>> {
    authorize(&state, payload)?;
    let bills = state.db.billing().clear_all_bills().await?;
    Ok(Json(ClearedCounts { bills, products: 0 }))
}

/// `POST /reset-database`: deletes every bill and every product.
///
/// Settings, categories and inventory rows stay.
pub async fn reset_database(
    State(state): State<AppState>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> ApiResult<Json<ClearedCounts>> {
    authorize(&state, payload)?;
    let (bills, products) = state.db.catalog().clear_bills_and_products().await?;
    warn!(bills, products, "Database reset");
    Ok(Json(ClearedCounts { bills, products }))
}
