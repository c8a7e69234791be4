//! Category endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use rebill_core::{Category, CategoryDeletion, CategoryUpdate, CategoryUsage, NewCategory};

use super::ListQuery;
use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /categories`
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Category>>> {
    let Query(query) = query?;
    Ok(Json(state.db.catalog().list_categories(query.include_inactive).await?))
}

/// `POST /categories`
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let Json(input) = payload?;
    let category = state.db.catalog().create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `GET /categories/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Category>> {
    Ok(Json(state.db.catalog().get_category(id).await?))
}

/// `PUT /categories/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<CategoryUpdate>, JsonRejection>,
) -> ApiResult<Json<Category>> {
    let Json(update) = payload?;
    Ok(Json(state.db.catalog().update_category(id, update).await?))
}

/// `DELETE /categories/{id}`: removes unused categories, deactivates used ones.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CategoryDeletion>> {
    Ok(Json(state.db.catalog().delete_category(id).await?))
}

/// `GET /categories/{id}/usage`
pub async fn usage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CategoryUsage>> {
    Ok(Json(state.db.catalog().is_category_used(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{product, state};

    #[tokio::test]
    async fn test_delete_reports_what_happened() {
        let state = state().await;
        let (_, Json(snacks)) = create(
            State(state.clone()),
            Ok(Json(NewCategory {
                name: "snacks".to_string(),
                description: None,
            })),
        )
        .await
        .unwrap();
        let (_, Json(sweets)) = create(
            State(state.clone()),
            Ok(Json(NewCategory {
                name: "sweets".to_string(),
                description: None,
            })),
        )
        .await
        .unwrap();
        state
            .db
            .catalog()
            .create_product(product("S1", 20.0, Some("sweets")))
            .await
            .unwrap();

        let Json(removed) = delete(State(state.clone()), Path(snacks.id)).await.unwrap();
        assert_eq!(removed, CategoryDeletion::Removed);

        let Json(used) = usage(State(state.clone()), Path(sweets.id)).await.unwrap();
        assert!(used.used);
        let Json(outcome) = delete(State(state.clone()), Path(sweets.id)).await.unwrap();
        assert!(matches!(outcome, CategoryDeletion::Deactivated { .. }));

        let err = get_one(State(state), Path(snacks.id)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
