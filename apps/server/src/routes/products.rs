//! Product endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use rebill_core::{NewProduct, Product, ProductUpdate};

use super::{ListQuery, Message};
use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /products`
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Product>>> {
    let Query(query) = query?;
    Ok(Json(state.db.catalog().list_products(query.include_inactive).await?))
}

/// `POST /products`
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let Json(input) = payload?;
    let product = state.db.catalog().create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products/{product_id}`
pub async fn get_one(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.catalog().get_product(&product_id).await?))
}

/// `PUT /products/{product_id}`
pub async fn update(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let Json(update) = payload?;
    Ok(Json(state.db.catalog().update_product(&product_id, update).await?))
}

/// `DELETE /products/{product_id}`, soft or hard per `catalog.delete_mode`.
pub async fn delete(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Message>> {
    let mode = state.config.catalog.delete_mode;
    state.db.catalog().delete_product(&product_id, mode).await?;
    Ok(Message::new(format!("Product {} deleted", product_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::routes::test_support::{product, state};

    #[tokio::test]
    async fn test_create_then_fetch() {
        let state = state().await;
        let (status, Json(created)) = create(State(state.clone()), Ok(Json(product("A1", 25.0, Some("paan")))))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.category.as_deref(), Some("paan"));

        let Json(fetched) = get_one(State(state), Path("A1".to_string())).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_is_409() {
        let state = state().await;
        create(State(state.clone()), Ok(Json(product("A1", 25.0, None))))
            .await
            .unwrap();
        let err = create(State(state), Ok(Json(product("A1", 30.0, None))))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_default_delete_is_soft() {
        let state = state().await;
        create(State(state.clone()), Ok(Json(product("A1", 25.0, None))))
            .await
            .unwrap();
        delete(State(state.clone()), Path("A1".to_string())).await.unwrap();

        let Json(active) = list(State(state.clone()), Ok(Query(ListQuery::default())))
            .await
            .unwrap();
        assert!(active.is_empty());

        let Json(all) = list(State(state), Ok(Query(ListQuery { include_inactive: true })))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);
    }

    #[tokio::test]
    async fn test_missing_product_is_404() {
        let state = state().await;
        let err = get_one(State(state), Path("nope".to_string())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
