//! Handlers for `/api/Purchases`. Records travel raw, without DTO mapping.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use domains::Purchase;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

pub async fn list_purchases(
    State(state): State<AppState>,
) -> Result<ApiJson<Vec<Purchase>>, ApiError> {
    Ok(ApiJson(state.purchases.list_purchases().await?))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<ApiJson<Purchase>, ApiError> {
    Ok(ApiJson(state.purchases.get_purchase(id).await?))
}

pub async fn replace_purchase(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(purchase): ApiJson<Purchase>,
) -> Result<StatusCode, ApiError> {
    state.purchases.replace_purchase(id, purchase).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `201 Created` with a `Location` pointing at the new purchase.
pub async fn create_purchase(
    State(state): State<AppState>,
    ApiJson(purchase): ApiJson<Purchase>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.purchases.create_purchase(purchase).await?;
    let location = format!("/api/Purchases/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        ApiJson(created),
    ))
}

pub async fn delete_purchase(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<ApiJson<Purchase>, ApiError> {
    Ok(ApiJson(state.purchases.delete_purchase(id).await?))
}
