//! Handlers for `/api/Games`.

use axum::extract::State;
use axum::http::StatusCode;

use domains::Game;
use services::dto::{GameDto, GameFilterDto, GameUploadDto, UserGameDto};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

type ApiResult<T> = Result<ApiJson<T>, ApiError>;

pub async fn list_games(State(state): State<AppState>) -> ApiResult<Vec<GameDto>> {
    Ok(ApiJson(state.games.list_games().await?))
}

pub async fn spotlights(State(state): State<AppState>) -> ApiResult<Vec<GameDto>> {
    Ok(ApiJson(state.games.spotlights().await?))
}

/// Always answers with a list, empty when the game does not exist.
pub async fn get_game(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Vec<GameDto>> {
    Ok(ApiJson(state.games.get_game(id).await?))
}

pub async fn replace_game(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(game): ApiJson<Game>,
) -> Result<StatusCode, ApiError> {
    state.games.replace_game(id, game).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_game(
    State(state): State<AppState>,
    ApiJson(upload): ApiJson<GameUploadDto>,
) -> ApiResult<i32> {
    Ok(ApiJson(state.games.create_game(upload).await?))
}

pub async fn filter_games(
    State(state): State<AppState>,
    ApiJson(criteria): ApiJson<GameFilterDto>,
) -> ApiResult<Vec<GameDto>> {
    Ok(ApiJson(state.games.filter_games(&criteria).await?))
}

pub async fn delete_game(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Game> {
    Ok(ApiJson(state.games.delete_game(id).await?))
}

pub async fn owned_games(
    State(state): State<AppState>,
    ApiJson(user): ApiJson<UserGameDto>,
) -> ApiResult<Vec<GameDto>> {
    Ok(ApiJson(state.games.owned_games(user.user_id).await?))
}

pub async fn uploaded_games(
    State(state): State<AppState>,
    ApiJson(user): ApiJson<UserGameDto>,
) -> ApiResult<Vec<GameDto>> {
    Ok(ApiJson(state.games.uploaded_games(user.user_id).await?))
}
