use axum::{
    extract::{OriginalUri, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{ApiError, AppError};
use crate::geo::Coordinate;
use crate::ids::normalize_id;
use crate::middleware::CurrentUser;
use crate::models::{NormalizedEvent, ResponseMessage};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/nearby", get(nearby_events))
        .route(
            "/events/favorite",
            get(favorite_events).post(set_favorite).delete(unset_favorite),
        )
        .route("/events/recommend", get(recommend_events))
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteQuery {
    pub event_id: String,
}

pub async fn nearby_events(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    user: CurrentUser,
    Query(params): Query<NearbyQuery>,
) -> Response {
    let coordinate = Coordinate::new(params.lat, params.lon);
    let events = state
        .events
        .search(coordinate, params.keyword.as_deref(), &user.user_id)
        .await;
    events_response(uri.path(), events)
}

pub async fn recommend_events(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    user: CurrentUser,
    Query(params): Query<LocationQuery>,
) -> Response {
    let coordinate = Coordinate::new(params.lat, params.lon);
    let events = state.recommender.recommend(&user.user_id, coordinate).await;
    events_response(uri.path(), events)
}

pub async fn set_favorite(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    user: CurrentUser,
    Query(params): Query<FavoriteQuery>,
) -> Result<Response, ApiError> {
    let event_id = normalize_id(&params.event_id);
    state
        .events
        .set_favorite(&user.user_id, &event_id)
        .await
        .map_err(|error| api_error(error, uri.path()))?;
    Ok(message(StatusCode::OK, "Favorite added", uri.path()))
}

pub async fn unset_favorite(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    user: CurrentUser,
    Query(params): Query<FavoriteQuery>,
) -> Result<Response, ApiError> {
    let event_id = normalize_id(&params.event_id);
    state
        .events
        .unset_favorite(&user.user_id, &event_id)
        .await
        .map_err(|error| api_error(error, uri.path()))?;
    Ok(message(StatusCode::OK, "Favorite removed", uri.path()))
}

pub async fn favorite_events(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    let events = state
        .events
        .favorite_events(&user.user_id)
        .await
        .map_err(|error| api_error(error, uri.path()))?;
    Ok(Json(ResponseMessage::success(uri.path(), events)).into_response())
}

fn events_response(path: &str, events: Vec<NormalizedEvent>) -> Response {
    if events.is_empty() {
        return message(StatusCode::NO_CONTENT, "No nearby events found", path);
    }
    Json(ResponseMessage::success(path, events)).into_response()
}

fn message(status: StatusCode, text: &str, path: &str) -> Response {
    let body: ResponseMessage<()> = ResponseMessage::empty(status, text, path);
    (status, Json(body)).into_response()
}

fn api_error(error: AppError, path: &str) -> ApiError {
    ApiError {
        error,
        path: path.to_string(),
    }
}
