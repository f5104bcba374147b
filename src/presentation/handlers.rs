// HTTP request handlers
use crate::application::polygon_registry::{PolygonId, PolygonRecord};
use crate::domain::geometry::{Coordinate, Polygon};
use crate::domain::rule::{Rule, RuleEdit, RuleSet};
use crate::domain::time_window::TimeWindow;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CreatePolygonRequest {
    pub points: Vec<Coordinate>,
}

/// Raw slider values; range and integrality are checked by `TimeWindow::from_hours`.
#[derive(Deserialize)]
pub struct TimeWindowRequest {
    pub start: f64,
    pub end: f64,
}

#[derive(Serialize)]
pub struct SettingsResponse {
    pub time_window: TimeWindow,
    pub label: String,
    pub rules: RuleSet,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all live polygons with their current colors
pub async fn list_polygons(State(state): State<Arc<AppState>>) -> Json<Vec<PolygonRecord>> {
    Json(state.registry.list().await)
}

/// Accept a finished drawing; rejected polygons are never stored
pub async fn create_polygon(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePolygonRequest>,
) -> Response {
    if let Some(bad) = request.points.iter().find(|p| !p.is_valid()) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("invalid coordinate ({}, {})", bad.lat, bad.lng),
        );
    }

    match state.registry.create(Polygon::new(request.points)).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

pub async fn get_polygon(Path(id): Path<u64>, State(state): State<Arc<AppState>>) -> Response {
    match state.registry.get(PolygonId::new(id)).await {
        Some(record) => Json(record).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no polygon {}", id)),
    }
}

pub async fn delete_polygon(Path(id): Path<u64>, State(state): State<Arc<AppState>>) -> Response {
    match state.registry.remove(PolygonId::new(id)).await {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no polygon {}", id)),
    }
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    let settings = state.registry.settings().await;
    Json(SettingsResponse {
        label: settings.time_window.day_label(),
        time_window: settings.time_window,
        rules: settings.rules,
    })
}

/// Change the time window and recolor every polygon in the background
pub async fn put_time_window(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TimeWindowRequest>,
) -> Response {
    let window = match TimeWindow::from_hours(request.start, request.end) {
        Ok(window) => window,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    // Passes are fire-and-forget; the handles are dropped.
    let _ = state.registry.set_time_window(window).await;
    StatusCode::ACCEPTED.into_response()
}

pub async fn put_rules(
    State(state): State<Arc<AppState>>,
    Json(rules): Json<Vec<Rule>>,
) -> StatusCode {
    let _ = state.registry.set_rules(rules).await;
    StatusCode::ACCEPTED
}

/// Append a blank rule, as the editor's "Add Rule" button does
pub async fn add_rule(State(state): State<Arc<AppState>>) -> StatusCode {
    let _ = state.registry.add_default_rule().await;
    StatusCode::ACCEPTED
}

pub async fn update_rule(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
    Json(edit): Json<RuleEdit>,
) -> Response {
    match state.registry.update_rule(index, edit).await {
        Ok(_) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

pub async fn delete_rule(Path(index): Path<usize>, State(state): State<Arc<AppState>>) -> Response {
    match state.registry.remove_rule(index).await {
        Ok(_) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}
