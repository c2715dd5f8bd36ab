use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::CalendarEvent;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if expected_token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/events
#[derive(Deserialize)]
pub struct EventsQuery {
    pub days: Option<i64>,
}

#[derive(Serialize)]
pub struct EventResponse {
    id: String,
    summary: String,
    description: Option<String>,
    start: String,
    end: String,
    attendees: Vec<String>,
    video_link: Option<String>,
}

impl From<CalendarEvent> for EventResponse {
    fn from(e: CalendarEvent) -> Self {
        Self {
            id: e.id,
            summary: e.summary,
            description: e.description,
            start: e.start.to_rfc3339(),
            end: e.end.to_rfc3339(),
            attendees: e.attendees,
            video_link: e.video_link,
        }
    }
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let days = query
        .days
        .unwrap_or(state.config.cancellation_lookahead_days)
        .clamp(1, 365);
    let now = state.clock.now();
    let events = state
        .calendar
        .list_events(now, now + Duration::days(days))
        .await?;

    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

// POST /api/admin/events/:id/cancel
pub async fn cancel_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if !state.calendar.delete(&id).await? {
        return Err(AppError::NotFound(format!("event {id}")));
    }
    tracing::info!(event_id = %id, "event cancelled by admin");
    Ok(Json(serde_json::json!({ "ok": true })))
}
