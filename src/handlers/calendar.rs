use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::services::calendar::generate_ics;
use crate::state::AppState;

// GET /calendar/:event_id
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    let event_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let event = match state.calendar.get(event_id).await {
        Ok(Some(event)) => event,
        Ok(None) => return (StatusCode::NOT_FOUND, "Event not found").into_response(),
        Err(e) => {
            tracing::error!(error = %e, event_id, "failed to load event for .ics");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
        }
    };

    let ics = generate_ics(&event, &state.config.owner_name, Utc::now());
    let filename = format!("meeting-{event_id}.ics");

    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response()
}
