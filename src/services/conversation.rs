use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::{self, queries};
use crate::models::Session;
use crate::services::booking::TurnContext;
use crate::state::AppState;

/// Session expiry follows the same clock as the booking logic.
fn clock_now(state: &AppState) -> DateTime<Utc> {
    state.clock.now().with_timezone(&Utc)
}

/// Runs one chat turn: load (or start) the session, hand the utterance to the
/// booking state machine, persist the result.
pub async fn process_message(
    state: &Arc<AppState>,
    conversation_id: &str,
    message: &str,
) -> anyhow::Result<String> {
    let now = clock_now(state);

    let mut session = {
        let conn = db::lock(&state.db)?;
        queries::get_session(&conn, conversation_id, now)?
    }
    .unwrap_or_else(|| {
        tracing::info!(conversation_id, "starting new conversation");
        Session::new(conversation_id, state.config.max_conversation_history)
    });

    let ctx = TurnContext {
        calendar: state.calendar.as_ref(),
        llm: state.llm.as_ref(),
        clock: state.clock.as_ref(),
    };
    let reply = state.machine.handle_turn(&mut session, message, &ctx).await;

    {
        let conn = db::lock(&state.db)?;
        queries::save_session(&conn, &session, now, state.config.session_timeout_minutes)?;
    }

    tracing::info!(
        conversation_id,
        pending = session.state.pending_operation().as_str(),
        history = session.history.len(),
        "turn complete"
    );

    Ok(reply)
}

/// Drops a conversation's stored state. Returns false if there was none.
pub fn reset(state: &AppState, conversation_id: &str) -> anyhow::Result<bool> {
    let conn = db::lock(&state.db)?;
    let removed = queries::delete_session(&conn, conversation_id)?;
    tracing::info!(conversation_id, removed, "conversation reset");
    Ok(removed)
}

pub fn snapshot(state: &AppState, conversation_id: &str) -> anyhow::Result<Option<Session>> {
    let conn = db::lock(&state.db)?;
    queries::get_session(&conn, conversation_id, clock_now(state))
}

/// Deletes expired conversations. Called periodically from `main`.
pub fn sweep_expired(state: &AppState) -> anyhow::Result<usize> {
    let conn = db::lock(&state.db)?;
    let removed = queries::expire_old_sessions(&conn, clock_now(state))?;
    if removed > 0 {
        tracing::info!(removed, "expired conversations removed");
    }
    Ok(removed)
}
