use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::Session;

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn ts(dt: DateTime<Utc>) -> String {
    dt.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

// ── Conversations ──

/// Loads a live session. Expired rows are treated as absent.
pub fn get_session(conn: &Connection, id: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Session>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT session FROM conversations WHERE id = ?1 AND expires_at > ?2",
            params![id, ts(now)],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        None => Ok(None),
        Some(json) => match serde_json::from_str(&json) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(conversation_id = %id, error = %e, "discarding unreadable session");
                Ok(None)
            }
        },
    }
}

/// Upserts a session and pushes its expiry `timeout_minutes` past `now`.
pub fn save_session(
    conn: &Connection,
    session: &Session,
    now: DateTime<Utc>,
    timeout_minutes: i64,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(session)?;
    let expires_at = now + Duration::minutes(timeout_minutes);

    conn.execute(
        "INSERT INTO conversations (id, session, pending_operation, last_activity, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
           session = excluded.session,
           pending_operation = excluded.pending_operation,
           last_activity = excluded.last_activity,
           expires_at = excluded.expires_at",
        params![
            session.conversation_id,
            json,
            session.state.pending_operation().as_str(),
            ts(now),
            ts(expires_at),
        ],
    )?;
    Ok(())
}

pub fn delete_session(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn expire_old_sessions(conn: &Connection, now: DateTime<Utc>) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM conversations WHERE expires_at <= ?1",
        params![ts(now)],
    )?;
    Ok(count)
}

// ── Events ──

#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub attendees: Vec<String>,
    pub video_requested: bool,
    pub status: String,
}

const EVENT_COLUMNS: &str =
    "id, summary, description, start_at, end_at, attendees, video_requested, status";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    let start: String = row.get(3)?;
    let end: String = row.get(4)?;
    let attendees: String = row.get(5)?;
    Ok(EventRow {
        id: row.get(0)?,
        summary: row.get(1)?,
        description: row.get(2)?,
        start_at: parse_ts(&start)?,
        end_at: parse_ts(&end)?,
        attendees: serde_json::from_str(&attendees).unwrap_or_default(),
        video_requested: row.get(6)?,
        status: row.get(7)?,
    })
}

pub fn insert_event(conn: &Connection, event: &EventRow, now: DateTime<Utc>) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO events (id, summary, description, start_at, end_at, attendees, video_requested, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            event.id,
            event.summary,
            event.description,
            ts(event.start_at),
            ts(event.end_at),
            serde_json::to_string(&event.attendees)?,
            event.video_requested,
            event.status,
            ts(now),
        ],
    )?;
    Ok(())
}

pub fn get_event(conn: &Connection, id: &str) -> anyhow::Result<Option<EventRow>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1 AND status = 'confirmed'");
    let event = conn.query_row(&sql, params![id], event_from_row).optional()?;
    Ok(event)
}

/// Confirmed events that overlap `[min, max)`, earliest first.
pub fn list_events_between(
    conn: &Connection,
    min: DateTime<Utc>,
    max: DateTime<Utc>,
) -> anyhow::Result<Vec<EventRow>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE status = 'confirmed' AND start_at < ?2 AND end_at > ?1
         ORDER BY start_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![ts(min), ts(max)], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_event_times(
    conn: &Connection,
    id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE events SET start_at = ?2, end_at = ?3, updated_at = ?4
         WHERE id = ?1 AND status = 'confirmed'",
        params![id, ts(start), ts(end), ts(now)],
    )?;
    Ok(count > 0)
}

/// Marks an event cancelled. Returns false when it was unknown or already
/// cancelled.
pub fn cancel_event(conn: &Connection, id: &str, now: DateTime<Utc>) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE events SET status = 'cancelled', updated_at = ?2
         WHERE id = ?1 AND status = 'confirmed'",
        params![id, ts(now)],
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use chrono::TimeZone;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, h, m, 0).unwrap()
    }

    fn event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> EventRow {
        EventRow {
            id: id.to_string(),
            summary: format!("Meeting {id}"),
            description: None,
            start_at: start,
            end_at: end,
            attendees: vec!["jane@example.com".to_string()],
            video_requested: true,
            status: "confirmed".to_string(),
        }
    }

    #[test]
    fn test_session_round_trip_and_expiry() {
        let conn = conn();
        let mut session = Session::new("abc", 20);
        session.profile.name = Some("Jane".to_string());

        save_session(&conn, &session, utc(10, 0), 30).unwrap();
        let loaded = get_session(&conn, "abc", utc(10, 29)).unwrap().unwrap();
        assert_eq!(loaded, session);

        assert!(get_session(&conn, "abc", utc(10, 30)).unwrap().is_none());
        assert_eq!(expire_old_sessions(&conn, utc(11, 0)).unwrap(), 1);
    }

    #[test]
    fn test_save_session_slides_expiry() {
        let conn = conn();
        let session = Session::new("abc", 20);
        save_session(&conn, &session, utc(10, 0), 30).unwrap();
        save_session(&conn, &session, utc(10, 20), 30).unwrap();
        assert!(get_session(&conn, "abc", utc(10, 45)).unwrap().is_some());
        assert!(delete_session(&conn, "abc").unwrap());
        assert!(get_session(&conn, "abc", utc(10, 45)).unwrap().is_none());
    }

    #[test]
    fn test_event_range_query_uses_overlap() {
        let conn = conn();
        insert_event(&conn, &event("a", utc(9, 0), utc(10, 0)), utc(8, 0)).unwrap();
        insert_event(&conn, &event("b", utc(10, 0), utc(11, 0)), utc(8, 0)).unwrap();
        insert_event(&conn, &event("c", utc(13, 0), utc(14, 0)), utc(8, 0)).unwrap();

        let ids: Vec<String> = list_events_between(&conn, utc(9, 30), utc(13, 0))
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_cancel_hides_event() {
        let conn = conn();
        insert_event(&conn, &event("a", utc(9, 0), utc(10, 0)), utc(8, 0)).unwrap();
        assert!(get_event(&conn, "a").unwrap().is_some());
        assert!(cancel_event(&conn, "a", utc(8, 30)).unwrap());
        assert!(!cancel_event(&conn, "a", utc(8, 30)).unwrap());
        assert!(get_event(&conn, "a").unwrap().is_none());
        assert!(list_events_between(&conn, utc(0, 0), utc(23, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_update_event_times() {
        let conn = conn();
        insert_event(&conn, &event("a", utc(9, 0), utc(10, 0)), utc(8, 0)).unwrap();
        assert!(update_event_times(&conn, "a", utc(15, 0), utc(16, 0), utc(8, 30)).unwrap());
        let moved = get_event(&conn, "a").unwrap().unwrap();
        assert_eq!(moved.start_at, utc(15, 0));
        assert_eq!(moved.attendees, vec!["jane@example.com"]);
        assert!(!update_event_times(&conn, "missing", utc(15, 0), utc(16, 0), utc(8, 30)).unwrap());
    }
}
