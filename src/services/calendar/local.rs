use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::CalendarProvider;
use crate::db::{self, queries, Db};
use crate::models::{CalendarEvent, NewEvent};

/// Calendar kept in the application's own SQLite database.
pub struct LocalCalendar {
    db: Db,
    timezone: Tz,
}

impl LocalCalendar {
    pub fn new(db: Db, timezone: Tz) -> Self {
        Self { db, timezone }
    }

    fn to_event(&self, row: queries::EventRow) -> CalendarEvent {
        CalendarEvent {
            id: row.id,
            summary: row.summary,
            description: row.description,
            start: row.start_at.with_timezone(&self.timezone),
            end: row.end_at.with_timezone(&self.timezone),
            attendees: row.attendees,
            video_link: None,
        }
    }
}

#[async_trait]
impl CalendarProvider for LocalCalendar {
    async fn list_events(
        &self,
        min: DateTime<Tz>,
        max: DateTime<Tz>,
    ) -> anyhow::Result<Vec<CalendarEvent>> {
        let rows = {
            let conn = db::lock(&self.db)?;
            queries::list_events_between(&conn, min.with_timezone(&Utc), max.with_timezone(&Utc))?
        };
        Ok(rows.into_iter().map(|row| self.to_event(row)).collect())
    }

    async fn create(&self, event: NewEvent) -> anyhow::Result<String> {
        let row = queries::EventRow {
            id: uuid::Uuid::new_v4().to_string(),
            summary: event.summary,
            description: event.description,
            start_at: event.start.with_timezone(&Utc),
            end_at: event.end.with_timezone(&Utc),
            attendees: event.attendees,
            video_requested: event.video_requested,
            status: "confirmed".to_string(),
        };
        let conn = db::lock(&self.db)?;
        queries::insert_event(&conn, &row, Utc::now())?;
        tracing::info!(event_id = %row.id, start = %row.start_at, "calendar event created");
        Ok(row.id)
    }

    async fn update(&self, id: &str, start: DateTime<Tz>, end: DateTime<Tz>) -> anyhow::Result<bool> {
        let conn = db::lock(&self.db)?;
        queries::update_event_times(
            &conn,
            id,
            start.with_timezone(&Utc),
            end.with_timezone(&Utc),
            Utc::now(),
        )
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let conn = db::lock(&self.db)?;
        queries::cancel_event(&conn, id, Utc::now())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<CalendarEvent>> {
        let row = {
            let conn = db::lock(&self.db)?;
            queries::get_event(&conn, id)?
        };
        Ok(row.map(|row| self.to_event(row)))
    }
}
