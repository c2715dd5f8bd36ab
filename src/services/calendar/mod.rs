pub mod ics;
pub mod local;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;

use crate::models::{BusyInterval, CalendarEvent, NewEvent};

pub use ics::generate_ics;
pub use local::LocalCalendar;

/// The owner's calendar. Each call is a single request/response; failures
/// surface as errors and are turned into a retry-later reply upstream.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Events overlapping `[min, max)`, earliest first.
    async fn list_events(
        &self,
        min: DateTime<Tz>,
        max: DateTime<Tz>,
    ) -> anyhow::Result<Vec<CalendarEvent>>;

    async fn list_busy(
        &self,
        min: DateTime<Tz>,
        max: DateTime<Tz>,
    ) -> anyhow::Result<Vec<BusyInterval>> {
        let events = self.list_events(min, max).await?;
        Ok(events.iter().map(CalendarEvent::busy_interval).collect())
    }

    /// Returns the new event's id.
    async fn create(&self, event: NewEvent) -> anyhow::Result<String>;

    async fn update(&self, id: &str, start: DateTime<Tz>, end: DateTime<Tz>) -> anyhow::Result<bool>;

    async fn delete(&self, id: &str) -> anyhow::Result<bool>;

    async fn get(&self, id: &str) -> anyhow::Result<Option<CalendarEvent>>;
}
