use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::models::{BusyInterval, TimeSlot};

/// Minimum lead time before a slot can be offered.
pub const BOOKING_BUFFER_MINUTES: i64 = 10;

/// Walks a day's business window in fixed steps and keeps the candidates that
/// are far enough in the future and clear of every busy interval.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityEngine {
    interval_minutes: u32,
}

impl AvailabilityEngine {
    pub fn new(interval_minutes: u32) -> Self {
        Self {
            interval_minutes: interval_minutes.max(1),
        }
    }

    /// Free slots of `duration_minutes` on `date` between `window_start` and
    /// `window_end`, in chronological order.
    pub fn available_slots(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
        busy: &[BusyInterval],
        window_start: NaiveTime,
        window_end: NaiveTime,
        now: DateTime<Tz>,
    ) -> Vec<TimeSlot> {
        let tz = now.timezone();
        let (Some(first), Some(last)) = (
            tz.from_local_datetime(&date.and_time(window_start)).earliest(),
            tz.from_local_datetime(&date.and_time(window_end)).earliest(),
        ) else {
            return Vec::new();
        };
        let earliest_start = now + Duration::minutes(BOOKING_BUFFER_MINUTES);
        let step = Duration::minutes(i64::from(self.interval_minutes));

        let mut slots = Vec::new();
        let mut cursor = first;
        while let Some(candidate) = TimeSlot::starting_at(cursor, duration_minutes) {
            if candidate.end() > last {
                break;
            }
            if candidate.start() > earliest_start
                && !busy.iter().any(|b| candidate.overlaps(b))
            {
                slots.push(candidate);
            }
            cursor = cursor + step;
        }
        slots
    }
}
