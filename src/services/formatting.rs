//! Human-readable rendering of times, durations, slots and events. Output is
//! written so that feeding it back through extraction and resolution lands on
//! the same instant.

use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;

use crate::models::{CalendarEvent, TimeSlot};

/// Slots listed before the rest are summarised as a count.
const SLOT_PREVIEW: usize = 3;
/// Events listed before the rest are summarised as a count.
const EVENT_PREVIEW: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct CalendarFormatter {
    timezone: Tz,
}

impl CalendarFormatter {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// "2 PM", "2:30 PM".
    pub fn format_time(&self, ts: DateTime<Tz>) -> String {
        let local = ts.with_timezone(&self.timezone);
        if local.minute() == 0 {
            local.format("%-I %p").to_string()
        } else {
            local.format("%-I:%M %p").to_string()
        }
    }

    /// "today at 2 PM", "tomorrow at 9 AM", "Friday at 2:30 PM",
    /// "December 25 at 2 PM", "January 3, 2027 at 10 AM".
    pub fn format_datetime(&self, ts: DateTime<Tz>, now: DateTime<Tz>) -> String {
        let local = ts.with_timezone(&self.timezone);
        let today = now.with_timezone(&self.timezone).date_naive();
        let days = (local.date_naive() - today).num_days();
        let time = self.format_time(local);

        match days {
            0 => format!("today at {time}"),
            1 => format!("tomorrow at {time}"),
            -1 => format!("yesterday at {time}"),
            2..=6 => format!("{} at {time}", local.format("%A")),
            _ if local.year() == today.year() => format!("{} at {time}", local.format("%B %-d")),
            _ => format!("{} at {time}", local.format("%B %-d, %Y")),
        }
    }

    pub fn format_duration(&self, minutes: i64) -> String {
        let plural = |n: i64| if n == 1 { "" } else { "s" };
        if minutes < 60 {
            return format!("{minutes} minute{}", plural(minutes));
        }
        let hours = minutes / 60;
        let rest = minutes % 60;
        if rest == 0 {
            format!("{hours} hour{}", plural(hours))
        } else {
            format!("{hours} hour{} and {rest} minute{}", plural(hours), plural(rest))
        }
    }

    pub fn format_slots(&self, slots: &[TimeSlot]) -> String {
        if slots.is_empty() {
            return "No available time slots found.".to_string();
        }
        let rendered: Vec<String> = slots
            .iter()
            .map(|s| format!("{} - {}", self.format_time(s.start()), self.format_time(s.end())))
            .collect();
        if rendered.len() <= SLOT_PREVIEW {
            return rendered.join(", ");
        }
        let remaining = rendered.len() - SLOT_PREVIEW;
        format!(
            "{}, and {remaining} more slot{}",
            rendered[..SLOT_PREVIEW].join(", "),
            if remaining == 1 { "" } else { "s" }
        )
    }

    /// "Consultation with Jane (tomorrow at 2 PM, 1 hour)".
    pub fn format_event(&self, event: &CalendarEvent, now: DateTime<Tz>) -> String {
        format!(
            "{} ({}, {})",
            event.summary,
            self.format_datetime(event.start, now),
            self.format_duration(event.duration_minutes())
        )
    }

    /// Bulleted list with ids, used when the person has to pick one.
    pub fn format_event_choices(&self, events: &[CalendarEvent], now: DateTime<Tz>) -> String {
        events
            .iter()
            .map(|e| format!("• {} [meeting id: {}]", self.format_event(e, now), e.id))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_event_list(&self, events: &[CalendarEvent], now: DateTime<Tz>) -> String {
        let mut lines: Vec<String> = events
            .iter()
            .take(EVENT_PREVIEW)
            .map(|e| format!("• {}", self.format_event(e, now)))
            .collect();
        if events.len() > EVENT_PREVIEW {
            lines.push(format!("• ... and {} more events", events.len() - EVENT_PREVIEW));
        }
        lines.join("\n")
    }
}
