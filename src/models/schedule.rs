use chrono::{DateTime, Duration};
use chrono_tz::Tz;

/// A candidate or booked interval. Always `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn starting_at(start: DateTime<Tz>, duration_minutes: u32) -> Option<Self> {
        Self::new(start, start + Duration::minutes(i64::from(duration_minutes)))
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open overlap: touching intervals do not conflict.
    pub fn overlaps(&self, busy: &BusyInterval) -> bool {
        !(self.end <= busy.start || self.start >= busy.end)
    }
}

/// An existing calendar commitment as seen by slot search and conflict checks.
#[derive(Debug, Clone, PartialEq)]
pub struct BusyInterval {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub source_event_id: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub attendees: Vec<String>,
    pub video_link: Option<String>,
}

impl CalendarEvent {
    pub fn busy_interval(&self) -> BusyInterval {
        BusyInterval {
            start: self.start,
            end: self.end,
            source_event_id: self.id.clone(),
            summary: self.summary.clone(),
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether this event belongs to the person with the given name, email or
    /// phone. Matching is on the title, the description and the attendees.
    pub fn involves(&self, name: Option<&str>, email: Option<&str>, phone: Option<&str>) -> bool {
        let summary = self.summary.to_lowercase();
        let description = self.description.as_deref().unwrap_or("").to_lowercase();

        let name_match = name
            .map(|n| n.to_lowercase())
            .filter(|n| !n.is_empty())
            .is_some_and(|n| summary.contains(&n) || description.contains(&n));
        let email_match = email.is_some_and(|e| {
            self.attendees.iter().any(|a| a.eq_ignore_ascii_case(e))
                || description.contains(&e.to_lowercase())
        });
        let phone_match = phone
            .filter(|p| !p.is_empty())
            .is_some_and(|p| description.contains(p));

        name_match || email_match || phone_match
    }
}

/// What the state machine asks the calendar to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub summary: String,
    pub description: Option<String>,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub attendees: Vec<String>,
    pub video_requested: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn at(h: u32, m: u32) -> DateTime<Tz> {
        New_York.with_ymd_and_hms(2025, 6, 16, h, m, 0).unwrap()
    }

    fn busy(start: DateTime<Tz>, end: DateTime<Tz>) -> BusyInterval {
        BusyInterval {
            start,
            end,
            source_event_id: "evt".to_string(),
            summary: "Busy".to_string(),
        }
    }

    #[test]
    fn test_slot_rejects_inverted_range() {
        assert!(TimeSlot::new(at(10, 0), at(9, 0)).is_none());
        assert!(TimeSlot::new(at(10, 0), at(10, 0)).is_none());
        assert!(TimeSlot::starting_at(at(10, 0), 0).is_none());
    }

    #[test]
    fn test_overlap_is_half_open() {
        let slot = TimeSlot::starting_at(at(10, 0), 60).unwrap();
        assert!(slot.overlaps(&busy(at(10, 30), at(11, 30))));
        assert!(slot.overlaps(&busy(at(9, 0), at(12, 0))));
        assert!(!slot.overlaps(&busy(at(11, 0), at(12, 0))));
        assert!(!slot.overlaps(&busy(at(9, 0), at(10, 0))));
    }

    #[test]
    fn test_event_involves_matches_name_and_attendees() {
        let event = CalendarEvent {
            id: "1".to_string(),
            summary: "Consultation with Jane Doe".to_string(),
            description: Some("Phone: 6308805488".to_string()),
            start: at(10, 0),
            end: at(11, 0),
            attendees: vec!["jane@example.com".to_string()],
            video_link: None,
        };
        assert!(event.involves(Some("jane doe"), None, None));
        assert!(event.involves(None, Some("JANE@example.com"), None));
        assert!(event.involves(None, None, Some("6308805488")));
        assert!(!event.involves(Some("John Smith"), None, None));
    }
}
