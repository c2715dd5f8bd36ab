use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;

use crate::models::WorkingHoursConfig;
use crate::services::booking::BookingError;

/// Decides whether a proposed start time falls inside the owner's business
/// hours. Saturday and Sunday use the weekend window; both bounds inclusive.
#[derive(Debug, Clone)]
pub struct WorkingHoursPolicy {
    config: WorkingHoursConfig,
    owner_name: String,
}

impl WorkingHoursPolicy {
    pub fn new(config: WorkingHoursConfig, owner_name: impl Into<String>) -> Self {
        Self {
            config,
            owner_name: owner_name.into(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.config.timezone
    }

    /// `(true, None)` inside hours, otherwise `(false, Some(explanation))`.
    pub fn is_within_hours(&self, ts: DateTime<Tz>) -> (bool, Option<String>) {
        let local = ts.with_timezone(&self.config.timezone);
        let (start, end) = self.hours_for(local.date_naive());
        let time = local.time();

        if time >= start && time <= end {
            return (true, None);
        }

        let window = if is_weekend(local.weekday()) {
            "Saturday and Sunday"
        } else {
            "Monday through Friday"
        };
        let message = format!(
            "My apologies for the inconvenience, but {}'s business hours are {} from {} - {} {}",
            self.owner_name,
            window,
            clock(start),
            clock(end),
            local.format("%Z"),
        );
        (false, Some(message))
    }

    pub fn check(&self, ts: DateTime<Tz>) -> Result<(), BookingError> {
        match self.is_within_hours(ts) {
            (true, _) => Ok(()),
            (false, message) => Err(BookingError::OutsideWorkingHours {
                message: message.unwrap_or_default(),
            }),
        }
    }

    pub fn hours_for(&self, date: NaiveDate) -> (NaiveTime, NaiveTime) {
        if is_weekend(date.weekday()) {
            (self.config.weekend_start, self.config.weekend_end)
        } else {
            (self.config.weekday_start, self.config.weekday_end)
        }
    }

    /// Both windows in words, for the assistant's instructions.
    pub fn describe(&self, at: DateTime<Tz>) -> String {
        let zone = at.with_timezone(&self.config.timezone).format("%Z");
        format!(
            "Monday through Friday from {} - {} {zone}, Saturday and Sunday from {} - {} {zone}",
            clock(self.config.weekday_start),
            clock(self.config.weekday_end),
            clock(self.config.weekend_start),
            clock(self.config.weekend_end),
        )
    }
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

fn clock(t: NaiveTime) -> String {
    t.format("%-I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn policy() -> WorkingHoursPolicy {
        WorkingHoursPolicy::new(WorkingHoursConfig::default(), "Alex")
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Tz> {
        // 2025-06-16 is a Monday, 2025-06-21 a Saturday.
        New_York.with_ymd_and_hms(2025, 6, d, h, m, 0).unwrap()
    }

    #[test]
    fn test_weekday_bounds_inclusive() {
        assert!(policy().is_within_hours(at(16, 9, 0)).0);
        assert!(policy().is_within_hours(at(16, 17, 0)).0);
        assert!(policy().is_within_hours(at(16, 13, 30)).0);
    }

    #[test]
    fn test_weekday_outside_hours() {
        let (ok, message) = policy().is_within_hours(at(16, 8, 59));
        assert!(!ok);
        let message = message.unwrap();
        assert!(message.contains("Alex's business hours"));
        assert!(message.contains("Monday through Friday from 9:00 AM - 5:00 PM EDT"));

        assert!(!policy().is_within_hours(at(16, 17, 1)).0);
        assert!(!policy().is_within_hours(at(16, 20, 0)).0);
    }

    #[test]
    fn test_weekend_window() {
        assert!(policy().is_within_hours(at(21, 10, 0)).0);
        assert!(policy().is_within_hours(at(21, 14, 0)).0);
        let (ok, message) = policy().is_within_hours(at(21, 16, 0));
        assert!(!ok);
        assert!(message.unwrap().contains("Saturday and Sunday from 10:00 AM - 2:00 PM"));
    }

    #[test]
    fn test_converts_foreign_zone_first() {
        // 14:00 UTC is 10:00 in New York during DST.
        let utc = chrono_tz::UTC.with_ymd_and_hms(2025, 6, 16, 14, 0, 0).unwrap();
        assert!(policy().is_within_hours(utc).0);
    }

    #[test]
    fn test_check_maps_to_booking_error() {
        assert!(policy().check(at(16, 10, 0)).is_ok());
        match policy().check(at(16, 7, 0)) {
            Err(BookingError::OutsideWorkingHours { message }) => {
                assert!(message.starts_with("My apologies"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_describe() {
        let text = policy().describe(at(16, 10, 0));
        assert_eq!(
            text,
            "Monday through Friday from 9:00 AM - 5:00 PM EDT, Saturday and Sunday from 10:00 AM - 2:00 PM EDT"
        );
    }
}
