use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::services::booking::BookingError;

/// How far back a "just now" request may land and still be booked.
pub const PAST_GRACE_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeClass {
    Future,
    PastButAcceptable,
    TooFarPast,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PastTimeGuard;

impl PastTimeGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, proposed: DateTime<Tz>, now: DateTime<Tz>) -> TimeClass {
        if proposed > now {
            TimeClass::Future
        } else if now - proposed <= Duration::minutes(PAST_GRACE_MINUTES) {
            TimeClass::PastButAcceptable
        } else {
            TimeClass::TooFarPast
        }
    }

    pub fn check(&self, proposed: DateTime<Tz>, now: DateTime<Tz>) -> Result<TimeClass, BookingError> {
        match self.classify(proposed, now) {
            TimeClass::TooFarPast => Err(BookingError::TooFarInPast),
            class => Ok(class),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn now() -> DateTime<Tz> {
        New_York.with_ymd_and_hms(2025, 6, 16, 11, 0, 0).unwrap()
    }

    #[test]
    fn test_classes() {
        let guard = PastTimeGuard::new();
        assert_eq!(guard.classify(now() + Duration::minutes(1), now()), TimeClass::Future);
        assert_eq!(
            guard.classify(now() - Duration::minutes(10), now()),
            TimeClass::PastButAcceptable
        );
        assert_eq!(
            guard.classify(now() - Duration::minutes(20), now()),
            TimeClass::TooFarPast
        );
    }

    #[test]
    fn test_boundaries() {
        let guard = PastTimeGuard::new();
        assert_eq!(guard.classify(now(), now()), TimeClass::PastButAcceptable);
        assert_eq!(
            guard.classify(now() - Duration::minutes(15), now()),
            TimeClass::PastButAcceptable
        );
        assert_eq!(
            guard.classify(now() - Duration::minutes(15) - Duration::seconds(1), now()),
            TimeClass::TooFarPast
        );
    }

    #[test]
    fn test_check_rejects_only_too_far_past() {
        let guard = PastTimeGuard::new();
        assert!(guard.check(now() - Duration::minutes(5), now()).is_ok());
        assert!(matches!(
            guard.check(now() - Duration::hours(1), now()),
            Err(BookingError::TooFarInPast)
        ));
    }
}
