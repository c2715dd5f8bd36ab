//! Turns the loose date and time tokens produced by extraction into concrete
//! timestamps in the owner's time zone.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Weekday,
};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("time pattern should compile - this is a bug")
}

static IN_N_UNITS: Lazy<Regex> = Lazy::new(|| compile(r"^in (\d+) (day|week|month)s?$"));
static WEEKDAY: Lazy<Regex> = Lazy::new(|| compile(r"^(?:(next|this|coming) )?([a-z]+)$"));
static MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    compile(r"^([a-z]{3,9})\.? (\d{1,2})(?:st|nd|rd|th)?(?:,? (\d{4}))?$")
});
static DAY_MONTH: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(\d{1,2})(?:st|nd|rd|th)? (?:of )?([a-z]{3,9})(?:,? (\d{4}))?$")
});
static ISO_DATE: Lazy<Regex> = Lazy::new(|| compile(r"^(\d{4})-(\d{1,2})-(\d{1,2})$"));
static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| compile(r"^(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?$"));

static MERIDIEM_TIME: Lazy<Regex> =
    Lazy::new(|| compile(r"^(\d{1,2})(?::([0-5]\d))? ?([ap])m?$"));
static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| compile(r"^([01]?\d|2[0-3]):([0-5]\d)$"));
static BARE_HOUR: Lazy<Regex> = Lazy::new(|| compile(r"^(?:at )?(\d{1,2})$"));

/// Default hour when only a date was given.
const DEFAULT_HOUR: u32 = 9;
const QUARTER_HOUR_SECS: i64 = 15 * 60;

#[derive(Debug, Default, Clone, Copy)]
pub struct TimeResolver;

impl TimeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Combines a date token and a time token into a timestamp. A time alone
    /// means today; a date alone means 09:00. `None` when neither token can
    /// be interpreted.
    pub fn resolve(
        &self,
        date_token: Option<&str>,
        time_token: Option<&str>,
        now: DateTime<Tz>,
    ) -> Option<DateTime<Tz>> {
        let date_token = date_token.map(normalize).filter(|s| !s.is_empty());
        let time_token = time_token.map(normalize).filter(|s| !s.is_empty());

        if date_token.is_none() && time_token.is_none() {
            return None;
        }

        if time_token.as_deref() == Some("now") {
            let rounded = round_up_to_quarter(now);
            return match date_token.as_deref() {
                None => Some(rounded),
                Some(token) => {
                    let date = self.date_for(token, now, None)?;
                    if date == now.date_naive() {
                        Some(rounded)
                    } else {
                        localize(now.timezone(), date.and_time(rounded.time()))
                    }
                }
            };
        }

        let time = match time_token.as_deref() {
            Some(token) => self.parse_time_of_day(token, now)?,
            None => NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0)?,
        };
        let date = match date_token.as_deref() {
            Some(token) => self.date_for(token, now, Some(time))?,
            None => now.date_naive(),
        };

        localize(now.timezone(), date.and_time(time))
    }

    /// Resolves a date token on its own. A weekday naming today resolves to
    /// today.
    pub fn resolve_date(&self, date_token: &str, now: DateTime<Tz>) -> Option<NaiveDate> {
        self.date_for(&normalize(date_token), now, None)
    }

    /// Interprets a time token as a wall-clock time.
    pub fn parse_time_of_day(&self, token: &str, now: DateTime<Tz>) -> Option<NaiveTime> {
        let token = normalize(token).replace('.', "");
        let hm = |h: u32, m: u32| NaiveTime::from_hms_opt(h, m, 0);

        match token.as_str() {
            "now" => return Some(round_up_to_quarter(now).time()),
            "noon" | "midday" => return hm(12, 0),
            "midnight" => return hm(0, 0),
            "morning" => return hm(9, 0),
            "afternoon" => return hm(14, 0),
            "evening" | "tonight" => return hm(18, 0),
            _ => {}
        }

        if let Some(caps) = MERIDIEM_TIME.captures(&token) {
            let hour: u32 = caps[1].parse().ok()?;
            let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
            if !(1..=12).contains(&hour) {
                return None;
            }
            let hour = match (&caps[3], hour) {
                ("a", 12) => 0,
                ("a", h) => h,
                ("p", 12) => 12,
                (_, h) => h + 12,
            };
            return hm(hour, minute);
        }

        if let Some(caps) = CLOCK_TIME.captures(&token) {
            return hm(caps[1].parse().ok()?, caps[2].parse().ok()?);
        }

        if let Some(caps) = BARE_HOUR.captures(&token) {
            let hour: u32 = caps[1].parse().ok()?;
            // Nobody books a meeting at 3 in the morning.
            let hour = match hour {
                1..=7 => hour + 12,
                0 | 8..=23 => hour,
                _ => return None,
            };
            return hm(hour, 0);
        }

        None
    }

    fn date_for(&self, token: &str, now: DateTime<Tz>, time: Option<NaiveTime>) -> Option<NaiveDate> {
        let today = now.date_naive();

        match token {
            "today" | "tonight" | "this week" => return Some(today),
            "tomorrow" => return today.succ_opt(),
            "yesterday" => return today.pred_opt(),
            "next week" => {
                let days_since_monday = i64::from(today.weekday().num_days_from_monday());
                return Some(today - Duration::days(days_since_monday) + Duration::days(7));
            }
            "next month" => return today.checked_add_months(Months::new(1)),
            _ => {}
        }

        if let Some(caps) = IN_N_UNITS.captures(token) {
            let n: u32 = caps[1].parse().ok()?;
            return match &caps[2] {
                "day" => today.checked_add_signed(Duration::days(i64::from(n))),
                "week" => today.checked_add_signed(Duration::weeks(i64::from(n))),
                _ => today.checked_add_months(Months::new(n)),
            };
        }

        if let Some(caps) = WEEKDAY.captures(token) {
            if let Some(target) = parse_weekday(&caps[2]) {
                let is_next = caps.get(1).is_some_and(|m| m.as_str() == "next");
                return Some(next_weekday(now, target, is_next, time));
            }
        }

        if let Some(caps) = MONTH_DAY.captures(token) {
            let month = parse_month(&caps[1])?;
            let day: u32 = caps[2].parse().ok()?;
            let year = caps.get(3).map_or(Some(today.year()), |m| m.as_str().parse().ok())?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        if let Some(caps) = DAY_MONTH.captures(token) {
            let day: u32 = caps[1].parse().ok()?;
            let month = parse_month(&caps[2])?;
            let year = caps.get(3).map_or(Some(today.year()), |m| m.as_str().parse().ok())?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        if let Some(caps) = ISO_DATE.captures(token) {
            return NaiveDate::from_ymd_opt(
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            );
        }

        if let Some(caps) = NUMERIC_DATE.captures(token) {
            let month: u32 = caps[1].parse().ok()?;
            let day: u32 = caps[2].parse().ok()?;
            let year = match caps.get(3) {
                None => today.year(),
                Some(m) => {
                    let y: i32 = m.as_str().parse().ok()?;
                    if y < 100 {
                        2000 + y
                    } else {
                        y
                    }
                }
            };
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        None
    }
}

/// Next occurrence of `target`. Today counts only when "next" was not said
/// and the requested time has not already gone by. "next <weekday>" for any
/// other day skips the coming occurrence.
fn next_weekday(
    now: DateTime<Tz>,
    target: Weekday,
    is_next: bool,
    time: Option<NaiveTime>,
) -> NaiveDate {
    let today = now.date_naive();
    let current = today.weekday().num_days_from_monday();
    let wanted = target.num_days_from_monday();
    let mut days_ahead = (i64::from(wanted) - i64::from(current)).rem_euclid(7);

    if days_ahead == 0 {
        let passed = time.is_some_and(|t| t <= now.time());
        if is_next || passed {
            days_ahead = 7;
        }
    } else if is_next {
        days_ahead += 7;
    }

    today + Duration::days(days_ahead)
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_month(s: &str) -> Option<u32> {
    let month = match s.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn normalize(token: &str) -> String {
    token
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rounds up to the next quarter hour; an instant already on a boundary is
/// kept.
fn round_up_to_quarter(now: DateTime<Tz>) -> DateTime<Tz> {
    let secs = i64::from(now.num_seconds_from_midnight());
    let nanos = i64::from(now.nanosecond());
    let remainder = secs % QUARTER_HOUR_SECS;
    if remainder == 0 && nanos == 0 {
        return now;
    }
    now - Duration::nanoseconds(nanos) + Duration::seconds(QUARTER_HOUR_SECS - remainder)
}

/// Attaches the zone to a wall-clock time. Times inside a DST gap move
/// forward by the gap.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    /// Monday 2025-06-16 10:07 in New York.
    fn now() -> DateTime<Tz> {
        New_York.with_ymd_and_hms(2025, 6, 16, 10, 7, 0).unwrap()
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        New_York.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn resolve(date: Option<&str>, time: Option<&str>) -> Option<DateTime<Tz>> {
        TimeResolver::new().resolve(date, time, now())
    }

    #[test]
    fn test_tomorrow_at_2pm() {
        assert_eq!(resolve(Some("tomorrow"), Some("2pm")), Some(dt(2025, 6, 17, 14, 0)));
        assert_eq!(resolve(Some("tomorrow"), Some("2:00 pm")), Some(dt(2025, 6, 17, 14, 0)));
    }

    #[test]
    fn test_date_without_time_defaults_to_nine() {
        assert_eq!(resolve(Some("thursday"), None), Some(dt(2025, 6, 19, 9, 0)));
    }

    #[test]
    fn test_time_without_date_is_today() {
        assert_eq!(resolve(None, Some("2pm")), Some(dt(2025, 6, 16, 14, 0)));
    }

    #[test]
    fn test_same_weekday_depends_on_time() {
        assert_eq!(resolve(Some("monday"), Some("3pm")), Some(dt(2025, 6, 16, 15, 0)));
        assert_eq!(resolve(Some("monday"), Some("9am")), Some(dt(2025, 6, 23, 9, 0)));
        assert_eq!(resolve(Some("next monday"), Some("3pm")), Some(dt(2025, 6, 23, 15, 0)));
    }

    #[test]
    fn test_next_weekday_skips_a_week() {
        assert_eq!(resolve(Some("wednesday"), Some("10am")), Some(dt(2025, 6, 18, 10, 0)));
        assert_eq!(resolve(Some("next wednesday"), Some("10am")), Some(dt(2025, 6, 25, 10, 0)));
        assert_eq!(resolve(Some("this wednesday"), Some("10am")), Some(dt(2025, 6, 18, 10, 0)));
    }

    #[test]
    fn test_relative_phrases() {
        assert_eq!(resolve(Some("next week"), None), Some(dt(2025, 6, 23, 9, 0)));
        assert_eq!(resolve(Some("in 3 days"), Some("noon")), Some(dt(2025, 6, 19, 12, 0)));
        assert_eq!(resolve(Some("in 2 weeks"), None), Some(dt(2025, 6, 30, 9, 0)));
        assert_eq!(resolve(Some("next month"), None), Some(dt(2025, 7, 16, 9, 0)));
        assert_eq!(resolve(Some("yesterday"), Some("morning")), Some(dt(2025, 6, 15, 9, 0)));
    }

    #[test]
    fn test_calendar_dates() {
        assert_eq!(resolve(Some("december 25"), Some("2 pm")), Some(dt(2025, 12, 25, 14, 0)));
        assert_eq!(resolve(Some("dec 25th, 2026"), None), Some(dt(2026, 12, 25, 9, 0)));
        assert_eq!(resolve(Some("25th of december"), None), Some(dt(2025, 12, 25, 9, 0)));
        assert_eq!(resolve(Some("2025-07-04"), Some("11am")), Some(dt(2025, 7, 4, 11, 0)));
        assert_eq!(resolve(Some("7/4"), None), Some(dt(2025, 7, 4, 9, 0)));
        assert_eq!(resolve(Some("7/4/26"), None), Some(dt(2026, 7, 4, 9, 0)));
    }

    #[test]
    fn test_invalid_calendar_date() {
        assert_eq!(resolve(Some("february 30"), None), None);
        assert_eq!(resolve(Some("13/45"), None), None);
    }

    #[test]
    fn test_now_rounds_to_quarter_hour() {
        assert_eq!(resolve(None, Some("now")), Some(dt(2025, 6, 16, 10, 15)));
        assert_eq!(resolve(Some("today"), Some("now")), Some(dt(2025, 6, 16, 10, 15)));

        let on_boundary = dt(2025, 6, 16, 10, 30);
        assert_eq!(
            TimeResolver::new().resolve(None, Some("now"), on_boundary),
            Some(on_boundary)
        );
    }

    #[test]
    fn test_time_of_day_words_and_bare_hours() {
        let r = TimeResolver::new();
        let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(r.parse_time_of_day("morning", now()), Some(hm(9, 0)));
        assert_eq!(r.parse_time_of_day("afternoon", now()), Some(hm(14, 0)));
        assert_eq!(r.parse_time_of_day("evening", now()), Some(hm(18, 0)));
        assert_eq!(r.parse_time_of_day("midnight", now()), Some(hm(0, 0)));
        assert_eq!(r.parse_time_of_day("3", now()), Some(hm(15, 0)));
        assert_eq!(r.parse_time_of_day("10", now()), Some(hm(10, 0)));
        assert_eq!(r.parse_time_of_day("12am", now()), Some(hm(0, 0)));
        assert_eq!(r.parse_time_of_day("12 pm", now()), Some(hm(12, 0)));
        assert_eq!(r.parse_time_of_day("2:30 p.m.", now()), Some(hm(14, 30)));
        assert_eq!(r.parse_time_of_day("16:45", now()), Some(hm(16, 45)));
        assert_eq!(r.parse_time_of_day("13pm", now()), None);
        assert_eq!(r.parse_time_of_day("soonish", now()), None);
    }

    #[test]
    fn test_nothing_to_resolve() {
        assert_eq!(resolve(None, None), None);
        assert_eq!(resolve(Some("blursday"), None), None);
        assert_eq!(resolve(Some("  "), Some("")), None);
    }

    #[test]
    fn test_resolve_date_treats_today_weekday_as_today() {
        let r = TimeResolver::new();
        assert_eq!(
            r.resolve_date("Monday", now()),
            NaiveDate::from_ymd_opt(2025, 6, 16)
        );
        assert_eq!(
            r.resolve_date("friday", now()),
            NaiveDate::from_ymd_opt(2025, 6, 20)
        );
    }
}
