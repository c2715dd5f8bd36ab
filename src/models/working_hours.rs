use chrono::NaiveTime;
use chrono_tz::Tz;

/// Business hours for the calendar owner, split by weekday class.
/// Loaded once from configuration and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingHoursConfig {
    pub weekday_start: NaiveTime,
    pub weekday_end: NaiveTime,
    pub weekend_start: NaiveTime,
    pub weekend_end: NaiveTime,
    pub timezone: Tz,
}

impl Default for WorkingHoursConfig {
    fn default() -> Self {
        Self {
            weekday_start: hm(9, 0),
            weekday_end: hm(17, 0),
            weekend_start: hm(10, 0),
            weekend_end: hm(14, 0),
            timezone: chrono_tz::America::New_York,
        }
    }
}

impl WorkingHoursConfig {
    /// Builds a config from `HH:MM` strings, rejecting malformed times and
    /// windows that end before they start.
    pub fn from_strings(
        weekday_start: &str,
        weekday_end: &str,
        weekend_start: &str,
        weekend_end: &str,
        timezone: &str,
    ) -> anyhow::Result<Self> {
        let config = Self {
            weekday_start: parse_time(weekday_start)?,
            weekday_end: parse_time(weekday_end)?,
            weekend_start: parse_time(weekend_start)?,
            weekend_end: parse_time(weekend_end)?,
            timezone: timezone
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid timezone: {timezone}"))?,
        };
        if config.weekday_start >= config.weekday_end {
            anyhow::bail!("weekday hours end before they start");
        }
        if config.weekend_start >= config.weekend_end {
            anyhow::bail!("weekend hours end before they start");
        }
        Ok(config)
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 2 {
        return Err(anyhow::anyhow!("invalid time format: {s}"));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config =
            WorkingHoursConfig::from_strings("08:30", "18:00", "10:00", "14:00", "America/Chicago")
                .unwrap();
        assert_eq!(config.weekday_start, hm(8, 30));
        assert_eq!(config.timezone, chrono_tz::America::Chicago);
    }

    #[test]
    fn test_parse_invalid_time() {
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("9am").is_err());
        assert!(parse_time("09:61").is_err());
    }

    #[test]
    fn test_parse_invalid_timezone() {
        let result =
            WorkingHoursConfig::from_strings("09:00", "17:00", "10:00", "14:00", "Mars/Olympus");
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let result =
            WorkingHoursConfig::from_strings("17:00", "09:00", "10:00", "14:00", "UTC");
        assert!(result.is_err());
    }
}
