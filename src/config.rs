use std::env;

use chrono_tz::Tz;

use crate::models::WorkingHoursConfig;
use crate::services::booking::BookingSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub llm_provider: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_email: String,
    pub timezone: String,
    pub weekday_start: String,
    pub weekday_end: String,
    pub weekend_start: String,
    pub weekend_end: String,
    pub default_duration_minutes: u32,
    pub slot_interval_minutes: u32,
    pub max_conversation_history: usize,
    pub session_timeout_minutes: i64,
    pub cancellation_lookahead_days: i64,
    pub cors_origins: Vec<String>,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed_or("PORT", 3000),
            database_url: var_or("DATABASE_URL", "chatcal.db"),
            admin_token: var_or("ADMIN_TOKEN", "changeme"),
            llm_provider: var_or("LLM_PROVIDER", "ollama").to_lowercase(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            anthropic_model: var_or("ANTHROPIC_MODEL", "claude-3-5-haiku-latest"),
            ollama_url: var_or("OLLAMA_URL", "http://localhost:11434"),
            ollama_model: var_or("OLLAMA_MODEL", "llama3.2"),
            owner_name: var_or("OWNER_NAME", "Peter Michael Gits"),
            owner_phone: env::var("OWNER_PHONE").unwrap_or_default(),
            owner_email: env::var("OWNER_EMAIL").unwrap_or_default(),
            timezone: var_or("DEFAULT_TIMEZONE", "America/New_York"),
            weekday_start: var_or("WEEKDAY_START_TIME", "09:00"),
            weekday_end: var_or("WEEKDAY_END_TIME", "17:00"),
            weekend_start: var_or("WEEKEND_START_TIME", "10:00"),
            weekend_end: var_or("WEEKEND_END_TIME", "14:00"),
            default_duration_minutes: parsed_or("DEFAULT_DURATION_MINUTES", 60),
            slot_interval_minutes: parsed_or("SLOT_INTERVAL_MINUTES", 30),
            max_conversation_history: parsed_or("MAX_CONVERSATION_HISTORY", 20),
            session_timeout_minutes: parsed_or("SESSION_TIMEOUT_MINUTES", 30),
            cancellation_lookahead_days: parsed_or("CANCELLATION_LOOKAHEAD_DAYS", 30),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    /// Business hours in the owner's zone. Anything unparseable falls back
    /// to the built-in defaults.
    pub fn working_hours(&self) -> WorkingHoursConfig {
        match WorkingHoursConfig::from_strings(
            &self.weekday_start,
            &self.weekday_end,
            &self.weekend_start,
            &self.weekend_end,
            &self.timezone,
        ) {
            Ok(hours) => hours,
            Err(e) => {
                tracing::warn!(error = %e, "invalid working hours configuration, using defaults");
                WorkingHoursConfig::default()
            }
        }
    }

    pub fn timezone(&self) -> Tz {
        self.working_hours().timezone
    }

    pub fn booking_settings(&self) -> BookingSettings {
        BookingSettings {
            owner_name: self.owner_name.clone(),
            owner_phone: self.owner_phone.clone(),
            owner_email: self.owner_email.clone(),
            default_duration_minutes: self.default_duration_minutes.max(1),
            slot_interval_minutes: self.slot_interval_minutes.max(1),
            lookahead_days: self.cancellation_lookahead_days.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            port: 3000,
            database_url: ":memory:".to_string(),
            admin_token: "secret".to_string(),
            llm_provider: "ollama".to_string(),
            anthropic_api_key: String::new(),
            anthropic_model: String::new(),
            ollama_url: String::new(),
            ollama_model: String::new(),
            owner_name: "Alex Morgan".to_string(),
            owner_phone: String::new(),
            owner_email: String::new(),
            timezone: "Europe/London".to_string(),
            weekday_start: "08:30".to_string(),
            weekday_end: "18:00".to_string(),
            weekend_start: "10:00".to_string(),
            weekend_end: "14:00".to_string(),
            default_duration_minutes: 45,
            slot_interval_minutes: 15,
            max_conversation_history: 20,
            session_timeout_minutes: 30,
            cancellation_lookahead_days: 0,
            cors_origins: Vec::new(),
        }
    }

    #[test]
    fn test_working_hours_from_config() {
        let hours = config().working_hours();
        assert_eq!(hours.timezone, chrono_tz::Europe::London);
        assert_eq!(hours.weekday_start, chrono::NaiveTime::from_hms_opt(8, 30, 0).unwrap());
    }

    #[test]
    fn test_bad_working_hours_fall_back() {
        let mut config = config();
        config.timezone = "Mars/Olympus_Mons".to_string();
        assert_eq!(config.working_hours(), WorkingHoursConfig::default());
    }

    #[test]
    fn test_booking_settings_clamp_lookahead() {
        let settings = config().booking_settings();
        assert_eq!(settings.default_duration_minutes, 45);
        assert_eq!(settings.lookahead_days, 1);
    }
}
