use crate::config::AppConfig;
use crate::db::Db;
use crate::services::ai::LlmProvider;
use crate::services::booking::BookingStateMachine;
use crate::services::calendar::CalendarProvider;
use crate::services::clock::Clock;

pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
    pub machine: BookingStateMachine,
    pub llm: Box<dyn LlmProvider>,
    pub calendar: Box<dyn CalendarProvider>,
    pub clock: Box<dyn Clock>,
}

impl AppState {
    pub fn new(
        db: Db,
        config: AppConfig,
        llm: Box<dyn LlmProvider>,
        calendar: Box<dyn CalendarProvider>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let machine = BookingStateMachine::new(config.working_hours(), config.booking_settings());
        Self {
            db,
            config,
            machine,
            llm,
            calendar,
            clock,
        }
    }
}
