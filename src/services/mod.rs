pub mod ai;
pub mod availability;
pub mod booking;
pub mod calendar;
pub mod clock;
pub mod conflicts;
pub mod conversation;
pub mod extraction;
pub mod formatting;
pub mod intent;
pub mod past_guard;
pub mod time_resolver;
pub mod working_hours;
