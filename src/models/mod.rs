pub mod conversation;
pub mod entities;
pub mod intent;
pub mod profile;
pub mod schedule;
pub mod working_hours;

pub use conversation::{
    ChatMessage, ConversationHistory, ConversationState, PendingOperation, Role, Session,
};
pub use entities::{ExtractedEntities, MeetingTopic, MeetingType};
pub use intent::Intent;
pub use profile::UserProfile;
pub use schedule::{BusyInterval, CalendarEvent, NewEvent, TimeSlot};
pub use working_hours::WorkingHoursConfig;
