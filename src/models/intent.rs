use serde::{Deserialize, Serialize};

/// What the person is trying to do with this utterance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CheckAvailability,
    CreateBooking,
    CancelBooking,
    RescheduleBooking,
    ListUpcoming,
    OwnerContact,
    Help,
    Reset,
    Unhandled,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CheckAvailability => "check_availability",
            Intent::CreateBooking => "create_booking",
            Intent::CancelBooking => "cancel_booking",
            Intent::RescheduleBooking => "reschedule_booking",
            Intent::ListUpcoming => "list_upcoming",
            Intent::OwnerContact => "owner_contact",
            Intent::Help => "help",
            Intent::Reset => "reset",
            Intent::Unhandled => "unhandled",
        }
    }
}
