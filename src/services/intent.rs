use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ConversationState, Intent};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("intent pattern should compile - this is a bug")
}

static RESET: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(?:/reset|reset|start over|restart|forget it|never ?mind)\b")
});
static HELP: Lazy<Regex> =
    Lazy::new(|| compile(r"^(?:/help|help)\W*$|\bwhat can you do\b|\bhow does this work\b"));
static CANCEL: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(?:cancel|call off|delete|remove)\b"));
static RESCHEDULE: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(?:reschedule|postpone|push back|move (?:my|the|our|it)|change the time|different time for my)\b")
});
static LIST_UPCOMING: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(?:my|upcoming|scheduled|booked) (?:meetings|appointments|bookings|calls)\b|\bwhat (?:meetings )?do i have\b|\bwhen is my (?:meeting|appointment|call)\b")
});
static CHECK_AVAILABILITY: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(?:available|availability|free slots?|open slots?|openings?|when (?:are you|is \w+) free|what times?|any time slots?)\b")
});
static BOOKING_VERB: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(?:book|schedule|set up|arrange|reserve|make an appointment|can we meet|let's meet|like to meet|want to meet)\b")
});
static BOOKING_NOUN: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(?:meeting|appointment|consultation|call|chat|session|google meet|zoom)\b")
});

/// Keyword-driven intent classification. Owner-contact detection is keyed to
/// the owner's first name, so the classifier is built per deployment.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    owner_contact: Vec<Regex>,
}

impl IntentClassifier {
    pub fn new(owner_name: &str) -> Self {
        let first = owner_name
            .split_whitespace()
            .next()
            .unwrap_or("owner")
            .to_lowercase();
        let owner = regex::escape(&first);
        let owner_contact = [
            format!(r"what.{{0,20}}{owner}.{{0,20}}(?:phone|number|contact|email)"),
            format!(r"(?:phone|number|contact|email).{{0,20}}{owner}"),
            format!(r"how.{{0,20}}(?:reach|contact).{{0,20}}{owner}"),
            format!(r"{owner}.{{0,20}}(?:email|phone).{{0,20}}address"),
        ]
        .iter()
        .map(|p| compile(p))
        .collect();

        Self { owner_contact }
    }

    /// Classifies one utterance. While an operation is pending, a message that
    /// only mentions a meeting (no booking verb) continues that operation.
    pub fn classify(&self, utterance: &str, state: &ConversationState) -> Intent {
        let text = utterance.trim().to_lowercase();

        if RESET.is_match(&text) {
            return Intent::Reset;
        }
        if HELP.is_match(&text) {
            return Intent::Help;
        }
        if self.owner_contact.iter().any(|re| re.is_match(&text)) && !BOOKING_VERB.is_match(&text)
        {
            return Intent::OwnerContact;
        }
        if CANCEL.is_match(&text) {
            return Intent::CancelBooking;
        }
        if RESCHEDULE.is_match(&text) {
            return Intent::RescheduleBooking;
        }
        if LIST_UPCOMING.is_match(&text) && !BOOKING_VERB.is_match(&text) {
            return Intent::ListUpcoming;
        }
        if CHECK_AVAILABILITY.is_match(&text) {
            return Intent::CheckAvailability;
        }
        if BOOKING_VERB.is_match(&text) {
            return Intent::CreateBooking;
        }
        if BOOKING_NOUN.is_match(&text) && state.is_idle() {
            return Intent::CreateBooking;
        }
        Intent::Unhandled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PendingOperation;

    fn classify(text: &str) -> Intent {
        IntentClassifier::new("Alex Morgan").classify(text, &ConversationState::default())
    }

    #[test]
    fn test_booking() {
        assert_eq!(classify("Schedule a Google Meet tomorrow at 2pm"), Intent::CreateBooking);
        assert_eq!(classify("can we book something for friday"), Intent::CreateBooking);
        assert_eq!(classify("a quick call next week?"), Intent::CreateBooking);
    }

    #[test]
    fn test_cancel_and_reschedule() {
        assert_eq!(classify("Please cancel my meeting"), Intent::CancelBooking);
        assert_eq!(classify("I need to reschedule our call"), Intent::RescheduleBooking);
        assert_eq!(classify("can you move my meeting to 3pm"), Intent::RescheduleBooking);
    }

    #[test]
    fn test_availability_beats_booking() {
        assert_eq!(classify("what times are available tomorrow?"), Intent::CheckAvailability);
        assert_eq!(classify("Is Alex available on Friday"), Intent::CheckAvailability);
    }

    #[test]
    fn test_list_upcoming() {
        assert_eq!(classify("show me my meetings"), Intent::ListUpcoming);
        assert_eq!(classify("what do I have this week"), Intent::ListUpcoming);
    }

    #[test]
    fn test_owner_contact() {
        assert_eq!(classify("What is Alex's phone number?"), Intent::OwnerContact);
        assert_eq!(classify("how can I reach alex"), Intent::OwnerContact);
        assert_eq!(
            classify("book a call, my phone number is 6308805488, for alex"),
            Intent::CreateBooking
        );
    }

    #[test]
    fn test_help_and_reset() {
        assert_eq!(classify("help"), Intent::Help);
        assert_eq!(classify("/help"), Intent::Help);
        assert_eq!(classify("what can you do?"), Intent::Help);
        assert_eq!(classify("start over"), Intent::Reset);
        assert_eq!(classify("never mind"), Intent::Reset);
    }

    #[test]
    fn test_unhandled() {
        assert_eq!(classify("My name is Jane"), Intent::Unhandled);
        assert_eq!(classify("jane@example.com"), Intent::Unhandled);
    }

    #[test]
    fn test_meeting_noun_continues_pending_operation() {
        let classifier = IntentClassifier::new("Alex");
        let mut state = ConversationState::default();
        state.begin(PendingOperation::Cancellation);
        assert_eq!(classifier.classify("the 3pm meeting", &state), Intent::Unhandled);
        assert_eq!(
            classifier.classify("the 3pm meeting", &ConversationState::default()),
            Intent::CreateBooking
        );
    }
}
