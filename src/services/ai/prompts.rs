//! Fixed reply texts and the system prompt handed to the text generator.

use crate::models::UserProfile;

const PERSONA: &str = r#"You are ChatCal, a friendly and upbeat scheduling assistant that books meetings on behalf of {owner}.

Your communication style:
- Warm and encouraging, but efficient
- Use an emoji now and then, never more than one per message
- Keep replies short: two to four sentences

Rules:
- Never claim a meeting is booked, moved or cancelled unless the calendar result below says so
- Only suggest times inside {owner}'s business hours: {hours}
- The current date and time is {now}
- If a calendar result is included below, base your answer on it and do not invent other times
"#;

pub const GREETING: &str =
    "Hey there! 👋 I'm ChatCal, and I'd be delighted to help you book time with {owner}.";

pub const EMPTY_MESSAGE_REPLY: &str = "I'd love to help! Could you tell me what you need? 😊";

pub const LONG_MESSAGE_REPLY: &str =
    "That's quite a message! Could you break it down into smaller parts? I work better with shorter requests. 📝";

pub const FALLBACK_REPLY: &str =
    "Oops! I'm having a tiny technical hiccup. Could you try that again? 😊";

/// Inputs for one generation call.
pub struct PromptContext<'a> {
    pub owner_name: &'a str,
    pub business_hours: &'a str,
    pub now: &'a str,
    pub profile: &'a UserProfile,
    /// Non-final result of a calendar action, if one ran this turn.
    pub evidence: Option<&'a str>,
}

pub fn system_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = PERSONA
        .replace("{owner}", ctx.owner_name)
        .replace("{hours}", ctx.business_hours)
        .replace("{now}", ctx.now);

    prompt.push('\n');
    prompt.push_str(&ctx.profile.to_prompt());

    if let Some(evidence) = ctx.evidence {
        prompt.push_str("\n\nCalendar result for this turn:\n");
        prompt.push_str(evidence);
    }
    prompt
}

pub fn greeting(owner_name: &str) -> String {
    GREETING.replace("{owner}", owner_name)
}

pub fn help_text(owner_name: &str, business_hours: &str) -> String {
    format!(
        "I'm ChatCal, {owner_name}'s scheduling assistant! 📅 Here's how I can help:\n\n\
         • Book a meeting: \"I'd like a consultation tomorrow at 2pm\"\n\
         • Check availability: \"What times are free on Friday?\"\n\
         • See your bookings: \"What meetings do I have?\"\n\
         • Move a meeting: \"Reschedule my meeting to Thursday at 10am\"\n\
         • Cancel a meeting: \"Cancel my meeting tomorrow\"\n\n\
         Meeting types:\n\
         • Quick chat (30 minutes)\n\
         • Consultation (60 minutes)\n\
         • Project meeting (60 minutes)\n\
         • Advisory session (90 minutes)\n\n\
         {owner_name} meets {business_hours}. Say \"start over\" at any time to begin again."
    )
}

pub fn owner_contact(owner_name: &str, phone: &str, email: &str) -> String {
    format!(
        "{owner_name}'s contact information:\n📞 Phone: {phone}\n📧 Email: {email}\n\n\
         I can also help you schedule an appointment with {owner_name} right here. What would you prefer?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_includes_context() {
        let profile = UserProfile {
            name: Some("Jane".to_string()),
            ..Default::default()
        };
        let prompt = system_prompt(&PromptContext {
            owner_name: "Alex",
            business_hours: "Monday through Friday from 9:00 AM - 5:00 PM EDT",
            now: "Monday, June 16, 2025 10:07 AM EDT",
            profile: &profile,
            evidence: Some("Here's what's coming up"),
        });
        assert!(prompt.contains("on behalf of Alex"));
        assert!(prompt.contains("9:00 AM - 5:00 PM"));
        assert!(prompt.contains("- Name: Jane"));
        assert!(prompt.contains("Calendar result for this turn:\nHere's what's coming up"));
        assert!(!prompt.contains("{owner}"));
    }

    #[test]
    fn test_prompt_without_evidence() {
        let profile = UserProfile::default();
        let prompt = system_prompt(&PromptContext {
            owner_name: "Alex",
            business_hours: "weekdays",
            now: "now",
            profile: &profile,
            evidence: None,
        });
        assert!(!prompt.contains("Calendar result"));
    }
}
