//! Pattern-based entity extraction.
//!
//! Every field has an ordered list of patterns; the first one that matches
//! wins, so the order of each list is its priority. Nothing here fails: a
//! field that cannot be recognised is simply left empty.

use std::cmp::Reverse;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ExtractedEntities, MeetingTopic, MeetingType};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("extraction pattern should compile - this is a bug")
}

const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(r"\b(?:today|tonight)\b"),
        compile(r"\btomorrow\b"),
        compile(r"\byesterday\b"),
        compile(r"\bnext week\b"),
        compile(r"\bthis week\b"),
        compile(r"\bnext month\b"),
        compile(r"\bin \d+ (?:day|week|month)s?\b"),
        compile(r"\b(?:(?:next|this|coming) )?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b"),
        compile(&format!(r"\b{MONTH}\.? \d{{1,2}}(?:st|nd|rd|th)?\b(?:,? \d{{4}}\b)?")),
        compile(&format!(r"\b\d{{1,2}}(?:st|nd|rd|th)? (?:of )?{MONTH}\b(?:,? \d{{4}}\b)?")),
        compile(r"\b\d{4}-\d{1,2}-\d{1,2}\b"),
        compile(r"\b\d{1,2}/\d{1,2}(?:/\d{2,4})?\b"),
    ]
});

static TIME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(r"\b\d{1,2}(?::[0-5]\d)? ?[ap]\.?m\b\.?"),
        compile(r"\b(?:[01]?\d|2[0-3]):[0-5]\d\b"),
        compile(r"\b(?:noon|midday|midnight)\b"),
        compile(r"\b(?:morning|afternoon|evening|tonight)\b"),
        compile(r"\bnow\b"),
    ]
});

static BARE_HOUR: Lazy<Regex> = Lazy::new(|| compile(r"\bat (\d{1,2})\b(?:[^:\d/]|$)"));

static DURATION_HOURS: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(\d+(?:\.\d+)?) ?-?(?:hours?|hrs?)\b"));
static DURATION_MINUTES: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(\d+) ?-?(?:minutes?|mins?)\b"));

/// Phrases that name a length without a number, most specific first.
static DURATION_PHRASES: Lazy<Vec<(Regex, u32)>> = Lazy::new(|| {
    vec![
        (compile(r"\b(?:an |one )?hour and a half\b"), 90),
        (compile(r"\bhalf (?:an )?hour\b|\bhalf-hour\b"), 30),
        (compile(r"\b(?:an|one) hour\b"), 60),
    ]
});

/// Fallback lengths implied by the kind of meeting.
static DURATION_DEFAULTS: Lazy<Vec<(Regex, u32)>> = Lazy::new(|| {
    vec![
        (compile(r"\b(?:brief|quick)\b"), 30),
        (compile(r"\badvisory\b"), 90),
        (compile(r"\b(?:consultation|meeting)\b"), 60),
    ]
});

static MEETING_TYPE_PATTERNS: Lazy<Vec<(Regex, MeetingType)>> = Lazy::new(|| {
    vec![
        (
            compile(r"\bgoogle meet\b|\bgmeet\b|\bvideo\b|\bzoom\b|\bonline\b|\bvirtual(?:ly)?\b|\bremote(?:ly)?\b|\bteams\b|\bconference call\b|\bwebcam\b"),
            MeetingType::Video,
        ),
        (
            compile(r"\bin[- ]person\b|\bface[- ]to[- ]face\b|\bcoffee\b|\bat (?:your|the|his|her) office\b"),
            MeetingType::InPerson,
        ),
        (compile(r"\bphone\b|\bcalls?\b|\bring me\b"), MeetingType::Phone),
    ]
});

static TOPIC_PATTERNS: Lazy<Vec<(Regex, MeetingTopic)>> = Lazy::new(|| {
    vec![
        (compile(r"\bquick (?:chat|call|catch[- ]?up)\b"), MeetingTopic::QuickChat),
        (compile(r"\badvisory\b"), MeetingTopic::AdvisorySession),
        (compile(r"\bproject\b"), MeetingTopic::ProjectMeeting),
        (compile(r"\bconsult(?:ation)?\b"), MeetingTopic::Consultation),
    ]
});

static EMAIL: Lazy<Regex> =
    Lazy::new(|| compile(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"));

const PHONE_BODY: &str =
    r"(?:\+?1[-.\s]?)?\(?(?P<a>\d{3})\)?[-.\s]*(?P<b>\d{3})[-.\s]*(?P<c>\d{4})\b";

static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(&format!(r"(?i)\bcall me at\s*{PHONE_BODY}")),
        compile(&format!(
            r"(?i)\b(?:phone|number|cell|mobile)(?: number)?(?: is)?\s*:?\s*{PHONE_BODY}"
        )),
        compile(r"(?:^|[^\d])(?:\+?1[-.\s]?)?\(?(?P<a>\d{3})\)?[-.\s]?(?P<b>\d{3})[-.\s]?(?P<c>\d{4})\b"),
    ]
});

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(r"\bmy name is ([a-z0-9][a-z0-9' -]*)"),
        compile(r"\bname's ([a-z0-9][a-z0-9' -]*)"),
        compile(r"\bi'm ([a-z0-9][a-z0-9' -]*)"),
        compile(r"\bi am ([a-z0-9][a-z0-9' -]*)"),
        compile(r"\bthis is ([a-z0-9][a-z0-9' -]*)"),
    ]
});

/// "Betty here", "John Smith speaking". Needs the original capitalisation.
static SIGN_OFF_NAME: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?:^|[.!?]\s+)([A-Z][a-z]+(?: [A-Z][a-z]+)?),? (?:here|speaking|calling)\b")
});

/// A reply made of nothing but a capitalised name: "Jane Doe", "Sam."
static BARE_NAME: Lazy<Regex> =
    Lazy::new(|| compile(r"^([A-Z][a-z']+(?: [A-Z][a-z']+){0,2})[.!]?$"));

static MEETING_ID: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\b(?:meeting|event|booking|appointment) (?:id|number|#)\s*(?:is\s+)?[:#]?\s*([A-Za-z0-9_-]{4,})\b")
});

/// Words that end a captured name.
const NAME_STOP_WORDS: &[&str] = &[
    "and", "but", "or", "from", "with", "my", "i", "at", "calling", "here", "speaking", "to",
    "for", "on", "in", "the", "a", "an", "please", "can", "could", "would", "will", "need",
    "want", "email", "phone", "number", "is", "it", "you", "your", "we", "so", "just", "today",
    "tomorrow", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    "also", "let", "via", "by", "about", "reaching", "trying",
];

/// Words that follow "I'm" / "this is" without being a name.
const NON_NAME_WORDS: &[&str] = &[
    "looking", "interested", "free", "available", "busy", "trying", "wondering", "good",
    "fine", "great", "ok", "okay", "not", "sorry", "hoping", "glad", "happy", "ready", "going",
    "able", "just", "also", "still", "back", "new", "sure", "very", "really", "urgent",
    "important", "perfect", "afraid", "done", "all", "unable", "running", "late", "excited",
    "thinking", "planning", "calling", "here", "booking", "scheduling", "checking", "writing",
    "a", "an", "the", "so", "in", "at", "on", "for", "to", "about", "it", "what", "who",
    "when", "where", "how", "why", "that", "this", "there", "fantastic", "awesome", "hungry",
    "tired", "confused", "curious", "available", "open", "out", "away", "off", "travelling",
    "traveling", "booked", "wrong", "right", "correct", "yes", "no", "nope", "yeah", "thanks",
    "thank", "hi", "hello", "hey", "cancel", "nevermind",
];

const MAX_NAME_WORDS: usize = 3;

/// Stateless extractor; cheap to construct, safe to share.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, utterance: &str) -> ExtractedEntities {
        let normalized = normalize(utterance);

        let mut date = extract_date(&normalized);
        let time = extract_time(&normalized);
        if date.is_none() && time.as_deref() == Some("now") {
            date = Some("today".to_string());
        }

        let phone = extract_phone(utterance);
        let meeting_type = extract_meeting_type(&normalized, phone.is_some());

        ExtractedEntities {
            date,
            dates: extract_dates(&normalized),
            time,
            duration_minutes: extract_duration(&normalized),
            meeting_type,
            name: extract_name(&normalized, utterance),
            email: extract_email(utterance),
            phone,
            meeting_id: extract_meeting_id(utterance),
            topic: extract_topic(&normalized),
        }
    }

    /// Reads a reply that is only a name. Used when the name was the last
    /// thing asked for, since a lone "Jane Doe" matches no other pattern.
    pub fn bare_name(&self, utterance: &str) -> Option<String> {
        BARE_NAME
            .captures(utterance.trim())
            .and_then(|caps| clean_name(&caps[1].to_lowercase()))
    }
}

/// Lowercases, straightens curly apostrophes and collapses whitespace.
fn normalize(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'")
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_date(text: &str) -> Option<String> {
    DATE_PATTERNS
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().trim().to_string())
}

/// All date mentions, left to right. Where matches overlap the one that
/// starts first wins, the longer one on a tie.
fn extract_dates(text: &str) -> Vec<String> {
    let mut spans: Vec<(usize, usize)> = DATE_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.end())))
        .collect();
    spans.sort_by_key(|&(start, end)| (start, Reverse(end)));

    let mut dates = Vec::new();
    let mut covered = 0;
    for (start, end) in spans {
        if start >= covered {
            dates.push(text[start..end].trim().to_string());
            covered = end;
        }
    }
    dates
}

fn extract_time(text: &str) -> Option<String> {
    if let Some(m) = TIME_PATTERNS.iter().find_map(|re| re.find(text)) {
        return Some(m.as_str().replace('.', "").trim().to_string());
    }
    BARE_HOUR
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_duration(text: &str) -> Option<u32> {
    if let Some(caps) = DURATION_HOURS.captures(text) {
        if let Ok(hours) = caps[1].parse::<f64>() {
            let minutes = (hours * 60.0).round();
            if minutes > 0.0 && minutes <= f64::from(u32::MAX) {
                return Some(minutes as u32);
            }
        }
    }
    if let Some(caps) = DURATION_MINUTES.captures(text) {
        if let Ok(minutes) = caps[1].parse::<u32>() {
            if minutes > 0 {
                return Some(minutes);
            }
        }
    }
    DURATION_PHRASES
        .iter()
        .chain(DURATION_DEFAULTS.iter())
        .find(|(re, _)| re.is_match(text))
        .map(|(_, minutes)| *minutes)
}

fn extract_meeting_type(text: &str, has_phone_number: bool) -> Option<MeetingType> {
    MEETING_TYPE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, kind)| *kind)
        .or(has_phone_number.then_some(MeetingType::Phone))
}

fn extract_topic(text: &str) -> Option<MeetingTopic> {
    TOPIC_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, topic)| *topic)
}

fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_lowercase())
}

fn extract_phone(text: &str) -> Option<String> {
    PHONE_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(text)?;
        let digits: String = ["a", "b", "c"]
            .iter()
            .filter_map(|group| caps.name(group))
            .map(|m| m.as_str())
            .collect();
        (digits.len() >= 10).then_some(digits)
    })
}

fn extract_name(normalized: &str, original: &str) -> Option<String> {
    for re in NAME_PATTERNS.iter() {
        if let Some(caps) = re.captures(normalized) {
            if let Some(name) = clean_name(&caps[1]) {
                return Some(name);
            }
        }
    }
    SIGN_OFF_NAME
        .captures(original)
        .and_then(|caps| clean_name(&caps[1].to_lowercase()))
}

/// Trims a captured run down to the name itself and rejects anything that
/// does not look like one.
fn clean_name(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw
        .split([' ', '-'])
        .filter(|w| !w.is_empty())
        .take_while(|w| !NAME_STOP_WORDS.contains(w))
        .collect();

    let first = words.first()?;
    if NON_NAME_WORDS.contains(first) || first.ends_with("ing") {
        return None;
    }
    if words.len() > MAX_NAME_WORDS {
        return None;
    }
    if words.iter().any(|w| w.chars().any(|c| c.is_ascii_digit())) {
        return None;
    }

    let name = words
        .iter()
        .map(|w| title_case(w))
        .collect::<Vec<_>>()
        .join(" ");
    (2..=50).contains(&name.len()).then_some(name)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

fn extract_meeting_id(text: &str) -> Option<String> {
    MEETING_ID
        .captures(text)
        .map(|caps| caps[1].to_string())
        .filter(|id| id.chars().any(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> ExtractedEntities {
        EntityExtractor::new().extract(text)
    }

    #[test]
    fn test_google_meet_tomorrow() {
        let e = extract("Schedule a Google Meet tomorrow at 2pm");
        assert_eq!(e.date.as_deref(), Some("tomorrow"));
        assert_eq!(e.time.as_deref(), Some("2pm"));
        assert_eq!(e.meeting_type, Some(MeetingType::Video));
    }

    #[test]
    fn test_relative_date_beats_weekday() {
        let e = extract("tomorrow, or maybe friday");
        assert_eq!(e.date.as_deref(), Some("tomorrow"));
    }

    #[test]
    fn test_weekday_and_next_weekday() {
        assert_eq!(extract("how about Thursday?").date.as_deref(), Some("thursday"));
        assert_eq!(
            extract("can we do next Tuesday morning").date.as_deref(),
            Some("next tuesday")
        );
        assert_eq!(
            extract("can we do next Tuesday morning").time.as_deref(),
            Some("morning")
        );
    }

    #[test]
    fn test_in_n_days() {
        assert_eq!(extract("in 3 days at 10am").date.as_deref(), Some("in 3 days"));
    }

    #[test]
    fn test_month_name_and_numeric_dates() {
        assert_eq!(
            extract("December 25th at 2 PM").date.as_deref(),
            Some("december 25th")
        );
        assert_eq!(extract("December 25th at 2 PM").time.as_deref(), Some("2 pm"));
        assert_eq!(
            extract("book January 3, 2027 at 10:30").date.as_deref(),
            Some("january 3, 2027")
        );
        assert_eq!(extract("on 2026-11-02 please").date.as_deref(), Some("2026-11-02"));
        assert_eq!(extract("on 11/2 please").date.as_deref(), Some("11/2"));
    }

    #[test]
    fn test_time_formats() {
        assert_eq!(extract("at 2:30 p.m.").time.as_deref(), Some("2:30 pm"));
        assert_eq!(extract("at 14:15").time.as_deref(), Some("14:15"));
        assert_eq!(extract("around noon").time.as_deref(), Some("noon"));
        assert_eq!(extract("friday afternoon").time.as_deref(), Some("afternoon"));
        assert_eq!(extract("friday at 3").time.as_deref(), Some("3"));
    }

    #[test]
    fn test_now_defaults_date_to_today() {
        let e = extract("can we meet now?");
        assert_eq!(e.time.as_deref(), Some("now"));
        assert_eq!(e.date.as_deref(), Some("today"));

        let e = extract("tomorrow, not now");
        assert_eq!(e.date.as_deref(), Some("tomorrow"));
    }

    #[test]
    fn test_canonical_phrasing_is_stable() {
        let canonical = extract("tomorrow at 2:00 PM");
        assert_eq!(canonical.date.as_deref(), Some("tomorrow"));
        assert_eq!(canonical.time.as_deref(), Some("2:00 pm"));
    }

    #[test]
    fn test_explicit_durations() {
        assert_eq!(extract("a 45 minute call").duration_minutes, Some(45));
        assert_eq!(extract("for 2 hours").duration_minutes, Some(120));
        assert_eq!(extract("for 1.5 hours").duration_minutes, Some(90));
        assert_eq!(extract("a 30-min sync").duration_minutes, Some(30));
        assert_eq!(extract("half an hour works").duration_minutes, Some(30));
    }

    #[test]
    fn test_duration_defaults_by_type() {
        assert_eq!(extract("a quick meeting").duration_minutes, Some(30));
        assert_eq!(extract("a consultation").duration_minutes, Some(60));
        assert_eq!(extract("an advisory session").duration_minutes, Some(90));
        assert_eq!(extract("hello there").duration_minutes, None);
    }

    #[test]
    fn test_video_beats_phone() {
        let e = extract("a video call please");
        assert_eq!(e.meeting_type, Some(MeetingType::Video));
        let e = extract("just a phone call");
        assert_eq!(e.meeting_type, Some(MeetingType::Phone));
        let e = extract("let's do it in person");
        assert_eq!(e.meeting_type, Some(MeetingType::InPerson));
    }

    #[test]
    fn test_phone_number_implies_phone_meeting() {
        let e = extract("tomorrow at 3pm, 630-880-5488");
        assert_eq!(e.meeting_type, Some(MeetingType::Phone));
        let e = extract("tomorrow at 3pm");
        assert_eq!(e.meeting_type, None);
        assert_eq!(e.meeting_type_or_default(), MeetingType::Video);
    }

    #[test]
    fn test_phone_formats() {
        assert_eq!(extract("my number is 630 880 5488").phone.as_deref(), Some("6308805488"));
        assert_eq!(extract("call me at 630.880.5488").phone.as_deref(), Some("6308805488"));
        assert_eq!(extract("reach me on (630) 880-5488").phone.as_deref(), Some("6308805488"));
        assert_eq!(extract("+1 630-880-5488").phone.as_deref(), Some("6308805488"));
        assert_eq!(extract("phone: 6308805488").phone.as_deref(), Some("6308805488"));
    }

    #[test]
    fn test_phone_rejects_short_or_embedded_numbers() {
        assert_eq!(extract("call 555-1234").phone, None);
        assert_eq!(extract("order 123456789012345").phone, None);
        assert_eq!(extract("on 2026-11-02 at 14:00").phone, None);
    }

    #[test]
    fn test_email() {
        let e = extract("email me at Jane.Doe+cal@Example.com please");
        assert_eq!(e.email.as_deref(), Some("jane.doe+cal@example.com"));
        assert_eq!(extract("no email here @ all").email, None);
    }

    #[test]
    fn test_name_patterns() {
        assert_eq!(
            extract("My name is Jane Doe and my email is jane@example.com").name.as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(extract("Hi, I'm Pete.").name.as_deref(), Some("Pete"));
        assert_eq!(extract("I\u{2019}m sam").name.as_deref(), Some("Sam"));
        assert_eq!(extract("this is Maria Lopez, calling about a meeting").name.as_deref(), Some("Maria Lopez"));
        assert_eq!(extract("Betty here, need a slot").name.as_deref(), Some("Betty"));
    }

    #[test]
    fn test_name_rejects_implausible() {
        assert_eq!(extract("I'm looking to book a meeting").name, None);
        assert_eq!(extract("I am free tomorrow").name, None);
        assert_eq!(extract("this is urgent").name, None);
        assert_eq!(extract("my name is R2D2").name, None);
        assert_eq!(extract("i'm a b c d e").name, None);
    }

    #[test]
    fn test_bare_name_reply() {
        let extractor = EntityExtractor::new();
        assert_eq!(extractor.bare_name("Jane Doe").as_deref(), Some("Jane Doe"));
        assert_eq!(extractor.bare_name("  Sam.").as_deref(), Some("Sam"));
        assert_eq!(extractor.bare_name("Yes"), None);
        assert_eq!(extractor.bare_name("Thanks!"), None);
        assert_eq!(extractor.bare_name("Tomorrow"), None);
        assert_eq!(extractor.bare_name("jane doe"), None);
        assert_eq!(extractor.bare_name("Jane Doe, jane@example.com"), None);
    }

    #[test]
    fn test_every_date_mention_in_order() {
        assert_eq!(
            extract("move my wednesday meeting to next thursday at 3pm").dates,
            vec!["wednesday", "next thursday"]
        );
        assert_eq!(
            extract("not tomorrow, june 20th please").dates,
            vec!["tomorrow", "june 20th"]
        );
        assert!(extract("at 3pm").dates.is_empty());
    }

    #[test]
    fn test_meeting_id() {
        let e = extract("please cancel meeting id: 3f2a9c01-77");
        assert_eq!(e.meeting_id.as_deref(), Some("3f2a9c01-77"));
        assert_eq!(extract("cancel my meeting").meeting_id, None);
    }

    #[test]
    fn test_topic() {
        assert_eq!(extract("a quick chat").topic, Some(MeetingTopic::QuickChat));
        assert_eq!(extract("a consultation").topic, Some(MeetingTopic::Consultation));
        assert_eq!(extract("hello").topic, None);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract(""), ExtractedEntities::default());
    }
}
