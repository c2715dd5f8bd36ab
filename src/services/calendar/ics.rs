use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::CalendarEvent;

/// Escapes text per RFC 5545 §3.3.11.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

fn utc_stamp(dt: DateTime<Tz>) -> String {
    dt.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn generate_ics(event: &CalendarEvent, organizer_name: &str, now: DateTime<Utc>) -> String {
    let uid = format!("{}@chatcal", event.id);
    let description = event
        .description
        .as_deref()
        .map(escape)
        .unwrap_or_else(|| format!("Meeting with {}", escape(organizer_name)));

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//ChatCal//Scheduling Assistant//EN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{uid}"),
        format!("DTSTAMP:{}", now.format("%Y%m%dT%H%M%SZ")),
        format!("DTSTART:{}", utc_stamp(event.start)),
        format!("DTEND:{}", utc_stamp(event.end)),
        format!("SUMMARY:{}", escape(&event.summary)),
        format!("DESCRIPTION:{description}"),
    ];
    for attendee in &event.attendees {
        lines.push(format!("ATTENDEE;RSVP=TRUE:mailto:{attendee}"));
    }
    if let Some(link) = &event.video_link {
        lines.push(format!("URL:{link}"));
    }
    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut ics = lines.join("\r\n");
    ics.push_str("\r\n");
    ics
}
