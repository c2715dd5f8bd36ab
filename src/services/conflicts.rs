use crate::models::{BusyInterval, TimeSlot};

/// Busy intervals that collide with `proposed`, ignoring the event being
/// moved (if any).
pub fn conflicts<'a>(
    proposed: &TimeSlot,
    busy: &'a [BusyInterval],
    exclude_id: Option<&str>,
) -> Vec<&'a BusyInterval> {
    busy.iter()
        .filter(|b| exclude_id != Some(b.source_event_id.as_str()))
        .filter(|b| proposed.overlaps(b))
        .collect()
}
