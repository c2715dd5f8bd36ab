//! The multi-turn booking state machine: one utterance in, one reply out,
//! with the session carrying whatever is still pending between turns.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;

use crate::models::{
    BusyInterval, CalendarEvent, ChatMessage, ExtractedEntities, Intent, MeetingTopic, MeetingType, NewEvent,
    PendingOperation, Session, TimeSlot, UserProfile, WorkingHoursConfig,
};
use crate::models::profile::{MISSING_CONTACT, MISSING_NAME};
use crate::services::ai::{prompts, LlmProvider};
use crate::services::availability::AvailabilityEngine;
use crate::services::calendar::CalendarProvider;
use crate::services::clock::Clock;
use crate::services::conflicts::conflicts;
use crate::services::extraction::EntityExtractor;
use crate::services::formatting::CalendarFormatter;
use crate::services::intent::IntentClassifier;
use crate::services::past_guard::PastTimeGuard;
use crate::services::time_resolver::{localize, TimeResolver};
use crate::services::working_hours::WorkingHoursPolicy;

/// Longest utterance accepted in one turn.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Bounds on a meeting length the person asks for.
pub const MIN_DURATION_MINUTES: u32 = 15;
pub const MAX_DURATION_MINUTES: u32 = 480;

// Operation context keys.
const KEY_DATE: &str = "date";
const KEY_TIME: &str = "time";
const KEY_DURATION: &str = "duration_minutes";
const KEY_MEETING_TYPE: &str = "meeting_type";
const KEY_TOPIC: &str = "topic";
const KEY_USER_NAME: &str = "user_name";
const KEY_DATE_STRING: &str = "date_string";
const KEY_TIME_STRING: &str = "time_string";

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("I'm not quite sure which day you mean. Could you tell me, for example 'tomorrow' or 'next Tuesday at 2pm'?")]
    ExtractionAmbiguous,

    #[error("I'm having trouble understanding that date and time. Could you clarify? For example: 'next Tuesday at 2pm'")]
    TimeUnresolvable,

    #[error("{message}")]
    OutsideWorkingHours { message: String },

    #[error("Oops! 🕐 That time has already passed. Unless you've invented time travel (how cool would that be?!), let's find a future slot that works for you!")]
    TooFarInPast,

    #[error("Oops! That time overlaps with {}. How about we find a different slot?", .titles.join(", "))]
    SchedulingConflict { titles: Vec<String> },

    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("{}", missing_contact_text(.missing))]
    MissingContact { missing: Vec<&'static str> },

    #[error("{}", duration_text(.minutes))]
    DurationOutOfRange { minutes: u32 },

    #[error("I couldn't find any meetings matching that. Could you double-check the day and time?")]
    NoMatchingMeeting,
}

impl BookingError {
    /// Text safe to show the person chatting.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::CollaboratorUnavailable(_) => {
                "I'm having trouble reaching the calendar right now. Could you try again in a moment?"
                    .to_string()
            }
            other => other.to_string(),
        }
    }

    /// Errors after which nothing is left to resume.
    fn ends_operation(&self) -> bool {
        matches!(
            self,
            BookingError::CollaboratorUnavailable(_) | BookingError::NoMatchingMeeting
        )
    }
}

fn missing_contact_text(missing: &[&'static str]) -> String {
    let needs_name = missing.contains(&MISSING_NAME);
    let needs_contact = missing.contains(&MISSING_CONTACT);
    match (needs_name, needs_contact) {
        (true, true) => "I'd love to book that for you! First, may I have your name and either an email address or phone number?".to_string(),
        (true, false) => "I cannot book any appointment without your name. May I have your name?".to_string(),
        _ => "I cannot book any appointments without your contact information. I need either your email address or phone number. Which would you prefer to share?".to_string(),
    }
}

fn duration_text(minutes: &u32) -> String {
    if *minutes < MIN_DURATION_MINUTES {
        format!("Meetings need to be at least {MIN_DURATION_MINUTES} minutes long. How long would you like it to be?")
    } else {
        "Meetings can run at most 8 hours. How long would you like it to be?".to_string()
    }
}

/// Outcome of a calendar action. Final answers are sent as they are; the
/// rest is handed to the text generator as evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub is_final_answer: bool,
    pub text: String,
}

impl ActionResult {
    pub fn final_answer(text: impl Into<String>) -> Self {
        Self {
            is_final_answer: true,
            text: text.into(),
        }
    }

    pub fn evidence(text: impl Into<String>) -> Self {
        Self {
            is_final_answer: false,
            text: text.into(),
        }
    }
}

/// Derived from the session; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CollectingContact,
    Ready,
    AwaitingCancellationClarification,
}

impl Phase {
    pub fn of(session: &Session) -> Self {
        let state = &session.state;
        match state.pending_operation() {
            PendingOperation::None => Phase::Idle,
            PendingOperation::Cancellation if state.awaiting_clarification() => {
                Phase::AwaitingCancellationClarification
            }
            _ if !session.profile.has_minimum() => Phase::CollectingContact,
            _ => Phase::Ready,
        }
    }
}

/// Owner details and limits the machine needs besides working hours.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_email: String,
    pub default_duration_minutes: u32,
    pub slot_interval_minutes: u32,
    pub lookahead_days: i64,
}

/// Borrowed collaborators for one turn.
pub struct TurnContext<'a> {
    pub calendar: &'a dyn CalendarProvider,
    pub llm: &'a dyn LlmProvider,
    pub clock: &'a dyn Clock,
}

pub struct BookingStateMachine {
    extractor: EntityExtractor,
    classifier: IntentClassifier,
    resolver: TimeResolver,
    hours: WorkingHoursPolicy,
    availability: AvailabilityEngine,
    guard: PastTimeGuard,
    formatter: CalendarFormatter,
    settings: BookingSettings,
}

impl BookingStateMachine {
    pub fn new(working_hours: WorkingHoursConfig, settings: BookingSettings) -> Self {
        let timezone = working_hours.timezone;
        Self {
            extractor: EntityExtractor::new(),
            classifier: IntentClassifier::new(&settings.owner_name),
            resolver: TimeResolver::new(),
            hours: WorkingHoursPolicy::new(working_hours, settings.owner_name.clone()),
            availability: AvailabilityEngine::new(settings.slot_interval_minutes),
            guard: PastTimeGuard::new(),
            formatter: CalendarFormatter::new(timezone),
            settings,
        }
    }

    /// Processes one utterance against `session` and returns the reply. The
    /// session's profile, pending operation and history are updated in place.
    pub async fn handle_turn(
        &self,
        session: &mut Session,
        utterance: &str,
        ctx: &TurnContext<'_>,
    ) -> String {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return prompts::EMPTY_MESSAGE_REPLY.to_string();
        }
        if utterance.chars().count() > MAX_MESSAGE_CHARS {
            return prompts::LONG_MESSAGE_REPLY.to_string();
        }

        let now = ctx.clock.now().with_timezone(&self.hours.timezone());
        let mut entities = self.extractor.extract(utterance);
        if entities.name.is_none() && awaiting_name(session) {
            entities.name = self.extractor.bare_name(utterance);
        }
        let updated = session.profile.merge(&entities);
        if !updated.is_empty() {
            tracing::info!(
                conversation_id = %session.conversation_id,
                fields = ?updated,
                "profile updated"
            );
        }

        let intent = self.classifier.classify(utterance, &session.state);
        tracing::info!(
            conversation_id = %session.conversation_id,
            intent = ?intent,
            phase = ?Phase::of(session),
            "processing message"
        );

        session.history = session.history.with_message(ChatMessage::user(utterance));

        let outcome = self
            .dispatch(session, intent, &entities, !updated.is_empty(), now, ctx)
            .await;
        let action = match outcome {
            Ok(action) => action,
            Err(e) => {
                match &e {
                    BookingError::CollaboratorUnavailable(detail) => tracing::error!(
                        conversation_id = %session.conversation_id,
                        error = %detail,
                        "collaborator call failed"
                    ),
                    other => tracing::info!(
                        conversation_id = %session.conversation_id,
                        outcome = ?other,
                        "operation not completed"
                    ),
                }
                if e.ends_operation() {
                    session.state.clear();
                }
                Some(ActionResult::final_answer(e.user_message()))
            }
        };

        let mut reply = match action {
            Some(result) if result.is_final_answer => result.text,
            Some(result) => self.generate(session, Some(&result.text), now, ctx).await,
            None => self.generate(session, None, now, ctx).await,
        };

        if !session.started {
            session.started = true;
            reply = format!("{}\n\n{reply}", prompts::greeting(&self.settings.owner_name));
        }

        session.history = session.history.with_message(ChatMessage::assistant(&reply));
        reply
    }

    /// `None` means there is nothing to act on and the generator answers freely.
    async fn dispatch(
        &self,
        session: &mut Session,
        intent: Intent,
        entities: &ExtractedEntities,
        profile_updated: bool,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<Option<ActionResult>, BookingError> {
        // A rejected past time leaves the conversation as it was.
        let before = session.state.clone();
        let result = self
            .act(session, intent, entities, profile_updated, now, ctx)
            .await;
        if matches!(result, Err(BookingError::TooFarInPast)) {
            session.state = before;
        }
        result
    }

    async fn act(
        &self,
        session: &mut Session,
        intent: Intent,
        entities: &ExtractedEntities,
        profile_updated: bool,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<Option<ActionResult>, BookingError> {
        let owner = &self.settings.owner_name;
        let result = match intent {
            Intent::Reset => {
                session.state.clear();
                ActionResult::final_answer(
                    "No problem, let's start fresh! What can I help you with? 😊",
                )
            }
            Intent::Help => {
                ActionResult::final_answer(prompts::help_text(owner, &self.hours.describe(now)))
            }
            Intent::OwnerContact => ActionResult::final_answer(prompts::owner_contact(
                owner,
                &self.settings.owner_phone,
                &self.settings.owner_email,
            )),
            Intent::CreateBooking => self.book(session, entities, now, ctx).await?,
            Intent::CheckAvailability => {
                self.check_availability(session, entities, now, ctx).await?
            }
            Intent::CancelBooking => self.cancel(session, entities, now, ctx).await?,
            Intent::RescheduleBooking => self.reschedule(session, entities, now, ctx).await?,
            Intent::ListUpcoming => self.list_upcoming(session, now, ctx).await?,
            Intent::Unhandled => {
                let has_news = entities.has_schedule_info()
                    || entities.duration_minutes.is_some()
                    || profile_updated;
                match session.state.pending_operation() {
                    PendingOperation::Booking if has_news => {
                        self.book(session, entities, now, ctx).await?
                    }
                    PendingOperation::Booking => {
                        ActionResult::evidence(self.pending_booking_summary(session))
                    }
                    PendingOperation::Cancellation if has_news || entities.meeting_id.is_some() => {
                        self.cancel(session, entities, now, ctx).await?
                    }
                    PendingOperation::Cancellation => ActionResult::final_answer(
                        "Which meeting would you like to cancel? You can tell me the day and time, or say \"start over\".",
                    ),
                    PendingOperation::None => return Ok(None),
                }
            }
        };
        Ok(Some(result))
    }

    async fn book(
        &self,
        session: &mut Session,
        entities: &ExtractedEntities,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<ActionResult, BookingError> {
        session.state.begin(PendingOperation::Booking);
        store_booking_fragments(session, entities);
        let duration = self.requested_duration(session)?;

        let date = session.state.get(KEY_DATE).map(str::to_string);
        let time = session.state.get(KEY_TIME).map(str::to_string);

        let (date, time) = match (date, time) {
            (None, None) => {
                return Ok(ActionResult::evidence(format!(
                    "The person wants to book time with {} but has not said when. Ask which day and time suit them.",
                    self.settings.owner_name
                )));
            }
            (Some(date), None) => {
                let Some(day) = self.resolver.resolve_date(&date, now) else {
                    session.state.remove(KEY_DATE);
                    return Err(BookingError::TimeUnresolvable);
                };
                return self.slots_reply(day, duration, now, ctx).await;
            }
            (date, Some(time)) => (date, time),
        };

        let Some(start) = self.resolver.resolve(date.as_deref(), Some(&time), now) else {
            session.state.remove(KEY_DATE);
            session.state.remove(KEY_TIME);
            return Err(BookingError::TimeUnresolvable);
        };

        self.guard.check(start, now)?;
        if let Err(e) = self.hours.check(start) {
            session.state.remove(KEY_TIME);
            return Err(e);
        }

        let missing = session.profile.missing_required();
        if !missing.is_empty() {
            return Err(BookingError::MissingContact { missing });
        }

        let slot = TimeSlot::starting_at(start, duration).ok_or(BookingError::TimeUnresolvable)?;
        let busy = self.busy_around(&slot, ctx).await?;

        let clashes = conflicts(&slot, &busy, None);
        if !clashes.is_empty() {
            let titles = clashes.iter().map(|b| b.summary.clone()).collect();
            session.state.remove(KEY_TIME);
            let err = BookingError::SchedulingConflict { titles };
            let (window_start, window_end) = self.hours.hours_for(start.date_naive());
            let alternatives = self.availability.available_slots(
                start.date_naive(),
                duration,
                &busy,
                window_start,
                window_end,
                now,
            );
            if alternatives.is_empty() {
                return Err(err);
            }
            return Ok(ActionResult::final_answer(format!(
                "{} Open times that day: {}.",
                err.user_message(),
                self.formatter.format_slots(&alternatives)
            )));
        }

        let meeting_type = session
            .state
            .get(KEY_MEETING_TYPE)
            .and_then(MeetingType::parse)
            .unwrap_or(MeetingType::Video);
        let topic = session.state.get(KEY_TOPIC).and_then(MeetingTopic::parse);
        let event = self.new_event(&session.profile, slot, meeting_type, topic);
        let summary = event.summary.clone();

        let event_id = ctx
            .calendar
            .create(event)
            .await
            .map_err(|e| BookingError::CollaboratorUnavailable(format!("{e:#}")))?;

        tracing::info!(
            conversation_id = %session.conversation_id,
            event_id = %event_id,
            start = %slot.start(),
            meeting_type = meeting_type.as_str(),
            "booking created"
        );
        session.state.clear();

        Ok(ActionResult::final_answer(self.confirmation(
            &session.profile,
            &summary,
            &event_id,
            slot,
            meeting_type,
            now,
        )))
    }

    async fn check_availability(
        &self,
        session: &mut Session,
        entities: &ExtractedEntities,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<ActionResult, BookingError> {
        session.state.begin(PendingOperation::Booking);
        store_booking_fragments(session, entities);

        let date = session
            .state
            .get(KEY_DATE)
            .map(str::to_string)
            .ok_or(BookingError::ExtractionAmbiguous)?;
        let Some(day) = self.resolver.resolve_date(&date, now) else {
            session.state.remove(KEY_DATE);
            return Err(BookingError::TimeUnresolvable);
        };

        if entities.time.is_some() {
            // A specific time was asked about: answer through the booking path.
            return self.book(session, entities, now, ctx).await;
        }
        let duration = self.requested_duration(session)?;
        self.slots_reply(day, duration, now, ctx).await
    }

    async fn slots_reply(
        &self,
        day: NaiveDate,
        duration: u32,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<ActionResult, BookingError> {
        if day < now.date_naive() {
            return Err(BookingError::TooFarInPast);
        }

        let (window_start, window_end) = self.hours.hours_for(day);
        let (day_start, day_end) =
            day_bounds(now.timezone(), day).ok_or(BookingError::TimeUnresolvable)?;

        let busy = ctx
            .calendar
            .list_busy(day_start, day_end)
            .await
            .map_err(|e| BookingError::CollaboratorUnavailable(format!("{e:#}")))?;
        let slots = self
            .availability
            .available_slots(day, duration, &busy, window_start, window_end, now);

        let when = day_label(day, now);
        let length = self.formatter.format_duration(i64::from(duration));
        if slots.is_empty() {
            return Ok(ActionResult::final_answer(format!(
                "Unfortunately, I don't see any available {length} slots {when}. Would you like to try a different day?"
            )));
        }
        Ok(ActionResult::final_answer(format!(
            "Great news! Here are the available {length} slots {when}: {}. Which time works best for you?",
            self.formatter.format_slots(&slots)
        )))
    }

    async fn cancel(
        &self,
        session: &mut Session,
        entities: &ExtractedEntities,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<ActionResult, BookingError> {
        if let Some(id) = &entities.meeting_id {
            let event = ctx
                .calendar
                .get(id)
                .await
                .map_err(|e| BookingError::CollaboratorUnavailable(format!("{e:#}")))?
                .ok_or(BookingError::NoMatchingMeeting)?;
            return self.delete_event(session, &event, now, ctx).await;
        }

        session.state.begin(PendingOperation::Cancellation);
        if let Some(name) = session.profile.name.clone().or_else(|| entities.name.clone()) {
            session.state.set(KEY_USER_NAME, name);
        }
        if let Some(date) = &entities.date {
            session.state.set(KEY_DATE_STRING, date.clone());
        }
        if let Some(time) = &entities.time {
            session.state.set(KEY_TIME_STRING, time.clone());
        }

        let name = session.state.get(KEY_USER_NAME).map(str::to_string);
        let profile = &session.profile;
        if name.is_none() && profile.email.is_none() && profile.phone.is_none() {
            return Ok(ActionResult::final_answer(
                "I can help with that! What name was the meeting booked under?",
            ));
        }

        let mut matches = self.find_user_events(session, name.as_deref(), now, ctx).await?;

        if let Some(date) = session.state.get(KEY_DATE_STRING) {
            if let Some(day) = self.resolver.resolve_date(date, now) {
                matches.retain(|e| e.start.date_naive() == day);
            }
        }
        if let Some(time) = session.state.get(KEY_TIME_STRING) {
            if let Some(t) = self.resolver.parse_time_of_day(time, now) {
                matches.retain(|e| e.start.time() == t);
            }
        }

        match matches.as_slice() {
            [] => Err(BookingError::NoMatchingMeeting),
            [event] => {
                let event = event.clone();
                self.delete_event(session, &event, now, ctx).await
            }
            several => {
                session.state.set_awaiting_clarification(true);
                tracing::info!(
                    conversation_id = %session.conversation_id,
                    candidates = several.len(),
                    "cancellation needs clarification"
                );
                Ok(ActionResult::final_answer(format!(
                    "I found {} meetings that could be yours:\n{}\n\nWhich one would you like to cancel? Just tell me the day and time.",
                    several.len(),
                    self.formatter.format_event_choices(several, now)
                )))
            }
        }
    }

    async fn delete_event(
        &self,
        session: &mut Session,
        event: &CalendarEvent,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<ActionResult, BookingError> {
        let deleted = ctx
            .calendar
            .delete(&event.id)
            .await
            .map_err(|e| BookingError::CollaboratorUnavailable(format!("{e:#}")))?;
        if !deleted {
            return Err(BookingError::NoMatchingMeeting);
        }

        tracing::info!(
            conversation_id = %session.conversation_id,
            event_id = %event.id,
            "booking cancelled"
        );
        session.state.clear();
        Ok(ActionResult::final_answer(format!(
            "All done! I've cancelled {} ({}). If you'd like to find a new time, just let me know!",
            event.summary,
            self.formatter.format_datetime(event.start, now)
        )))
    }

    /// Moves one of the person's meetings. With two dates in the utterance
    /// the first picks the meeting and the last is where it goes.
    async fn reschedule(
        &self,
        session: &mut Session,
        entities: &ExtractedEntities,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<ActionResult, BookingError> {
        let (from_date, to_date) = match entities.dates.as_slice() {
            [from, .., to] => (Some(from.as_str()), Some(to.as_str())),
            [only] => (None, Some(only.as_str())),
            [] => (None, None),
        };

        let target = match &entities.meeting_id {
            Some(id) => ctx
                .calendar
                .get(id)
                .await
                .map_err(|e| BookingError::CollaboratorUnavailable(format!("{e:#}")))?
                .ok_or(BookingError::NoMatchingMeeting)?,
            None => {
                let profile = &session.profile;
                if profile.name.is_none() && profile.email.is_none() && profile.phone.is_none() {
                    return Ok(ActionResult::final_answer(
                        "Happy to help you move it! What name was the meeting booked under?",
                    ));
                }
                let name = profile.name.clone();
                let mut candidates = self
                    .find_user_events(session, name.as_deref(), now, ctx)
                    .await?;
                if let Some(day) = from_date.and_then(|d| self.resolver.resolve_date(d, now)) {
                    candidates.retain(|e| e.start.date_naive() == day);
                }
                match candidates.as_slice() {
                    [] => return Err(BookingError::NoMatchingMeeting),
                    [event] => event.clone(),
                    several => {
                        return Ok(ActionResult::final_answer(format!(
                            "I found {} meetings that could be yours:\n{}\n\nWhich one should I move? Tell me its day and the new time, for example 'move my Tuesday meeting to Thursday at 3pm'.",
                            several.len(),
                            self.formatter.format_event_choices(several, now)
                        )));
                    }
                }
            }
        };

        let duration = u32::try_from(target.duration_minutes())
            .unwrap_or(self.settings.default_duration_minutes);
        let tz = now.timezone();

        let start = match (to_date, entities.time.as_deref()) {
            (None, None) => {
                return Ok(ActionResult::final_answer(format!(
                    "Sure! When would you like to move {} ({}) to? For example: 'Thursday at 10am'.",
                    target.summary,
                    self.formatter.format_datetime(target.start, now)
                )));
            }
            (Some(date), None) => {
                let day = self
                    .resolver
                    .resolve_date(date, now)
                    .ok_or(BookingError::TimeUnresolvable)?;
                return self.reschedule_options(&target, day, duration, now, ctx).await;
            }
            // Only a time: keep the meeting's day.
            (None, Some(time)) => {
                let t = self
                    .resolver
                    .parse_time_of_day(time, now)
                    .ok_or(BookingError::TimeUnresolvable)?;
                localize(tz, target.start.date_naive().and_time(t))
                    .ok_or(BookingError::TimeUnresolvable)?
            }
            (Some(date), Some(time)) => self
                .resolver
                .resolve(Some(date), Some(time), now)
                .ok_or(BookingError::TimeUnresolvable)?,
        };
        self.guard.check(start, now)?;
        self.hours.check(start)?;

        let slot = TimeSlot::starting_at(start, duration).ok_or(BookingError::TimeUnresolvable)?;
        let busy = self.busy_around(&slot, ctx).await?;
        let clashes = conflicts(&slot, &busy, Some(&target.id));
        if !clashes.is_empty() {
            return Err(BookingError::SchedulingConflict {
                titles: clashes.iter().map(|b| b.summary.clone()).collect(),
            });
        }

        let moved = ctx
            .calendar
            .update(&target.id, slot.start(), slot.end())
            .await
            .map_err(|e| BookingError::CollaboratorUnavailable(format!("{e:#}")))?;
        if !moved {
            return Err(BookingError::NoMatchingMeeting);
        }

        tracing::info!(
            conversation_id = %session.conversation_id,
            event_id = %target.id,
            start = %slot.start(),
            "booking rescheduled"
        );
        Ok(ActionResult::final_answer(format!(
            "Perfect! I've rescheduled your appointment from {} to {}. All set! 🎉",
            self.formatter.format_datetime(target.start, now),
            self.formatter.format_datetime(slot.start(), now)
        )))
    }

    /// Open times on `day` a meeting could move to. Its own slot counts as free.
    async fn reschedule_options(
        &self,
        target: &CalendarEvent,
        day: NaiveDate,
        duration: u32,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<ActionResult, BookingError> {
        if day < now.date_naive() {
            return Err(BookingError::TooFarInPast);
        }
        let (day_start, day_end) =
            day_bounds(now.timezone(), day).ok_or(BookingError::TimeUnresolvable)?;
        let mut busy = ctx
            .calendar
            .list_busy(day_start, day_end)
            .await
            .map_err(|e| BookingError::CollaboratorUnavailable(format!("{e:#}")))?;
        busy.retain(|b| b.source_event_id != target.id);

        let (window_start, window_end) = self.hours.hours_for(day);
        let slots = self
            .availability
            .available_slots(day, duration, &busy, window_start, window_end, now);
        let when = day_label(day, now);
        if slots.is_empty() {
            return Ok(ActionResult::final_answer(format!(
                "Unfortunately, I don't see a free slot {when} for {}. Would another day work?",
                target.summary
            )));
        }
        Ok(ActionResult::final_answer(format!(
            "Here are the open times {when} for {} ({}): {}. Which one works best? For example: 'move it to {} at {}'.",
            target.summary,
            self.formatter.format_datetime(target.start, now),
            self.formatter.format_slots(&slots),
            day_phrase(day, now),
            self.formatter.format_time(slots[0].start()),
        )))
    }

    async fn list_upcoming(
        &self,
        session: &Session,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<ActionResult, BookingError> {
        let profile = &session.profile;
        if profile.is_empty() {
            return Ok(ActionResult::final_answer(
                "I can look that up for you! What name did you book under?",
            ));
        }

        let events = self
            .find_user_events(session, profile.name.as_deref(), now, ctx)
            .await?;
        let days = self.settings.lookahead_days;
        let period = format!("next {days} day{}", if days == 1 { "" } else { "s" });

        if events.is_empty() {
            return Ok(ActionResult::evidence(format!(
                "Nothing is booked with {} for this person in the {period}.",
                self.settings.owner_name
            )));
        }
        Ok(ActionResult::evidence(format!(
            "Here's what's coming up in the {period}:\n\n{}",
            self.formatter.format_event_list(&events, now)
        )))
    }

    /// Upcoming events within the lookahead window that belong to the person.
    async fn find_user_events(
        &self,
        session: &Session,
        name: Option<&str>,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> Result<Vec<CalendarEvent>, BookingError> {
        let until = now + Duration::days(self.settings.lookahead_days);
        let events = ctx
            .calendar
            .list_events(now, until)
            .await
            .map_err(|e| BookingError::CollaboratorUnavailable(format!("{e:#}")))?;
        let profile = &session.profile;
        Ok(events
            .into_iter()
            .filter(|e| e.involves(name, profile.email.as_deref(), profile.phone.as_deref()))
            .collect())
    }

    async fn generate(
        &self,
        session: &Session,
        evidence: Option<&str>,
        now: DateTime<Tz>,
        ctx: &TurnContext<'_>,
    ) -> String {
        let hours = self.hours.describe(now);
        let now_text = now.format("%A, %B %-d, %Y %-I:%M %p %Z").to_string();
        let system = prompts::system_prompt(&prompts::PromptContext {
            owner_name: &self.settings.owner_name,
            business_hours: &hours,
            now: &now_text,
            profile: &session.profile,
            evidence,
        });

        match ctx.llm.chat(&system, session.history.messages()).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => evidence.unwrap_or(prompts::FALLBACK_REPLY).to_string(),
            Err(e) => {
                tracing::warn!(
                    conversation_id = %session.conversation_id,
                    error = %e,
                    "text generation failed, using fallback"
                );
                evidence.unwrap_or(prompts::FALLBACK_REPLY).to_string()
            }
        }
    }

    /// The length asked for, or the configured default. An out-of-range
    /// request is dropped from the context so the next answer replaces it.
    fn requested_duration(&self, session: &mut Session) -> Result<u32, BookingError> {
        let Some(minutes) = session
            .state
            .get(KEY_DURATION)
            .and_then(|d| d.parse::<u32>().ok())
        else {
            return Ok(self.settings.default_duration_minutes);
        };
        if (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
            return Ok(minutes);
        }
        session.state.remove(KEY_DURATION);
        Err(BookingError::DurationOutOfRange { minutes })
    }

    /// Busy time from midnight of the slot's first day until the later of
    /// that day's end and the slot's end.
    async fn busy_around(
        &self,
        slot: &TimeSlot,
        ctx: &TurnContext<'_>,
    ) -> Result<Vec<BusyInterval>, BookingError> {
        let start = slot.start();
        let (day_start, day_end) =
            day_bounds(start.timezone(), start.date_naive()).ok_or(BookingError::TimeUnresolvable)?;
        ctx.calendar
            .list_busy(day_start, day_end.max(slot.end()))
            .await
            .map_err(|e| BookingError::CollaboratorUnavailable(format!("{e:#}")))
    }

    fn new_event(
        &self,
        profile: &UserProfile,
        slot: TimeSlot,
        meeting_type: MeetingType,
        topic: Option<MeetingTopic>,
    ) -> NewEvent {
        let guest = profile.name.as_deref().unwrap_or("Guest");
        let title = topic.map_or("Meeting", |t| t.title());

        let mut description = vec![format!("Meeting type: {}", meeting_type.label())];
        description.push(format!("Name: {guest}"));
        if let Some(email) = &profile.email {
            description.push(format!("Email: {email}"));
        }
        if let Some(phone) = &profile.phone {
            description.push(format!("Phone: {phone}"));
        }
        description.push("Booked via ChatCal".to_string());

        NewEvent {
            summary: format!("{title} with {guest}"),
            description: Some(description.join("\n")),
            start: slot.start(),
            end: slot.end(),
            attendees: profile.email.iter().cloned().collect(),
            video_requested: meeting_type == MeetingType::Video,
        }
    }

    fn confirmation(
        &self,
        profile: &UserProfile,
        summary: &str,
        event_id: &str,
        slot: TimeSlot,
        meeting_type: MeetingType,
        now: DateTime<Tz>,
    ) -> String {
        let mut text = format!(
            "Fantastic! 🎉 Your {} ({summary}) is all set for {} ({}).",
            meeting_type.label(),
            self.formatter.format_datetime(slot.start(), now),
            self.formatter.format_duration(slot.duration_minutes()),
        );
        match meeting_type {
            MeetingType::Video => text.push_str(
                "\n\n🎥 A Google Meet conference has been set up; the link will be in your calendar invitation.",
            ),
            MeetingType::Phone => {
                if let Some(phone) = &profile.phone {
                    text.push_str(&format!(
                        "\n\n📞 {} will call you at {phone}.",
                        self.settings.owner_name
                    ));
                }
            }
            MeetingType::InPerson => {}
        }
        if profile.email.is_none() {
            text.push_str(
                "\n\n📧 If you'd like a calendar invitation by email, just share your email address.",
            );
        }
        text.push_str(&format!("\n\nMeeting id: {event_id}"));
        text
    }

    fn pending_booking_summary(&self, session: &Session) -> String {
        let state = &session.state;
        let mut parts = vec!["A booking is in progress.".to_string()];
        if let Some(date) = state.get(KEY_DATE) {
            parts.push(format!("Requested day: {date}."));
        }
        if let Some(time) = state.get(KEY_TIME) {
            parts.push(format!("Requested time: {time}."));
        }
        let missing = session.profile.missing_required();
        if !missing.is_empty() {
            parts.push(format!("Still needed from the person: {}.", missing.join(", ")));
        }
        if state.get(KEY_DATE).is_none() || state.get(KEY_TIME).is_none() {
            parts.push("Ask for the day and time if they are missing.".to_string());
        }
        parts.join(" ")
    }
}

/// Newly extracted values replace older ones so corrections take effect.
fn store_booking_fragments(session: &mut Session, entities: &ExtractedEntities) {
    let state = &mut session.state;
    if let Some(date) = &entities.date {
        state.set(KEY_DATE, date.clone());
    }
    if let Some(time) = &entities.time {
        state.set(KEY_TIME, time.clone());
    }
    if let Some(duration) = entities.duration_minutes {
        state.set(KEY_DURATION, duration.to_string());
    }
    if let Some(kind) = entities.meeting_type {
        state.set(KEY_MEETING_TYPE, kind.as_str());
    }
    if let Some(topic) = entities.topic {
        state.set(KEY_TOPIC, topic.as_str());
    }
}

/// Midnight to midnight of `day`.
fn day_bounds(tz: Tz, day: NaiveDate) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
    let start = localize(tz, day.and_time(NaiveTime::MIN))?;
    let end = localize(tz, (day + Duration::days(1)).and_time(NaiveTime::MIN))?;
    Some((start, end))
}

/// True while a cancellation is waiting on the name it was booked under.
fn awaiting_name(session: &Session) -> bool {
    session.state.pending_operation() == PendingOperation::Cancellation
        && session.profile.name.is_none()
        && session.state.get(KEY_USER_NAME).is_none()
}

/// How a person would name `day` in a follow-up: "tomorrow", "Thursday".
fn day_phrase(day: NaiveDate, now: DateTime<Tz>) -> String {
    match (day - now.date_naive()).num_days() {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        2..=6 => day.format("%A").to_string(),
        _ => day.format("%B %-d").to_string(),
    }
}

fn day_label(day: NaiveDate, now: DateTime<Tz>) -> String {
    let phrase = day_phrase(day, now);
    match (day - now.date_naive()).num_days() {
        0 | 1 => phrase,
        _ => format!("on {phrase}"),
    }
}
