use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::UserProfile;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PendingOperation {
    #[default]
    None,
    Booking,
    Cancellation,
}

impl PendingOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingOperation::None => "none",
            PendingOperation::Booking => "booking",
            PendingOperation::Cancellation => "cancellation",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "booking" => PendingOperation::Booking,
            "cancellation" => PendingOperation::Cancellation,
            _ => PendingOperation::None,
        }
    }
}

/// Where a multi-turn operation stands. `awaiting_clarification` is only ever
/// set together with a pending operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pending_operation: PendingOperation,
    operation_context: BTreeMap<String, String>,
    awaiting_clarification: bool,
}

impl ConversationState {
    pub fn pending_operation(&self) -> PendingOperation {
        self.pending_operation
    }

    pub fn awaiting_clarification(&self) -> bool {
        self.awaiting_clarification
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.operation_context
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.operation_context.get(key).map(String::as_str)
    }

    pub fn is_idle(&self) -> bool {
        self.pending_operation == PendingOperation::None
    }

    /// Starts (or continues) an operation. Switching to a different operation
    /// discards the previous one's context.
    pub fn begin(&mut self, operation: PendingOperation) {
        if operation == PendingOperation::None {
            self.clear();
            return;
        }
        if self.pending_operation != operation {
            self.operation_context.clear();
            self.awaiting_clarification = false;
        }
        self.pending_operation = operation;
    }

    /// Stores a context fragment. Ignored while idle.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        if self.is_idle() {
            return;
        }
        self.operation_context.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.operation_context.remove(key);
    }

    pub fn set_awaiting_clarification(&mut self, awaiting: bool) {
        self.awaiting_clarification = awaiting && !self.is_idle();
    }

    pub fn clear(&mut self) {
        self.pending_operation = PendingOperation::None;
        self.operation_context.clear();
        self.awaiting_clarification = false;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Bounded, ordered transcript. Appending returns a new history; the oldest
/// messages fall off once `limit` is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    limit: usize,
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_message(&self, message: ChatMessage) -> Self {
        let mut messages = self.messages.clone();
        messages.push(message);
        let overflow = messages.len().saturating_sub(self.limit);
        messages.drain(..overflow);
        Self {
            limit: self.limit,
            messages,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Per-conversation state the transport layer persists between turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub conversation_id: String,
    pub profile: UserProfile,
    pub state: ConversationState,
    pub history: ConversationHistory,
    #[serde(default)]
    pub started: bool,
}

impl Session {
    pub fn new(conversation_id: impl Into<String>, history_limit: usize) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            profile: UserProfile::default(),
            state: ConversationState::default(),
            history: ConversationHistory::new(history_limit),
            started: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_awaiting_requires_pending_operation() {
        let mut state = ConversationState::default();
        state.set_awaiting_clarification(true);
        assert!(!state.awaiting_clarification());

        state.begin(PendingOperation::Cancellation);
        state.set_awaiting_clarification(true);
        assert!(state.awaiting_clarification());

        state.clear();
        assert!(state.is_idle());
        assert!(!state.awaiting_clarification());
        assert!(state.context().is_empty());
    }

    #[test]
    fn test_switching_operation_drops_context() {
        let mut state = ConversationState::default();
        state.begin(PendingOperation::Booking);
        state.set("date", "tomorrow");
        state.begin(PendingOperation::Booking);
        assert_eq!(state.get("date"), Some("tomorrow"));

        state.begin(PendingOperation::Cancellation);
        assert_eq!(state.get("date"), None);
    }

    #[test]
    fn test_context_ignored_while_idle() {
        let mut state = ConversationState::default();
        state.set("date", "tomorrow");
        assert!(state.context().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let history = (0..5).fold(ConversationHistory::new(3), |h, i| {
            h.with_message(ChatMessage::user(format!("m{i}")))
        });
        let contents: Vec<&str> = history
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_history_append_leaves_original_untouched() {
        let original = ConversationHistory::new(10);
        let extended = original.with_message(ChatMessage::assistant("hi"));
        assert!(original.is_empty());
        assert_eq!(extended.len(), 1);
    }

    #[test]
    fn test_session_roundtrips_through_json() {
        let mut session = Session::new("abc", 20);
        session.state.begin(PendingOperation::Cancellation);
        session.state.set("user_name", "Jane Doe");
        session.state.set_awaiting_clarification(true);

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn test_pending_operation_parse() {
        assert_eq!(PendingOperation::parse("booking"), PendingOperation::Booking);
        assert_eq!(PendingOperation::parse("garbage"), PendingOperation::None);
    }
}
