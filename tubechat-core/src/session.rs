use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque bearer token identifying one live session.
///
/// Anyone holding the id can read and extend the conversation, so it is
/// always drawn from a random v4 UUID and never derived from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Who contributed a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "AI")]
    Ai,
}

/// One line of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "sender")]
    pub speaker: Speaker,
    #[serde(rename = "message")]
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(speaker: Speaker, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp,
        }
    }
}

/// A bounded conversation about one opaque context payload.
///
/// Entries are only ever appended in user/AI pairs, so `message_count` is
/// even and always equals `history.len()`.
#[derive(Debug)]
pub struct Session<C> {
    id: SessionId,
    context: Arc<C>,
    history: Vec<HistoryEntry>,
    message_count: usize,
    max_messages: usize,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
}

// Manual impl: cloning a snapshot must not require `C: Clone`.
impl<C> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            context: Arc::clone(&self.context),
            history: self.history.clone(),
            message_count: self.message_count,
            max_messages: self.max_messages,
            created_at: self.created_at,
            last_active_at: self.last_active_at,
        }
    }
}

impl<C> Session<C> {
    pub(crate) fn new(id: SessionId, context: C, max_messages: usize, now: DateTime<Utc>) -> Self {
        Self {
            id,
            context: Arc::new(context),
            history: Vec::new(),
            message_count: 0,
            max_messages,
            created_at: now,
            last_active_at: now,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    /// Append a user message and its answer, then mark the session active.
    /// Quota checks belong to the caller.
    pub(crate) fn push_exchange(&mut self, user_text: String, response_text: String, now: DateTime<Utc>) {
        self.history.push(HistoryEntry::new(Speaker::User, user_text, now));
        self.history.push(HistoryEntry::new(Speaker::Ai, response_text, now));
        self.message_count += 2;
        self.last_active_at = now;
        debug_assert_eq!(self.message_count, self.history.len());
    }

    pub(crate) fn take_history(&mut self) -> Vec<HistoryEntry> {
        std::mem::take(&mut self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_round_trips_through_text() {
        let id = SessionId::generate();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-session".parse::<SessionId>().is_err());
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn history_entry_uses_wire_names() {
        let entry = HistoryEntry::new(Speaker::Ai, "hello", Utc::now());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sender"], "AI");
        assert_eq!(json["message"], "hello");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn push_exchange_keeps_count_in_step_with_history() {
        let start = Utc::now();
        let mut session = Session::new(SessionId::generate(), (), 4, start);
        let later = start + chrono::Duration::seconds(5);

        session.push_exchange("hi".into(), "hello".into(), later);

        assert_eq!(session.message_count(), 2);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].speaker, Speaker::User);
        assert_eq!(session.history()[1].speaker, Speaker::Ai);
        assert_eq!(session.last_active_at(), later);
        assert_eq!(session.created_at(), start);
    }
}
