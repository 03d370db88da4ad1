use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GhostwriterError, Result};

/// Length of the "current conversation" window: five minutes.
pub const CONVERSATION_WINDOW_MS: i64 = 5 * 60 * 1000;

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Unix timestamp in milliseconds since epoch.
///
/// Serialized as a bare integer so it matches the wire format of the
/// messaging surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }

    /// This timestamp moved back by `millis`, saturating at `i64::MIN`.
    pub fn minus_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_sub(millis))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Inbound messages
// =============================================================================

/// A message received from the external chat surface.
///
/// Immutable once built. Lives in the correlation queue until a reply is
/// selected for it or the active conversation changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub content: String,
    pub timestamp: Timestamp,
    pub sender_key: String,
    pub user_id: String,
}

// =============================================================================
// Context windows
// =============================================================================

/// Time bounds (inclusive on both ends) for a context store read.
///
/// Invariant: `since <= until`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    since: Timestamp,
    until: Timestamp,
    sender_key: Option<String>,
}

impl ContextWindow {
    /// Build a window, rejecting inverted bounds.
    pub fn new(since: Timestamp, until: Timestamp, sender_key: Option<String>) -> Result<Self> {
        if since > until {
            return Err(GhostwriterError::Validation(format!(
                "context window starts after it ends ({} > {})",
                since, until
            )));
        }
        Ok(Self {
            since,
            until,
            sender_key,
        })
    }

    /// The window of `span_ms` milliseconds ending at `latest`.
    ///
    /// Negative spans are treated as zero so the invariant always holds.
    pub fn trailing(latest: Timestamp, span_ms: i64, sender_key: Option<String>) -> Self {
        Self {
            since: latest.minus_millis(span_ms.max(0)),
            until: latest,
            sender_key,
        }
    }

    pub fn since(&self) -> Timestamp {
        self.since
    }

    pub fn until(&self) -> Timestamp {
        self.until
    }

    pub fn sender_key(&self) -> Option<&str> {
        self.sender_key.as_deref()
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.since && ts <= self.until
    }
}

// =============================================================================
// Candidate replies
// =============================================================================

/// The drafted replies for one inbound message.
///
/// Invariant: never empty. Built once per message and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CandidateList(Vec<String>);

impl CandidateList {
    /// Wrap a list of replies, returning `None` when it is empty.
    pub fn new(candidates: Vec<String>) -> Option<Self> {
        if candidates.is_empty() {
            None
        } else {
            Some(Self(candidates))
        }
    }

    /// A list holding exactly one reply.
    pub fn single(candidate: impl Into<String>) -> Self {
        Self(vec![candidate.into()])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl TryFrom<Vec<String>> for CandidateList {
    type Error = String;

    fn try_from(value: Vec<String>) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "candidate list must not be empty".to_string())
    }
}

impl From<CandidateList> for Vec<String> {
    fn from(list: CandidateList) -> Self {
        list.0
    }
}

// =============================================================================
// Question / answer pairs
// =============================================================================

/// A selected reply, logged for future retrieval. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub user_id: String,
    pub content: String,
    pub table_name: String,
    pub timestamp: Timestamp,
    pub sender_key: String,
}

impl QaPair {
    /// Pair a reply with the inbound message it answers.
    pub fn for_reply(original: &InboundMessage, chosen: &str, table_name: &str) -> Self {
        Self {
            user_id: original.user_id.clone(),
            content: format!("message: {} response: {}", original.content, chosen),
            table_name: table_name.to_string(),
            timestamp: original.timestamp,
            sender_key: original.sender_key.clone(),
        }
    }

    /// Record a reply sent without a preceding inbound message.
    pub fn conversation_start(
        chosen: &str,
        user_id: &str,
        sender_key: &str,
        table_name: &str,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            content: format!("started conversation with: {}", chosen),
            table_name: table_name.to_string(),
            timestamp,
            sender_key: sender_key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str, ts: i64) -> InboundMessage {
        InboundMessage {
            content: content.to_string(),
            timestamp: Timestamp(ts),
            sender_key: "alice".to_string(),
            user_id: "u1".to_string(),
        }
    }

    #[test]
    fn test_timestamp_serializes_as_integer() {
        let json = serde_json::to_string(&Timestamp(1000)).unwrap();
        assert_eq!(json, "1000");
        let back: Timestamp = serde_json::from_str("1000").unwrap();
        assert_eq!(back, Timestamp(1000));
    }

    #[test]
    fn test_timestamp_datetime_round_trip_keeps_millis() {
        let ts = Timestamp(1_700_000_000_123);
        assert_eq!(Timestamp::from_datetime(ts.to_datetime()), ts);
    }

    #[test]
    fn test_minus_millis_saturates() {
        assert_eq!(Timestamp(i64::MIN + 5).minus_millis(10), Timestamp(i64::MIN));
        assert_eq!(Timestamp(1000).minus_millis(300), Timestamp(700));
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        let err = ContextWindow::new(Timestamp(10), Timestamp(5), None).unwrap_err();
        assert!(matches!(err, GhostwriterError::Validation(_)));
    }

    #[test]
    fn test_window_allows_point_range() {
        let w = ContextWindow::new(Timestamp(5), Timestamp(5), Some("bob".into())).unwrap();
        assert!(w.contains(Timestamp(5)));
        assert_eq!(w.sender_key(), Some("bob"));
    }

    #[test]
    fn test_trailing_window_bounds_are_inclusive() {
        let latest = Timestamp(1_000_000);
        let w = ContextWindow::trailing(latest, CONVERSATION_WINDOW_MS, None);
        assert_eq!(w.since(), Timestamp(700_000));
        assert_eq!(w.until(), latest);
        assert!(w.contains(Timestamp(700_000)));
        assert!(w.contains(latest));
        assert!(!w.contains(Timestamp(699_999)));
        assert!(!w.contains(Timestamp(1_000_001)));
    }

    #[test]
    fn test_trailing_window_negative_span_is_empty_range() {
        let w = ContextWindow::trailing(Timestamp(50), -10, None);
        assert_eq!(w.since(), w.until());
    }

    #[test]
    fn test_candidate_list_rejects_empty() {
        assert!(CandidateList::new(vec![]).is_none());
        let parsed: std::result::Result<CandidateList, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_candidate_list_serializes_as_array() {
        let list = CandidateList::new(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["a","b"]"#);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_qa_pair_for_reply_format() {
        let pair = QaPair::for_reply(&message("lunch?", 1000), "sure, noon?", "messages");
        assert_eq!(pair.content, "message: lunch? response: sure, noon?");
        assert_eq!(pair.timestamp, Timestamp(1000));
        assert_eq!(pair.sender_key, "alice");
        assert_eq!(pair.user_id, "u1");
        assert_eq!(pair.table_name, "messages");
    }

    #[test]
    fn test_qa_pair_conversation_start_format() {
        let pair = QaPair::conversation_start(
            "hey!",
            "u1",
            "default_sender",
            "messages",
            Timestamp(42),
        );
        assert_eq!(pair.content, "started conversation with: hey!");
        assert_eq!(pair.sender_key, "default_sender");
    }
}
