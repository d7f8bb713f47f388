//! Message cards exchanged between A2A participants.
//!
//! A [`MessageCard`] is a shared envelope (sender, recipient, timestamp)
//! around a typed payload. Cards are audit records: the orchestration loop
//! writes them to a [`CardLog`] but never reads them back to make a
//! decision.
//!
//! Serialization projects a card onto the flat [`CardRecord`] shape
//! `{sender, recipient, message_type, content, metadata, timestamp}`.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Metadata map attached to a card.
pub type CardMetadata = Map<String, Value>;

// ---------------------------------------------------------------------------
// Participants and message types
// ---------------------------------------------------------------------------

/// A party that can send or receive a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    Planner,
    Solver,
    Controller,
}

impl Participant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Solver => "solver",
            Self::Controller => "controller",
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of inter-agent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Task,
    Result,
    Query,
    Control,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Result => "result",
            Self::Query => "query",
            Self::Control => "control",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Card payloads
// ---------------------------------------------------------------------------

/// Type-specific body of a card.
#[derive(Debug, Clone, PartialEq)]
pub enum CardPayload {
    /// Work handed to the recipient.
    Task { task: String, context: CardMetadata },
    /// Outcome reported back, with a status such as `success` or `completed`.
    Result {
        result: String,
        status: String,
        metadata: CardMetadata,
    },
    /// A question with optional choices.
    Query { query: String, options: Vec<String> },
    /// A controller instruction such as a retry or forced stop.
    Control {
        action: String,
        parameters: CardMetadata,
    },
}

/// A structured record of one inter-agent communication event.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageCard {
    pub sender: Participant,
    pub recipient: Participant,
    pub timestamp: DateTime<Utc>,
    pub payload: CardPayload,
}

impl MessageCard {
    fn new(sender: Participant, recipient: Participant, payload: CardPayload) -> Self {
        Self {
            sender,
            recipient,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn task(
        sender: Participant,
        recipient: Participant,
        task: impl Into<String>,
        context: CardMetadata,
    ) -> Self {
        Self::new(
            sender,
            recipient,
            CardPayload::Task {
                task: task.into(),
                context,
            },
        )
    }

    pub fn result(
        sender: Participant,
        recipient: Participant,
        result: impl Into<String>,
        status: impl Into<String>,
        metadata: CardMetadata,
    ) -> Self {
        Self::new(
            sender,
            recipient,
            CardPayload::Result {
                result: result.into(),
                status: status.into(),
                metadata,
            },
        )
    }

    pub fn query(
        sender: Participant,
        recipient: Participant,
        query: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        Self::new(
            sender,
            recipient,
            CardPayload::Query {
                query: query.into(),
                options,
            },
        )
    }

    pub fn control(
        sender: Participant,
        recipient: Participant,
        action: impl Into<String>,
        parameters: CardMetadata,
    ) -> Self {
        Self::new(
            sender,
            recipient,
            CardPayload::Control {
                action: action.into(),
                parameters,
            },
        )
    }

    /// Replace the creation timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn message_type(&self) -> MessageType {
        match self.payload {
            CardPayload::Task { .. } => MessageType::Task,
            CardPayload::Result { .. } => MessageType::Result,
            CardPayload::Query { .. } => MessageType::Query,
            CardPayload::Control { .. } => MessageType::Control,
        }
    }

    /// The card's main text: task, result, query, or control action.
    pub fn content(&self) -> &str {
        match &self.payload {
            CardPayload::Task { task, .. } => task,
            CardPayload::Result { result, .. } => result,
            CardPayload::Query { query, .. } => query,
            CardPayload::Control { action, .. } => action,
        }
    }

    /// Flattened metadata as it appears in the serialized record.
    ///
    /// Result cards always carry their `status`; the other kinds nest their
    /// extras under one key and omit metadata entirely when empty.
    pub fn metadata(&self) -> Option<CardMetadata> {
        let nested = |key: &str, value: Value| {
            let mut map = CardMetadata::new();
            map.insert(key.to_string(), value);
            Some(map)
        };

        match &self.payload {
            CardPayload::Task { context, .. } if !context.is_empty() => {
                nested("context", Value::Object(context.clone()))
            }
            CardPayload::Result {
                status, metadata, ..
            } => {
                let mut map = CardMetadata::new();
                map.insert("status".to_string(), Value::String(status.clone()));
                for (k, v) in metadata {
                    map.insert(k.clone(), v.clone());
                }
                Some(map)
            }
            CardPayload::Query { options, .. } if !options.is_empty() => {
                nested("options", serde_json::json!(options))
            }
            CardPayload::Control { parameters, .. } if !parameters.is_empty() => {
                nested("parameters", Value::Object(parameters.clone()))
            }
            _ => None,
        }
    }

    /// Project the card onto its flat serialized form.
    pub fn to_record(&self) -> CardRecord {
        CardRecord {
            sender: self.sender,
            recipient: self.recipient,
            message_type: self.message_type(),
            content: self.content().to_string(),
            metadata: self.metadata(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

impl Serialize for MessageCard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// Flat serialized form of a [`MessageCard`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub sender: Participant,
    pub recipient: Participant,
    pub message_type: MessageType,
    pub content: String,
    pub metadata: Option<CardMetadata>,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// CardLog
// ---------------------------------------------------------------------------

/// Append-only, insertion-ordered log of cards for one session.
#[derive(Debug, Clone, Default)]
pub struct CardLog {
    cards: Vec<MessageCard>,
}

impl CardLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a card. Identical cards are kept as separate entries.
    pub fn append(&mut self, card: MessageCard) {
        log::debug!(
            "A2A card #{}: {} -> {} [{}]",
            self.cards.len() + 1,
            card.sender,
            card.recipient,
            card.message_type()
        );
        self.cards.push(card);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[MessageCard] {
        &self.cards
    }

    /// Serialized records, in insertion order.
    pub fn records(&self) -> Vec<CardRecord> {
        self.cards.iter().map(MessageCard::to_record).collect()
    }

    pub fn into_cards(self) -> Vec<MessageCard> {
        self.cards
    }
}

/// Build a metadata map from `(key, value)` pairs.
pub fn metadata<I, K>(pairs: I) -> CardMetadata
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_task_card_record() {
        let card = MessageCard::task(
            Participant::Planner,
            Participant::Solver,
            "add 5 and 3",
            metadata([("turn", json!(1))]),
        );
        let record = serde_json::to_value(&card).unwrap();
        assert_eq!(record["sender"], "planner");
        assert_eq!(record["recipient"], "solver");
        assert_eq!(record["message_type"], "task");
        assert_eq!(record["content"], "add 5 and 3");
        assert_eq!(record["metadata"], json!({"context": {"turn": 1}}));
        assert!(record["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_result_card_always_has_status() {
        let card = MessageCard::result(
            Participant::Solver,
            Participant::Planner,
            "8",
            "success",
            metadata([("tokens", json!(15))]),
        );
        assert_eq!(
            card.metadata().unwrap(),
            metadata([("status", json!("success")), ("tokens", json!(15))])
        );

        let bare = MessageCard::result(
            Participant::Planner,
            Participant::Controller,
            "8",
            "completed",
            CardMetadata::new(),
        );
        assert_eq!(bare.to_record().metadata, Some(metadata([("status", json!("completed"))])));
    }

    #[test]
    fn test_empty_extras_serialize_as_null_metadata() {
        let task = MessageCard::task(
            Participant::Controller,
            Participant::Planner,
            "q",
            CardMetadata::new(),
        );
        assert_eq!(task.to_record().metadata, None);

        let query = MessageCard::query(
            Participant::Planner,
            Participant::Controller,
            "Which unit?",
            vec!["cm".into(), "m".into()],
        );
        assert_eq!(query.message_type(), MessageType::Query);
        assert_eq!(query.metadata().unwrap()["options"], json!(["cm", "m"]));

        let control = MessageCard::control(
            Participant::Controller,
            Participant::Planner,
            "force_terminate",
            CardMetadata::new(),
        );
        assert_eq!(control.content(), "force_terminate");
        assert_eq!(control.metadata(), None);
    }

    #[test]
    fn test_append_never_merges() {
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap();
        let card = MessageCard::task(
            Participant::Planner,
            Participant::Solver,
            "same",
            CardMetadata::new(),
        );

        let mut log = CardLog::new();
        log.append(card.clone().with_timestamp(t1));
        log.append(card.with_timestamp(t2));

        assert_eq!(log.len(), 2);
        let records = log.records();
        assert_eq!(records[0].content, records[1].content);
        assert_ne!(records[0].timestamp, records[1].timestamp);
        assert_eq!(log.cards()[0].timestamp, t1);
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let card = MessageCard::control(
            Participant::Controller,
            Participant::Planner,
            "retry_json_action",
            metadata([("turn", json!(1))]),
        );
        let text = serde_json::to_string(&card).unwrap();
        let record: CardRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(record, card.to_record());
    }
}
