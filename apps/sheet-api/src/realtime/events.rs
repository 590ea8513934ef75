//! Event values and their wire encoding.

use serde::Serialize;
use serde_json::Value;

use super::connection::Frame;

/// Event kinds pushed to clients. New kinds are additive.
pub struct EventKind;

impl EventKind {
    pub const FIELD_CREATED: &'static str = "fieldCreated";
    pub const FIELD_DELETED: &'static str = "fieldDeleted";
}

/// Build a topic string: `<resourceId>.<kind>`.
pub fn topic(resource_id: &str, kind: &str) -> String {
    format!("{resource_id}.{kind}")
}

/// Split a topic into `(resource_id, kind)` on its last dot.
pub fn split_topic(topic: &str) -> Option<(&str, &str)> {
    topic
        .rsplit_once('.')
        .filter(|(resource, kind)| !resource.is_empty() && !kind.is_empty())
}

/// An immutable mutation notification. Lives only for the duration of one
/// delivery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub topic: String,
    pub kind: String,
    pub payload: Value,
}

/// The object clients receive: `{"messageType": ..., "data": ...}`.
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    #[serde(rename = "messageType")]
    message_type: &'a str,
    data: &'a Value,
}

impl Event {
    pub fn new(topic: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            kind: kind.into(),
            payload,
        }
    }

    /// The resource the topic is scoped to, e.g. the sheet id.
    pub fn resource_id(&self) -> Option<&str> {
        split_topic(&self.topic).map(|(resource, _)| resource)
    }

    /// Encode once; the resulting frame is shared by every recipient.
    pub fn encode(&self) -> Result<Frame, serde_json::Error> {
        let json = serde_json::to_string(&WireMessage {
            message_type: &self.topic,
            data: &self.payload,
        })?;
        Ok(Frame::from(json))
    }
}
