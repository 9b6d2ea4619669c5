use serde::Deserialize;

use crate::event::RawPayload;

/// Op code for a normal event dispatch.
pub const OP_DISPATCH: i64 = 0;

/// Op code for the webhook validation handshake.
pub const OP_VALIDATION: i64 = 13;

/// Inbound webhook envelope: op code, optional event-type tag, `d`-object.
///
/// The `d`-object is the provider-specific raw payload. It carries the
/// message identifier (`d.id`) and, for reply-style messages, the nested
/// reply/quote metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub op: Option<i64>,

    /// Event-type tag, present only for dispatch events.
    #[serde(rename = "t", default)]
    pub event_type: Option<String>,

    #[serde(rename = "d", default)]
    pub data: RawPayload,
}

impl Envelope {
    /// The message identifier carried in the `d`-object, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.data.get("id").and_then(serde_json::Value::as_str)
    }
}
