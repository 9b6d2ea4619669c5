/// Opaque message identifier — the join key between the raw and normalized
/// views of an inbound event.
pub type MessageId = String;

/// Unparsed provider-specific wire payload (the envelope's `d`-object).
pub type RawPayload = serde_json::Map<String, serde_json::Value>;

/// Platform tag of the QQ official webhook transport.
pub const QQ_OFFICIAL_WEBHOOK: &str = "qq_official_webhook";

/// Kind of conversation the message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Group,
    Direct,
    Channel,
}

/// Message sender. The nickname is mutable — the event gate overwrites it
/// in place when a better value is recovered from the raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: String,
    pub nickname: String,
}

/// Platform-agnostic event produced by the normalization stage.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub message_id: MessageId,
    /// Platform tag of the transport this event arrived over.
    pub platform: String,
    pub kind: MessageKind,
    pub sender: Sender,
    pub content: String,
    /// Auxiliary context: the raw payload attached after a successful
    /// correlation join. Absent for any event whose raw view was never
    /// stashed or already consumed.
    pub raw_context: Option<RawPayload>,
}

impl MessageEvent {
    /// Attach the raw payload as auxiliary context.
    ///
    /// At most one context per event: returns `false` and drops `payload`
    /// if a context is already attached.
    pub fn attach_context(&mut self, payload: RawPayload) -> bool {
        if self.raw_context.is_some() {
            return false;
        }
        self.raw_context = Some(payload);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> MessageEvent {
        MessageEvent {
            message_id: "m1".into(),
            platform: QQ_OFFICIAL_WEBHOOK.into(),
            kind: MessageKind::Group,
            sender: Sender { user_id: "u1".into(), nickname: String::new() },
            content: String::new(),
            raw_context: None,
        }
    }

    #[test]
    fn context_attaches_at_most_once() {
        let mut ev = event();
        let mut first = RawPayload::new();
        first.insert("seq".into(), serde_json::json!(1));
        let mut second = RawPayload::new();
        second.insert("seq".into(), serde_json::json!(2));

        assert!(ev.attach_context(first));
        assert!(!ev.attach_context(second));
        let ctx = ev.raw_context.as_ref().unwrap();
        assert_eq!(ctx.get("seq"), Some(&serde_json::json!(1)));
    }
}
