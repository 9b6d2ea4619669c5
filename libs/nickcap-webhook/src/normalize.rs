use std::sync::Arc;

use serde_json::Value;

use nickcap_api::envelope::Envelope;
use nickcap_api::error::IntegrationError;
use nickcap_api::event::{MessageEvent, MessageKind, Sender};
use nickcap_api::hooks::{EventSink, HookSet};

use crate::dispatch::DispatchHandler;

/// Normalizes `group_at_message_create` dispatch payloads into
/// `MessageEvent`s and runs them through the hook chain.
///
/// Post-parse hooks run right after the event is built (this is where the
/// enrichment join attaches the raw payload), then event handlers in
/// priority order, then the sink receives the possibly-mutated event.
pub struct GroupMessageHandler {
    hooks: Arc<HookSet>,
    platform: String,
    sink: Arc<dyn EventSink>,
}

impl GroupMessageHandler {
    pub fn new(hooks: Arc<HookSet>, platform: impl Into<String>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            hooks,
            platform: platform.into(),
            sink,
        }
    }
}

impl DispatchHandler for GroupMessageHandler {
    fn dispatch(&self, envelope: &Envelope) -> Result<(), IntegrationError> {
        let d = &envelope.data;
        let message_id = envelope
            .message_id()
            .ok_or_else(|| IntegrationError::payload("group message without d.id"))?
            .to_string();

        let author = d.get("author").and_then(Value::as_object);
        let user_id = author
            .and_then(|a| a.get("member_openid").or_else(|| a.get("id")))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let nickname = author
            .and_then(|a| a.get("username"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let content = d
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let mut event = MessageEvent {
            message_id: message_id.clone(),
            platform: self.platform.clone(),
            kind: MessageKind::Group,
            sender: Sender { user_id, nickname },
            content,
            raw_context: None,
        };

        self.hooks.run_post_parse(&mut event, &message_id);
        self.hooks.run_event_handlers(&mut event);

        tracing::debug!(message_id = %event.message_id, "forwarding normalized event");
        self.sink.deliver(event);
        Ok(())
    }
}
