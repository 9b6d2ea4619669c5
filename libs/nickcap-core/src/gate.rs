use std::sync::Arc;

use nickcap_api::error::IntegrationError;
use nickcap_api::event::{MessageEvent, MessageKind};
use nickcap_api::hooks::EventHandler;

use crate::cache::NicknameCache;
use crate::extract::quoted_mention;

pub const GATE_HANDLER: &str = "nickname-gate";

/// Low-priority event handler: captures the replied-to display name from the
/// event's auxiliary context, patches `sender.nickname` in place, and
/// reconciles the nickname cache.
///
/// Runs after higher-priority handlers have had first refusal but before the
/// event reaches the sink, so every downstream consumer sees the corrected
/// nickname.
pub struct NicknameGate {
    cache: Arc<NicknameCache>,
    platform: String,
}

impl NicknameGate {
    pub fn new(cache: Arc<NicknameCache>, platform: impl Into<String>) -> Self {
        Self {
            cache,
            platform: platform.into(),
        }
    }
}

impl EventHandler for NicknameGate {
    fn name(&self) -> &str {
        GATE_HANDLER
    }

    fn priority(&self) -> i32 {
        -10
    }

    fn handle(&self, event: &mut MessageEvent) -> Result<(), IntegrationError> {
        // Only group messages over the target transport are eligible.
        if event.platform != self.platform || event.kind != MessageKind::Group {
            return Ok(());
        }

        if event.sender.user_id.is_empty() {
            tracing::info!(message_id = %event.message_id, "event carries no sender user id");
            return Ok(());
        }

        // The majority of messages are not replies carrying an @name token.
        let Some(nickname) = quoted_mention(event.raw_context.as_ref()) else {
            return Ok(());
        };

        let user_id = event.sender.user_id.clone();
        event.sender.nickname = nickname.clone();

        if self.cache.update(&user_id, &nickname) {
            tracing::info!(
                user_id = %user_id,
                nickname = %nickname,
                "captured nickname, cache updated"
            );
        } else {
            tracing::debug!(
                user_id = %user_id,
                nickname = %nickname,
                "captured nickname already cached"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nickcap_api::event::{RawPayload, Sender};

    use super::*;

    const PLATFORM: &str = "qq_official_webhook";

    fn reply_context(content: &str) -> RawPayload {
        serde_json::json!({
            "parallel_message": { "msg_nodes": [{ "content": content }] }
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn event(user_id: &str, context: Option<RawPayload>) -> MessageEvent {
        MessageEvent {
            message_id: "m1".into(),
            platform: PLATFORM.into(),
            kind: MessageKind::Group,
            sender: Sender { user_id: user_id.into(), nickname: "old".into() },
            content: String::new(),
            raw_context: context,
        }
    }

    fn gate() -> (NicknameGate, Arc<NicknameCache>) {
        let cache = Arc::new(NicknameCache::new());
        (NicknameGate::new(cache.clone(), PLATFORM), cache)
    }

    #[test]
    fn patches_nickname_and_updates_cache() {
        let (gate, cache) = gate();
        let mut ev = event("u1", Some(reply_context("hello @Alice how are you")));

        gate.handle(&mut ev).unwrap();

        assert_eq!(ev.sender.nickname, "Alice");
        assert_eq!(cache.get("u1").as_deref(), Some("Alice"));
        assert_eq!(cache.update_count(), 1);
    }

    #[test]
    fn repeated_capture_is_an_idempotent_cache_write() {
        let (gate, cache) = gate();
        let mut first = event("u1", Some(reply_context("@Alice hi")));
        let mut second = event("u1", Some(reply_context("@Alice again")));

        gate.handle(&mut first).unwrap();
        gate.handle(&mut second).unwrap();

        assert_eq!(cache.update_count(), 1);
    }

    #[test]
    fn foreign_platform_is_ignored() {
        let (gate, cache) = gate();
        let mut ev = event("u1", Some(reply_context("@Alice hi")));
        ev.platform = "telegram".into();

        gate.handle(&mut ev).unwrap();

        assert_eq!(ev.sender.nickname, "old");
        assert!(cache.is_empty());
    }

    #[test]
    fn non_group_message_is_ignored() {
        let (gate, cache) = gate();
        let mut ev = event("u1", Some(reply_context("@Alice hi")));
        ev.kind = MessageKind::Direct;

        gate.handle(&mut ev).unwrap();

        assert_eq!(ev.sender.nickname, "old");
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_user_id_stops_before_extraction() {
        let (gate, cache) = gate();
        let mut ev = event("", Some(reply_context("@Alice hi")));

        gate.handle(&mut ev).unwrap();

        assert_eq!(ev.sender.nickname, "old");
        assert!(cache.is_empty());
    }

    #[test]
    fn no_match_leaves_event_and_cache_untouched() {
        let (gate, cache) = gate();
        let mut ev = event("u1", None);

        gate.handle(&mut ev).unwrap();

        assert_eq!(ev.sender.nickname, "old");
        assert!(cache.is_empty());
        assert_eq!(cache.update_count(), 0);
    }
}
