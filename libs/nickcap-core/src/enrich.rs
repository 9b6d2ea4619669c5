use std::sync::Arc;

use nickcap_api::envelope::Envelope;
use nickcap_api::event::MessageEvent;
use nickcap_api::hooks::{PostParseHook, PreDispatchHook};

use crate::store::CorrelationStore;

pub const STASH_HOOK: &str = "nickname-stash";
pub const JOIN_HOOK: &str = "nickname-join";

/// Pre-dispatch hook: stashes every keyed raw payload into the correlation
/// store before downstream dispatch can run, so the join can never race
/// ahead of the stash. The only `put` caller in the system.
pub struct PayloadStash {
    store: Arc<CorrelationStore>,
}

impl PayloadStash {
    pub fn new(store: Arc<CorrelationStore>) -> Self {
        Self { store }
    }
}

impl PreDispatchHook for PayloadStash {
    fn name(&self) -> &str {
        STASH_HOOK
    }

    fn before_dispatch(&self, envelope: &Envelope) {
        let Some(id) = envelope.message_id() else {
            return;
        };
        tracing::debug!(message_id = %id, "stashing raw payload");
        self.store.put(id.to_string(), envelope.data.clone());
    }
}

/// Post-parse hook: consumes the stashed raw payload for the event's
/// transport identifier and attaches it as auxiliary context.
///
/// A missing entry is the common case (any event without reply metadata,
/// or whose raw view expired) and is not worth more than a trace line.
pub struct EnrichmentJoin {
    store: Arc<CorrelationStore>,
}

impl EnrichmentJoin {
    pub fn new(store: Arc<CorrelationStore>) -> Self {
        Self { store }
    }
}

impl PostParseHook for EnrichmentJoin {
    fn name(&self) -> &str {
        JOIN_HOOK
    }

    fn after_parse(&self, event: &mut MessageEvent, transport_id: &str) {
        let Some(payload) = self.store.take(transport_id) else {
            tracing::trace!(message_id = %transport_id, "no stashed payload to join");
            return;
        };
        if event.attach_context(payload) {
            tracing::debug!(message_id = %transport_id, "attached raw payload to event");
        } else {
            tracing::debug!(
                message_id = %transport_id,
                "event already carries a context, stashed payload dropped"
            );
        }
    }
}
