use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use nickcap_api::envelope::{Envelope, OP_DISPATCH, OP_VALIDATION};
use nickcap_api::error::IntegrationError;
use nickcap_api::hooks::{ChallengeSigner, HookSet};

/// Per-event-type handler supplied by the host, invoked with the full
/// envelope for every matching dispatch event.
pub trait DispatchHandler: Send + Sync {
    fn dispatch(&self, envelope: &Envelope) -> Result<(), IntegrationError>;
}

/// What the transport sends back. Exactly one reply per request.
#[derive(Debug)]
pub enum CallbackReply {
    /// Signed validation payload, returned verbatim from the signer.
    Signed(serde_json::Value),
    /// Empty success acknowledgment.
    Ack,
    /// Generic server error — the request is still acknowledged.
    ServerError,
}

/// The webhook dispatch path: classifies inbound envelopes by op code and
/// routes dispatch events to per-event-type handlers.
///
/// Pre-dispatch hooks run on every envelope before any classification, so a
/// stashing hook can never lose the race against downstream dispatch.
pub struct Dispatcher {
    hooks: Arc<HookSet>,
    signer: Arc<dyn ChallengeSigner>,
    handlers: RwLock<HashMap<String, Arc<dyn DispatchHandler>>>,
}

impl Dispatcher {
    pub fn new(hooks: Arc<HookSet>, signer: Arc<dyn ChallengeSigner>) -> Self {
        Self {
            hooks,
            signer,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn hooks(&self) -> &Arc<HookSet> {
        &self.hooks
    }

    /// Register a handler for an event-type tag (matched case-insensitively).
    pub fn register_handler(&self, event_type: &str, handler: Arc<dyn DispatchHandler>) {
        let mut guard = match self.handlers.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("dispatch handler lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.insert(event_type.to_ascii_lowercase(), handler);
    }

    /// Handle one inbound request body.
    ///
    /// The webhook channel is never left unacknowledged: a malformed body,
    /// signer failure, or handler failure all collapse into a generic
    /// server-error reply; everything else is acknowledged.
    pub fn handle(&self, body: &str) -> CallbackReply {
        let envelope: Envelope = match serde_json::from_str(body) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "malformed webhook body");
                return CallbackReply::ServerError;
            }
        };

        // Stash before dispatch — see PayloadStash.
        self.hooks.run_pre_dispatch(&envelope);

        match envelope.op {
            Some(OP_VALIDATION) => match self.signer.sign(&envelope.data) {
                Ok(signed) => CallbackReply::Signed(signed),
                Err(e) => {
                    tracing::error!(error = %e, "validation signing failed");
                    CallbackReply::ServerError
                }
            },
            Some(OP_DISPATCH) => {
                let Some(event_type) = envelope.event_type.as_deref() else {
                    tracing::debug!("dispatch envelope without event-type tag");
                    return CallbackReply::Ack;
                };
                self.dispatch_event(event_type, &envelope)
            }
            other => {
                tracing::debug!(op = ?other, "unhandled op code");
                CallbackReply::Ack
            }
        }
    }

    fn dispatch_event(&self, event_type: &str, envelope: &Envelope) -> CallbackReply {
        let handler = {
            let guard = match self.handlers.read() {
                Ok(g) => g,
                Err(poisoned) => {
                    tracing::warn!("dispatch handler lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            guard.get(&event_type.to_ascii_lowercase()).cloned()
        };

        match handler {
            Some(handler) => match handler.dispatch(envelope) {
                Ok(()) => CallbackReply::Ack,
                Err(e) => {
                    tracing::error!(event_type = %event_type, error = %e, "dispatch handler failed");
                    CallbackReply::ServerError
                }
            },
            None => {
                // Unknown event types are non-fatal: log and acknowledge.
                tracing::warn!(event_type = %event_type, "no handler for event type");
                CallbackReply::Ack
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("hooks", &self.hooks).finish()
    }
}
