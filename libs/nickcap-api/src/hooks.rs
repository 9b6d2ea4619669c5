use std::sync::{Arc, RwLock};

use crate::envelope::Envelope;
use crate::error::IntegrationError;
use crate::event::MessageEvent;

/// Hook invoked on every inbound envelope, before any op-code classification
/// or downstream dispatch.
pub trait PreDispatchHook: Send + Sync {
    fn name(&self) -> &str;
    fn before_dispatch(&self, envelope: &Envelope);
}

/// Hook invoked synchronously inside normalization, right after a
/// `MessageEvent` is produced, with the transport-level identifier the raw
/// view was keyed by.
pub trait PostParseHook: Send + Sync {
    fn name(&self) -> &str;
    fn after_parse(&self, event: &mut MessageEvent, transport_id: &str);
}

/// Handler invoked once per normalized event, in descending priority order.
///
/// Handlers are interception points, not terminal consumers: they may mutate
/// the event in place before it reaches the sink. A returned error is logged
/// by the runner and swallowed — the event keeps flowing.
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Higher priority runs earlier. Defaults to 0.
    fn priority(&self) -> i32 {
        0
    }

    fn handle(&self, event: &mut MessageEvent) -> Result<(), IntegrationError>;
}

/// Signs the validation-handshake challenge. External collaborator: the
/// dispatcher forwards the challenge `d`-object and returns the signed
/// response verbatim.
pub trait ChallengeSigner: Send + Sync {
    fn sign(&self, challenge: &crate::event::RawPayload)
        -> Result<serde_json::Value, IntegrationError>;
}

/// Terminal consumer of normalized events, after all handlers ran.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: MessageEvent);
}

/// Typed extension interface of the host dispatch path.
///
/// Integrations register hooks here instead of rewriting host internals;
/// unregistering by name restores the original dispatch behavior.
/// Uses interior mutability so hooks can be installed and torn down at
/// runtime (hot reload).
#[derive(Default)]
pub struct HookSet {
    pre_dispatch: RwLock<Vec<Arc<dyn PreDispatchHook>>>,
    post_parse: RwLock<Vec<Arc<dyn PostParseHook>>>,
    event_handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pre_dispatch(&self, hook: Arc<dyn PreDispatchHook>) {
        let mut guard = match self.pre_dispatch.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("pre-dispatch hook lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.push(hook);
    }

    pub fn register_post_parse(&self, hook: Arc<dyn PostParseHook>) {
        let mut guard = match self.post_parse.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("post-parse hook lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.push(hook);
    }

    pub fn register_event_handler(&self, handler: Arc<dyn EventHandler>) {
        let mut guard = match self.event_handlers.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("event handler lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.push(handler);
        // Stable sort keeps registration order among equal priorities.
        guard.sort_by_key(|h| std::cmp::Reverse(h.priority()));
    }

    /// Remove a pre-dispatch hook by name. Returns `false` if absent.
    pub fn unregister_pre_dispatch(&self, name: &str) -> bool {
        let mut guard = match self.pre_dispatch.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("pre-dispatch hook lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let before = guard.len();
        guard.retain(|h| h.name() != name);
        guard.len() != before
    }

    /// Remove a post-parse hook by name. Returns `false` if absent.
    pub fn unregister_post_parse(&self, name: &str) -> bool {
        let mut guard = match self.post_parse.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("post-parse hook lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let before = guard.len();
        guard.retain(|h| h.name() != name);
        guard.len() != before
    }

    /// Remove an event handler by name. Returns `false` if absent.
    pub fn unregister_event_handler(&self, name: &str) -> bool {
        let mut guard = match self.event_handlers.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("event handler lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let before = guard.len();
        guard.retain(|h| h.name() != name);
        guard.len() != before
    }

    /// Run all pre-dispatch hooks against an inbound envelope.
    pub fn run_pre_dispatch(&self, envelope: &Envelope) {
        for hook in self.pre_dispatch_snapshot() {
            hook.before_dispatch(envelope);
        }
    }

    /// Run all post-parse hooks against a just-normalized event.
    pub fn run_post_parse(&self, event: &mut MessageEvent, transport_id: &str) {
        for hook in self.post_parse_snapshot() {
            hook.after_parse(event, transport_id);
        }
    }

    /// Run all event handlers in priority order.
    ///
    /// A failing handler is logged and skipped; the event continues through
    /// the remaining handlers unmodified by the failed one.
    pub fn run_event_handlers(&self, event: &mut MessageEvent) {
        for handler in self.event_handlers_snapshot() {
            if let Err(e) = handler.handle(event) {
                tracing::error!(
                    handler = %handler.name(),
                    message_id = %event.message_id,
                    error = %e,
                    "event handler failed, event passes through unmodified"
                );
            }
        }
    }

    pub fn pre_dispatch_len(&self) -> usize {
        self.pre_dispatch_snapshot().len()
    }

    pub fn post_parse_len(&self) -> usize {
        self.post_parse_snapshot().len()
    }

    pub fn event_handlers_len(&self) -> usize {
        self.event_handlers_snapshot().len()
    }

    // Snapshots let hooks run without holding the registry lock, so a hook
    // body can never deadlock against a concurrent register/unregister.

    fn pre_dispatch_snapshot(&self) -> Vec<Arc<dyn PreDispatchHook>> {
        let guard = match self.pre_dispatch.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("pre-dispatch hook lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.clone()
    }

    fn post_parse_snapshot(&self) -> Vec<Arc<dyn PostParseHook>> {
        let guard = match self.post_parse.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("post-parse hook lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.clone()
    }

    fn event_handlers_snapshot(&self) -> Vec<Arc<dyn EventHandler>> {
        let guard = match self.event_handlers.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("event handler lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.clone()
    }
}

impl std::fmt::Debug for HookSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSet")
            .field("pre_dispatch", &self.pre_dispatch_len())
            .field("post_parse", &self.post_parse_len())
            .field("event_handlers", &self.event_handlers_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::event::{MessageKind, Sender};

    fn event() -> MessageEvent {
        MessageEvent {
            message_id: "m1".into(),
            platform: "test".into(),
            kind: MessageKind::Group,
            sender: Sender { user_id: "u1".into(), nickname: String::new() },
            content: String::new(),
            raw_context: None,
        }
    }

    struct Recorder {
        name: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl EventHandler for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn handle(&self, _event: &mut MessageEvent) -> Result<(), IntegrationError> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(IntegrationError::handler("boom"));
            }
            Ok(())
        }
    }

    #[test]
    fn handlers_run_in_priority_order() {
        let hooks = HookSet::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hooks.register_event_handler(Arc::new(Recorder {
            name: "low",
            priority: -10,
            log: log.clone(),
            fail: false,
        }));
        hooks.register_event_handler(Arc::new(Recorder {
            name: "high",
            priority: 10,
            log: log.clone(),
            fail: false,
        }));
        hooks.register_event_handler(Arc::new(Recorder {
            name: "default",
            priority: 0,
            log: log.clone(),
            fail: false,
        }));

        hooks.run_event_handlers(&mut event());
        assert_eq!(*log.lock().unwrap(), vec!["high", "default", "low"]);
    }

    #[test]
    fn failing_handler_is_swallowed() {
        let hooks = HookSet::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hooks.register_event_handler(Arc::new(Recorder {
            name: "fails",
            priority: 1,
            log: log.clone(),
            fail: true,
        }));
        hooks.register_event_handler(Arc::new(Recorder {
            name: "still-runs",
            priority: 0,
            log: log.clone(),
            fail: false,
        }));

        hooks.run_event_handlers(&mut event());
        assert_eq!(*log.lock().unwrap(), vec!["fails", "still-runs"]);
    }

    #[test]
    fn unregister_removes_by_name() {
        let hooks = HookSet::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hooks.register_event_handler(Arc::new(Recorder {
            name: "gone",
            priority: 0,
            log: log.clone(),
            fail: false,
        }));
        assert_eq!(hooks.event_handlers_len(), 1);

        assert!(hooks.unregister_event_handler("gone"));
        assert!(!hooks.unregister_event_handler("gone"));
        assert_eq!(hooks.event_handlers_len(), 0);

        hooks.run_event_handlers(&mut event());
        assert!(log.lock().unwrap().is_empty());
    }
}
