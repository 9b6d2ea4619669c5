use std::sync::Arc;
use std::time::Duration;

use nickcap_api::hooks::HookSet;

use crate::cache::NicknameCache;
use crate::config::NickcapConfig;
use crate::enrich::{EnrichmentJoin, JOIN_HOOK, PayloadStash, STASH_HOOK};
use crate::gate::{GATE_HANDLER, NicknameGate};
use crate::store::CorrelationStore;

/// The nickname-capture integration: one correlation store and one nickname
/// cache, constructed at integration start and cleared at teardown.
///
/// `install` registers the three interception points against the host's
/// `HookSet`; `teardown` unregisters them (restoring the original dispatch
/// behavior) and clears all in-memory state. Both are safe to call from a
/// hot-reload path; teardown is idempotent.
pub struct NicknameIntegration {
    store: Arc<CorrelationStore>,
    cache: Arc<NicknameCache>,
    platform: String,
}

impl NicknameIntegration {
    pub fn new(config: &NickcapConfig) -> Self {
        Self {
            store: Arc::new(CorrelationStore::new(Duration::from_secs(
                config.correlation_ttl_secs,
            ))),
            cache: Arc::new(NicknameCache::new()),
            platform: config.platform.clone(),
        }
    }

    pub fn store(&self) -> &Arc<CorrelationStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<NicknameCache> {
        &self.cache
    }

    /// Install the stash, join, and gate into the host dispatch path.
    pub fn install(&self, hooks: &HookSet) {
        hooks.register_pre_dispatch(Arc::new(PayloadStash::new(self.store.clone())));
        hooks.register_post_parse(Arc::new(EnrichmentJoin::new(self.store.clone())));
        hooks.register_event_handler(Arc::new(NicknameGate::new(
            self.cache.clone(),
            self.platform.clone(),
        )));
        tracing::info!(platform = %self.platform, "nickname integration installed");
    }

    /// Restore the host's original dispatch behavior and clear all state.
    pub fn teardown(&self, hooks: &HookSet) {
        let removed = hooks.unregister_pre_dispatch(STASH_HOOK)
            | hooks.unregister_post_parse(JOIN_HOOK)
            | hooks.unregister_event_handler(GATE_HANDLER);

        self.store.clear();
        self.cache.clear();

        if removed {
            tracing::info!("nickname integration torn down, in-memory state cleared");
        } else {
            tracing::debug!("nickname integration teardown: nothing was installed");
        }
    }
}
