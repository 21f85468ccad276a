//! Group name resolution with a per-request cache.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use crate::metrics::GROUP_LOOKUPS;
use crate::zendesk::ZendeskApi;

/// Group id to display name, scoped to one aggregation.
///
/// Each key holds a write-once slot. Concurrent lookups of the same id wait
/// on the first one; a failed lookup leaves the slot empty so a later caller
/// tries again.
#[derive(Debug, Default)]
pub struct GroupCache {
    slots: Mutex<HashMap<u64, Arc<OnceCell<String>>>>,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved name for `group_id`, if a lookup has succeeded.
    pub async fn get(&self, group_id: u64) -> Option<String> {
        let slots = self.slots.lock().await;
        slots.get(&group_id).and_then(|slot| slot.get().cloned())
    }

    /// Number of resolved entries.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn slot(&self, group_id: u64) -> Arc<OnceCell<String>> {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(group_id).or_default())
    }
}

/// Resolves group ids to names through Zendesk, memoizing in a `GroupCache`.
pub struct GroupNameResolver<'a> {
    api: &'a dyn ZendeskApi,
    cache: &'a GroupCache,
}

impl<'a> GroupNameResolver<'a> {
    pub fn new(api: &'a dyn ZendeskApi, cache: &'a GroupCache) -> Self {
        Self { api, cache }
    }

    /// Name of the group, or an empty string when the ticket has no group or
    /// the lookup fails. Never returns an error.
    pub async fn resolve(&self, group_id: Option<u64>) -> String {
        let Some(group_id) = group_id else {
            return String::new();
        };

        let slot = self.cache.slot(group_id).await;
        if let Some(name) = slot.get() {
            GROUP_LOOKUPS.with_label_values(&["cache_hit"]).inc();
            return name.clone();
        }

        let result = slot
            .get_or_try_init(|| async {
                let group = self.api.fetch_group(group_id).await?;
                debug!(group_id, name = %group.name, "Resolved group name");
                GROUP_LOOKUPS.with_label_values(&["fetched"]).inc();
                Ok::<_, crate::zendesk::ZendeskError>(group.name)
            })
            .await;

        match result {
            Ok(name) => name.clone(),
            Err(e) => {
                GROUP_LOOKUPS.with_label_values(&["failed"]).inc();
                warn!(
                    group_id,
                    error = %e,
                    body = e.response_body().unwrap_or_default(),
                    "Group lookup failed, leaving name empty"
                );
                String::new()
            }
        }
    }
}
