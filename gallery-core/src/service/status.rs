// gallery-core/src/service/status.rs
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use gallery_common::operation::{OpState, OpStatus};
use tracing::debug;

/// Operation statuses keyed by id. Many readers, a single writing worker.
#[derive(Debug, Default)]
pub struct StatusTable {
    inner: RwLock<HashMap<String, OpStatus>>,
    retention: Option<Duration>,
}

impl StatusTable {
    pub fn new(retention: Option<Duration>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            retention,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, OpStatus>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, OpStatus>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, id: &str) -> Option<OpStatus> {
        self.read().get(id).cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, OpStatus> {
        self.read().clone()
    }

    /// Records `status` for `id` and evicts expired terminal statuses.
    pub fn set(&self, id: &str, status: OpStatus) {
        let mut map = self.write();
        if let Some(existing) = map.get(id) {
            if existing.state.is_terminal() {
                debug!("Ignoring status update for finished operation {}", id);
                return;
            }
        }
        map.insert(id.to_string(), status);
        self.prune(&mut map);
    }

    /// Updates the progress of a processing operation; ignored otherwise.
    pub fn update_progress(&self, id: &str, file_name: &str, message: &str, percent: f64) {
        let mut map = self.write();
        if let Some(status) = map.get_mut(id) {
            if status.state == OpState::Processing {
                status.progress = percent.clamp(0.0, 100.0);
                status.file_name = Some(file_name.to_string());
                status.message = message.to_string();
                status.updated_at = Utc::now();
            }
        }
    }

    fn prune(&self, map: &mut HashMap<String, OpStatus>) {
        let Some(ttl) = self.retention.and_then(|d| TimeDelta::from_std(d).ok()) else {
            return;
        };
        let cutoff = Utc::now() - ttl;
        let before = map.len();
        map.retain(|_, status| !(status.state.is_terminal() && status.updated_at < cutoff));
        let evicted = before - map.len();
        if evicted > 0 {
            debug!("Evicted {} expired operation statuses", evicted);
        }
    }
}
