//! Prefetch cache: kinds, entries, the shared map, and pruning.
//!
//! The map is owned by the surrounding [`RouterState`](crate::state::RouterState)
//! and shared with in-flight fetch tasks, which may relocate an entry after
//! the fetch resolves. All critical sections are synchronous; the map is
//! guarded by a [`parking_lot::Mutex`] and is never held across an await.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fetch::ResponseHandle;
use crate::state::RouteTree;

pub mod key;

pub use key::derive_cache_key;

/// Reuse window for an entry that has never been consumed.
const PREFETCH_TTL: Duration = Duration::from_secs(30);

/// Reuse window measured from the last consumption of an entry.
const REUSE_TTL: Duration = Duration::from_secs(5 * 60);

/// How complete a prefetch was asked to be.
///
/// `Temporary` marks an implicit prefetch recorded as a side effect of a
/// navigation, before any explicit prefetch intent is known; it accepts any
/// later upgrade in place. `Auto` and `Full` are explicit intents, `Full`
/// requesting the complete payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchKind {
    Temporary,
    Auto,
    Full,
}

/// One slot of the prefetch cache.
///
/// `data` is a handle to the in-flight or completed server response; whether
/// it has resolved yet is opaque here. The same entry shape covers pending
/// and resolved slots.
#[derive(Debug, Clone)]
pub struct PrefetchEntry {
    /// Route tree active when the fetch was scheduled. Immutable once set.
    pub tree_at_time_of_prefetch: Arc<RouteTree>,
    /// Handle to the server response, possibly still pending.
    pub data: ResponseHandle,
    /// Current intent. Upgraded in place when a `Temporary` entry answers an
    /// explicit request.
    pub kind: PrefetchKind,
    /// When the entry was written.
    pub prefetch_time: Instant,
    /// When a navigation last consumed the entry. `None` until first use.
    pub last_used_time: Option<Instant>,
}

impl PrefetchEntry {
    /// Whether the entry's reuse window has lapsed.
    fn is_expired(&self) -> bool {
        match self.last_used_time {
            Some(last_used) => last_used.elapsed() > REUSE_TTL,
            None => self.prefetch_time.elapsed() > PREFETCH_TTL,
        }
    }
}

/// The shared prefetch cache map.
///
/// Cheap to clone; clones share the same underlying map. Keys are derived by
/// [`derive_cache_key`] and unique per slot.
#[derive(Debug, Clone, Default)]
pub struct PrefetchCache {
    entries: Arc<Mutex<HashMap<String, PrefetchEntry>>>,
}

impl PrefetchCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the map for a synchronous read-modify-write sequence.
    ///
    /// The guard must never be held across an await.
    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<String, PrefetchEntry>> {
        self.entries.lock()
    }

    /// Returns a clone of the entry at `key`, if present.
    pub fn get(&self, key: &str) -> Option<PrefetchEntry> {
        self.entries.lock().get(key).cloned()
    }

    /// Writes `entry` at `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, entry: PrefetchEntry) {
        self.entries.lock().insert(key.into(), entry);
    }

    /// Removes and returns the entry at `key`, if present.
    pub fn remove(&self, key: &str) -> Option<PrefetchEntry> {
        self.entries.lock().remove(key)
    }

    /// Returns `true` if an entry exists at `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Records that a navigation consumed the entry at `key`, extending its
    /// reuse window. Returns `false` if no such entry exists.
    pub fn mark_used(&self, key: &str) -> bool {
        match self.entries.lock().get_mut(key) {
            Some(entry) => {
                entry.last_used_time = Some(Instant::now());
                true
            }
            None => false,
        }
    }

    /// Evicts entries whose reuse window has lapsed.
    ///
    /// Safe to call with no eligible entries. Returns the number evicted.
    pub fn prune(&self) -> usize {
        prune_expired(&mut self.entries.lock())
    }
}

/// Eviction pass over an already-locked map.
pub(crate) fn prune_expired(entries: &mut HashMap<String, PrefetchEntry>) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired());
    let evicted = before - entries.len();
    if evicted > 0 {
        debug!(evicted, remaining = entries.len(), "pruned prefetch cache");
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::TaskHandle;

    fn entry_at(prefetch_time: Instant) -> PrefetchEntry {
        PrefetchEntry {
            tree_at_time_of_prefetch: Arc::new(RouteTree::leaf("")),
            data: TaskHandle::ready(Ok(crate::fetch::ServerResponse::new("payload"))),
            kind: PrefetchKind::Auto,
            prefetch_time,
            last_used_time: None,
        }
    }

    fn ago(duration: Duration) -> Instant {
        Instant::now().checked_sub(duration).unwrap()
    }

    #[test]
    fn prune_keeps_fresh_entries() {
        let cache = PrefetchCache::new();
        cache.insert("/fresh", entry_at(Instant::now()));
        assert_eq!(cache.prune(), 0);
        assert!(cache.contains_key("/fresh"));
    }

    #[test]
    fn prune_evicts_unused_entries_after_thirty_seconds() {
        let cache = PrefetchCache::new();
        cache.insert("/stale", entry_at(ago(Duration::from_secs(31))));
        cache.insert("/fresh", entry_at(ago(Duration::from_secs(29))));
        assert_eq!(cache.prune(), 1);
        assert!(!cache.contains_key("/stale"));
        assert!(cache.contains_key("/fresh"));
    }

    #[test]
    fn consumption_extends_the_reuse_window() {
        let cache = PrefetchCache::new();
        cache.insert("/used", entry_at(ago(Duration::from_secs(31))));
        assert!(cache.mark_used("/used"));
        // Past the prefetch window, but within the post-use window.
        assert_eq!(cache.prune(), 0);
        assert!(cache.contains_key("/used"));
    }

    #[test]
    fn used_entries_expire_after_five_minutes() {
        let cache = PrefetchCache::new();
        let mut entry = entry_at(ago(Duration::from_secs(600)));
        entry.last_used_time = Some(ago(Duration::from_secs(301)));
        cache.insert("/old", entry);
        assert_eq!(cache.prune(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn mark_used_on_missing_key_is_a_noop() {
        let cache = PrefetchCache::new();
        assert!(!cache.mark_used("/missing"));
    }
}
