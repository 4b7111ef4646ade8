//! Prefetch scheduling.
//!
//! [`Prefetcher::schedule`] decides, for one navigation target and intent,
//! whether an existing cache entry can answer it, and otherwise submits the
//! server fetch through the bounded-concurrency queue and records the
//! pending handle in the cache. Scheduling never suspends: the entry is
//! written in the caller's turn, so a concurrent schedule for the same key
//! observes it as a hit even while the fetch is still in flight.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::cache::{PrefetchCache, PrefetchEntry, PrefetchKind, derive_cache_key, prune_expired};
use crate::fetch::{FetchRequest, ServerFetcher};
use crate::href::{FLIGHT_UNION_QUERY, TargetUrl};
use crate::queue::TaskQueue;
use crate::state::{PrefetchAction, RouterState};

/// Process-wide cap on simultaneously outstanding prefetch fetches.
pub const MAX_CONCURRENT_PREFETCHES: usize = 5;

/// Schedules prefetches against a shared cache map.
///
/// Owns the task queue that bounds fetch concurrency; all prefetches routed
/// through one `Prefetcher` share its cap of [`MAX_CONCURRENT_PREFETCHES`].
///
/// # Examples
///
/// ```no_run
/// use preflight::{
///     FetchError, FetchRequest, PrefetchAction, PrefetchKind, Prefetcher, RouteTree,
///     RouterState, ServerResponse, TargetUrl,
/// };
///
/// #[tokio::main]
/// async fn main() {
///     let prefetcher = Prefetcher::new(|request: FetchRequest| async move {
///         Ok::<_, FetchError>(ServerResponse::new(format!("payload for {}", request.url)))
///     });
///
///     let mut state = RouterState::new(RouteTree::leaf(""), "build-1");
///     prefetcher.schedule(
///         &mut state,
///         PrefetchAction::new(TargetUrl::parse("/dashboard"), PrefetchKind::Auto),
///     );
///
///     // The entry is observable immediately; the payload resolves later.
///     let entry = state.prefetch_cache.get("/dashboard").unwrap();
///     let response = entry.data.resolved().await.unwrap().unwrap();
///     assert_eq!(&response.flight_data[..], b"payload for /dashboard");
/// }
/// ```
pub struct Prefetcher<F> {
    queue: TaskQueue,
    fetcher: Arc<F>,
}

impl<F: ServerFetcher> Prefetcher<F> {
    /// Creates a prefetcher around the given server fetch collaborator.
    pub fn new(fetcher: F) -> Self {
        Self {
            queue: TaskQueue::new(MAX_CONCURRENT_PREFETCHES),
            fetcher: Arc::new(fetcher),
        }
    }

    /// Schedules a prefetch for `action`'s target.
    ///
    /// Prunes the cache, derives the primary key, and either reuses the
    /// existing entry (possibly upgrading its kind in place) or enqueues a
    /// fetch and writes a fresh entry at the primary key. Returns without
    /// suspending; the fetch result is left pending inside the entry's data
    /// handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, state: &mut RouterState, action: PrefetchAction) {
        let PrefetchAction { mut url, kind } = action;

        // The flight protocol parameter is server-side plumbing; it must not
        // leak into the cache key or the issued fetch.
        url.remove_query_param(FLIGHT_UNION_QUERY);

        let cache = state.prefetch_cache.clone();
        let primary_key = derive_cache_key(&url, None);

        // One lock for the whole lookup/decide/write sequence. Nothing in
        // here suspends, and the relocation guard in the enqueued task takes
        // the same lock, so it can never observe the map mid-decision.
        let mut entries = cache.lock();
        prune_expired(&mut entries);

        if let Some(entry) = entries.get_mut(&primary_key) {
            // A temporary entry was recorded during navigation without a real
            // intent; adopt the explicit one, same data handle.
            if entry.kind == PrefetchKind::Temporary && kind != PrefetchKind::Temporary {
                debug!(key = %primary_key, kind = ?kind, "upgrading temporary prefetch entry");
                entry.kind = kind;
            }

            // The one hit that still refetches: a full request landing on an
            // auto entry. Every other hit reuses the stored handle.
            if !(entry.kind == PrefetchKind::Auto && kind == PrefetchKind::Full) {
                debug!(key = %primary_key, "reusing prefetch entry");
                return;
            }
            debug!(key = %primary_key, "auto entry answering full request, refetching");
        }

        let request = FetchRequest {
            url: url.clone(),
            tree: Arc::clone(&state.tree),
            routing_context: state.routing_context.clone(),
            build_id: state.build_id.clone(),
            kind,
        };

        let fetcher = Arc::clone(&self.fetcher);
        let relocation = RelocationGuard {
            cache: cache.clone(),
            primary_key: primary_key.clone(),
            url: url.clone(),
            routing_context: state.routing_context.clone(),
        };

        debug!(key = %primary_key, kind = ?kind, "scheduling prefetch fetch");
        // Intentionally not awaited: the handle is stored in the entry and
        // unwrapped by whoever consumes the navigation.
        let handle = self.queue.enqueue(async move {
            let response = fetcher.fetch(request).await;
            if matches!(&response, Ok(r) if r.intercepted) {
                relocation.relocate();
            }
            response
        });

        entries.insert(
            primary_key,
            PrefetchEntry {
                tree_at_time_of_prefetch: Arc::clone(&state.tree),
                data: handle,
                kind,
                prefetch_time: Instant::now(),
                last_used_time: None,
            },
        );
    }
}

/// Moves an intercepted route's entry under its context-qualified key.
///
/// Captured at schedule time, applied after the fetch resolves.
struct RelocationGuard {
    cache: PrefetchCache,
    primary_key: String,
    url: TargetUrl,
    routing_context: Option<String>,
}

impl RelocationGuard {
    /// Re-keys the primary entry as `<context>%<base key>`, so a later
    /// unrelated prefetch at the base key cannot clobber it.
    ///
    /// Runs after a suspension point, so the entry must be re-checked: a
    /// concurrent schedule may have removed or replaced it in the interim,
    /// in which case relocation is silently skipped.
    fn relocate(&self) {
        let Some(context) = self.routing_context.as_deref().filter(|c| !c.is_empty()) else {
            return;
        };

        let mut entries = self.cache.lock();
        let Some(entry) = entries.remove(&self.primary_key) else {
            debug!(key = %self.primary_key, "relocation skipped, entry already gone");
            return;
        };

        let relocated_key = derive_cache_key(&self.url, Some(context));
        debug!(from = %self.primary_key, to = %relocated_key, "relocating intercepted prefetch entry");
        entries.insert(relocated_key, entry);
    }
}
