//! # preflight
//!
//! A client-side navigation prefetch cache: given a navigation target and a
//! prefetch intent, it decides whether a previously fetched server response
//! can be reused, schedules new fetches through a bounded-concurrency queue,
//! and stores results as not-yet-resolved handles that navigation unwraps
//! later.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use preflight::{
//!     FetchError, FetchRequest, PrefetchAction, PrefetchKind, Prefetcher, RouteTree,
//!     RouterState, ServerResponse, TargetUrl,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     // The network collaborator: any closure taking a FetchRequest works.
//!     let prefetcher = Prefetcher::new(|request: FetchRequest| async move {
//!         Ok::<_, FetchError>(ServerResponse::new(format!("payload for {}", request.url)))
//!     });
//!
//!     let mut state = RouterState::new(RouteTree::leaf(""), "build-1");
//!     prefetcher.schedule(
//!         &mut state,
//!         PrefetchAction::new(TargetUrl::parse("/dashboard"), PrefetchKind::Auto),
//!     );
//!
//!     let entry = state.prefetch_cache.get("/dashboard").unwrap();
//!     let response = entry.data.resolved().await.unwrap().unwrap();
//!     assert_eq!(&response.flight_data[..], b"payload for /dashboard");
//! }
//! ```

pub mod cache;
pub mod fetch;
pub mod href;
pub mod prefetch;
pub mod queue;
pub mod state;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{PrefetchCache, PrefetchEntry, PrefetchKind, derive_cache_key};
pub use fetch::{FetchError, FetchRequest, ResponseHandle, ServerFetcher, ServerResponse};
pub use href::{FLIGHT_UNION_QUERY, TargetUrl};
pub use prefetch::{MAX_CONCURRENT_PREFETCHES, Prefetcher};
pub use queue::{QueueError, TaskHandle, TaskQueue};
pub use state::{PrefetchAction, RouteTree, RouterState};
