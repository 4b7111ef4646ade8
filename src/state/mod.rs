//! Navigation state container and prefetch actions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{PrefetchCache, PrefetchKind};
use crate::href::TargetUrl;

/// A snapshot of the client's route tree.
///
/// Each node is a segment plus its named parallel children. The prefetch
/// layer treats the tree as opaque: it records the snapshot active at
/// schedule time and forwards it to the server fetch, nothing more.
///
/// # Examples
///
/// ```
/// use preflight::RouteTree;
///
/// let tree = RouteTree::leaf("").with_child(
///     "children",
///     RouteTree::leaf("dashboard"),
/// );
/// let json = serde_json::to_string(&tree).unwrap();
/// assert_eq!(
///     json,
///     r#"{"segment":"","parallel_routes":{"children":{"segment":"dashboard"}}}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTree {
    /// Path segment this node matched.
    pub segment: String,
    /// Child trees keyed by parallel route slot name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parallel_routes: BTreeMap<String, RouteTree>,
}

impl RouteTree {
    /// Creates a node with no children.
    pub fn leaf(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            parallel_routes: BTreeMap::new(),
        }
    }

    /// Adds a child under the given parallel route slot.
    #[must_use]
    pub fn with_child(mut self, slot: impl Into<String>, child: RouteTree) -> Self {
        self.parallel_routes.insert(slot.into(), child);
        self
    }
}

/// The navigation state the prefetch controller reads and mutates.
///
/// Owns the route-tree snapshot and the prefetch cache map; the controller
/// reads, writes, and relocates cache entries but never replaces the map.
#[derive(Debug, Clone)]
pub struct RouterState {
    /// Currently rendered route tree.
    pub tree: Arc<RouteTree>,
    /// Routing context for interception-aware routing, if active. Opaque;
    /// only used to qualify relocated cache keys.
    pub routing_context: Option<String>,
    /// Build identifier the client was served from.
    pub build_id: String,
    /// Shared prefetch cache map.
    pub prefetch_cache: PrefetchCache,
}

impl RouterState {
    /// Creates a state with an empty prefetch cache and no routing context.
    pub fn new(tree: RouteTree, build_id: impl Into<String>) -> Self {
        Self {
            tree: Arc::new(tree),
            routing_context: None,
            build_id: build_id.into(),
            prefetch_cache: PrefetchCache::new(),
        }
    }

    /// Sets the routing context.
    #[must_use]
    pub fn with_routing_context(mut self, context: impl Into<String>) -> Self {
        self.routing_context = Some(context.into());
        self
    }
}

/// A request to prefetch one navigation target.
#[derive(Debug, Clone)]
pub struct PrefetchAction {
    /// Target to prefetch.
    pub url: TargetUrl,
    /// Requested completeness.
    pub kind: PrefetchKind,
}

impl PrefetchAction {
    /// Creates an action for the given target and intent.
    pub fn new(url: TargetUrl, kind: PrefetchKind) -> Self {
        Self { url, kind }
    }
}
