//! Server fetch boundary.
//!
//! The network call that turns a navigation target into a flight payload is
//! an external collaborator. This module defines its contract: the
//! [`ServerFetcher`] seam, the [`FetchRequest`] it consumes, and the
//! [`ServerResponse`] it produces. The controller stores responses as
//! not-yet-resolved [`ResponseHandle`]s and never awaits them itself.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::cache::PrefetchKind;
use crate::href::TargetUrl;
use crate::queue::TaskHandle;
use crate::state::RouteTree;

/// A pending or completed server response, awaitable any number of times.
///
/// Fetch failures travel inside the handle and surface only when a consumer
/// unwraps it; the scheduling side never observes them.
pub type ResponseHandle = TaskHandle<Result<ServerResponse, FetchError>>;

/// Errors a fetch can resolve to.
///
/// `Clone` so the same failure can be observed from every clone of the
/// response handle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("server responded with status {status}")]
    Status { status: u16 },

    /// The request never produced a response.
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// The response arrived but its flight payload could not be decoded.
    #[error("flight payload could not be decoded: {message}")]
    Decode { message: String },
}

/// Everything the server fetch consumes for one prefetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Navigation target, already stripped of the flight protocol parameter.
    pub url: TargetUrl,
    /// Route tree active when the fetch was scheduled.
    pub tree: Arc<RouteTree>,
    /// Routing context active when the fetch was scheduled, if any.
    pub routing_context: Option<String>,
    /// Build the client was served from; lets the server reject skew.
    pub build_id: String,
    /// How complete a payload the caller asked for.
    pub kind: PrefetchKind,
}

/// A decoded server response for a navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    /// Opaque flight payload for the target.
    pub flight_data: Bytes,
    /// Canonical URL the server wants the client to show instead, if any.
    pub canonical_url_override: Option<String>,
    /// The server postponed part of the payload for a later resume.
    pub postponed: bool,
    /// The target resolved to an intercepted (overlay-style) route, so its
    /// cache entry must be re-addressed under a context-qualified key.
    pub intercepted: bool,
}

impl ServerResponse {
    /// Creates a plain response carrying only a flight payload.
    pub fn new(flight_data: impl Into<Bytes>) -> Self {
        Self {
            flight_data: flight_data.into(),
            canonical_url_override: None,
            postponed: false,
            intercepted: false,
        }
    }

    /// Sets the canonical URL override.
    #[must_use]
    pub fn canonical_url_override(mut self, url: impl Into<String>) -> Self {
        self.canonical_url_override = Some(url.into());
        self
    }

    /// Marks the payload as partially postponed.
    #[must_use]
    pub fn postponed(mut self, postponed: bool) -> Self {
        self.postponed = postponed;
        self
    }

    /// Marks the target as an intercepted route.
    #[must_use]
    pub fn intercepted(mut self, intercepted: bool) -> Self {
        self.intercepted = intercepted;
        self
    }
}

/// The seam the network collaborator plugs into.
///
/// Implemented for free by any `Fn(FetchRequest) -> impl Future` closure, so
/// tests and embedders can supply fetchers without a dedicated type:
///
/// ```
/// use preflight::{FetchError, FetchRequest, ServerFetcher, ServerResponse};
///
/// let fetcher = |request: FetchRequest| async move {
///     Ok::<_, FetchError>(ServerResponse::new(format!("payload for {}", request.url)))
/// };
/// // `fetcher` satisfies the trait bound below.
/// fn assert_fetcher(_: &impl ServerFetcher) {}
/// assert_fetcher(&fetcher);
/// ```
pub trait ServerFetcher: Send + Sync + 'static {
    /// Issues the fetch for one navigation target.
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<ServerResponse, FetchError>>;
}

impl<F, Fut> ServerFetcher for F
where
    F: Fn(FetchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ServerResponse, FetchError>> + Send + 'static,
{
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<ServerResponse, FetchError>> {
        (self)(request).boxed()
    }
}
