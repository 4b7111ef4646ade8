//! Prefetch cache key derivation.

use crate::href::TargetUrl;

/// Derives the cache key identifying a prefetch slot.
///
/// The base key is the target's fragment-stripped href, so targets differing
/// only by fragment share a slot. A non-empty routing context prefixes the
/// base key as `<context>%<base key>`, giving intercepted routes a cache
/// identity distinct from the plain target at the same URL.
///
/// The `%` delimiter is assumed not to occur in either component; it is not
/// escaped, so a context or href containing a literal `%` can collide with an
/// unrelated key. Known limitation, kept for key-format stability.
///
/// # Examples
///
/// ```
/// use preflight::{TargetUrl, derive_cache_key};
///
/// let url = TargetUrl::parse("/a/b#frag");
/// assert_eq!(derive_cache_key(&url, None), "/a/b");
/// assert_eq!(
///     derive_cache_key(&url, Some("/intercept-base")),
///     "/intercept-base%/a/b"
/// );
/// ```
pub fn derive_cache_key(url: &TargetUrl, routing_context: Option<&str>) -> String {
    let base = url.href();
    match routing_context {
        Some(context) if !context.is_empty() => format!("{context}%{base}"),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_never_affects_the_key() {
        let plain = TargetUrl::parse("/a/b?x=1");
        let with_fragment = TargetUrl::parse("/a/b?x=1#section-3");
        assert_eq!(
            derive_cache_key(&plain, None),
            derive_cache_key(&with_fragment, None)
        );
    }

    #[test]
    fn distinct_contexts_give_distinct_keys() {
        let url = TargetUrl::parse("/photos/42");
        let k1 = derive_cache_key(&url, Some("/feed"));
        let k2 = derive_cache_key(&url, Some("/profile"));
        assert_ne!(k1, k2);
        assert_eq!(k1, "/feed%/photos/42");
        assert_eq!(k2, "/profile%/photos/42");
    }

    #[test]
    fn empty_context_is_the_base_key() {
        let url = TargetUrl::parse("/a/b");
        assert_eq!(derive_cache_key(&url, Some("")), "/a/b");
        assert_eq!(derive_cache_key(&url, None), "/a/b");
    }
}
