//! Navigation target URLs.
//!
//! A [`TargetUrl`] is the path-relative part of a navigation target:
//! `path[?query][#fragment]`. Scheme and host never influence prefetch
//! identity, so they are not modeled. The fragment is parsed but excluded
//! from [`TargetUrl::href`], because it does not affect what the server
//! returns.

use std::fmt;

/// Query parameter reserved for the flight protocol.
///
/// The server uses it to disambiguate payload requests from plain document
/// requests. It is stripped from every navigation target before cache-key
/// derivation and before the fetch is issued, so it never becomes part of
/// navigation identity.
pub const FLIGHT_UNION_QUERY: &str = "_flight_";

/// A parsed navigation target.
///
/// Query pairs preserve their original order and encoding, so the same href
/// string always serializes back to the same base key.
///
/// # Examples
///
/// ```
/// use preflight::TargetUrl;
///
/// let url = TargetUrl::parse("/docs/intro?tab=api#setup");
/// assert_eq!(url.path(), "/docs/intro");
/// assert_eq!(url.query_param("tab"), Some("api"));
/// assert_eq!(url.fragment(), Some("setup"));
/// // The fragment never reaches the server, so it is not part of the href.
/// assert_eq!(url.href(), "/docs/intro?tab=api");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    path: String,
    query: Vec<(String, Option<String>)>,
    fragment: Option<String>,
}

impl TargetUrl {
    /// Parses a target from `path[?query][#fragment]`.
    ///
    /// Total over its input: anything before `?`/`#` is the path, even the
    /// empty string. Query values are kept verbatim; a bare key (`?flag`)
    /// is distinguished from an empty value (`?flag=`).
    pub fn parse(raw: &str) -> Self {
        let (without_fragment, fragment) = match raw.split_once('#') {
            Some((head, frag)) => (head, Some(frag.to_owned())),
            None => (raw, None),
        };

        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path.to_owned(), parse_query(query)),
            None => (without_fragment.to_owned(), Vec::new()),
        };

        Self {
            path,
            query,
            fragment,
        }
    }

    /// Returns the path component.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the fragment component, without the leading `#`, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Returns the first value for the given query key, if any.
    ///
    /// A bare key (`?flag`) yields `Some("")`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    /// Removes every query pair with the given key.
    ///
    /// Returns `true` if any pair was removed.
    pub fn remove_query_param(&mut self, key: &str) -> bool {
        let before = self.query.len();
        self.query.retain(|(k, _)| k != key);
        self.query.len() < before
    }

    /// Serializes the target as `path[?query]`, with the fragment stripped.
    ///
    /// This is the *base key* representation used for cache-key derivation:
    /// two targets differing only by fragment produce the same href.
    pub fn href(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }

        let mut out = String::with_capacity(self.path.len() + 1 + self.query.len() * 8);
        out.push_str(&self.path);
        out.push('?');
        for (i, (key, value)) in self.query.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            out.push_str(key);
            if let Some(value) = value {
                out.push('=');
                out.push_str(value);
            }
        }
        out
    }
}

impl fmt::Display for TargetUrl {
    /// Writes the full target, fragment included.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Splits a raw query string into ordered `(key, value)` pairs.
///
/// No percent-decoding is applied; pairs round-trip byte-for-byte so key
/// derivation stays stable across parses of the same href.
fn parse_query(query: &str) -> Vec<(String, Option<String>)> {
    if query.is_empty() {
        return Vec::new();
    }

    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_owned(), Some(value.to_owned())),
            None => (pair.to_owned(), None),
        })
        .collect()
}
