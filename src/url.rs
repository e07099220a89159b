//! Request target: URL parsing and in-place mutation.
//!
//! [`Target`] wraps a [`url::Url`] and exposes only the operations the
//! builder needs: add/overwrite one query parameter, clear the query,
//! append path segments, reset the path, and serialize. Parsing happens
//! eagerly when the builder is created; a failure is remembered and
//! surfaced when the request is dispatched, while every mutation in between
//! becomes a no-op.
//!
//! New query pairs use `application/x-www-form-urlencoded` escaping:
//! reserved and non-ASCII characters are percent-encoded byte by byte
//! from their UTF-8 form (`é` becomes `%C3%A9`) and spaces become `+`.
//! Pairs already in the URL are never re-encoded.

use crate::error::Fault;

pub use url::Url;
use url::form_urlencoded;

/// Why a [`Target`] could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TargetError {
    Parse(url::ParseError),
    UnsupportedScheme(String),
}

impl TargetError {
    pub(crate) fn to_fault(&self, raw: &str) -> Fault {
        match self {
            TargetError::Parse(e) => Fault::builder(format!("invalid url {raw:?}")).with_source(*e),
            TargetError::UnsupportedScheme(scheme) => {
                Fault::builder(format!("unsupported url scheme {scheme:?} in {raw:?}"))
            }
        }
    }
}

/// A parsed request URL, or the reason it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    inner: Result<Url, (String, TargetError)>,
}

impl Target {
    fn from_url(url: Url) -> Self {
        match url.scheme() {
            "http" | "https" => Self { inner: Ok(url) },
            other => {
                let err = TargetError::UnsupportedScheme(other.to_owned());
                Self {
                    inner: Err((url.as_str().to_owned(), err)),
                }
            }
        }
    }

    fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) => Self::from_url(url),
            Err(e) => Self {
                inner: Err((raw.to_owned(), TargetError::Parse(e))),
            },
        }
    }

    /// Serialized URL; the raw input when parsing failed.
    pub fn as_str(&self) -> &str {
        match &self.inner {
            Ok(url) => url.as_str(),
            Err((raw, _)) => raw,
        }
    }

    /// The parsed URL, if parsing succeeded.
    pub fn url(&self) -> Option<&Url> {
        self.inner.as_ref().ok()
    }

    /// The deferred parse failure as a [`Fault`], if any.
    pub(crate) fn fault(&self) -> Option<Fault> {
        self.inner.as_ref().err().map(|(raw, e)| e.to_fault(raw))
    }

    /// Current query pairs, decoded.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match &self.inner {
            Ok(url) => url.query_pairs().into_owned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Set `key` to `value`, leaving every other parameter in place.
    ///
    /// Only the new `key=value` pair is encoded; other pairs are kept byte
    /// for byte, bare flags and odd escapes included. An existing `key`
    /// keeps its position and any duplicates of it are dropped; a new key
    /// is appended.
    pub(crate) fn set_query_param(&mut self, key: &str, value: String) {
        let Ok(url) = &mut self.inner else {
            return;
        };
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair(key, &value)
            .finish();

        let mut pairs: Vec<&str> = Vec::new();
        let mut placed = false;
        for raw in url.query().unwrap_or_default().split('&') {
            if raw.is_empty() {
                continue;
            }
            if !pair_has_key(raw, key) {
                pairs.push(raw);
            } else if !placed {
                pairs.push(&encoded);
                placed = true;
            }
        }
        if !placed {
            pairs.push(&encoded);
        }
        let query = pairs.join("&");
        url.set_query(Some(&query));
    }

    /// Remove the query string entirely (no trailing `?`).
    pub(crate) fn clear_query(&mut self) {
        if let Ok(url) = &mut self.inner {
            url.set_query(None);
        }
    }

    /// Current path segments as they appear in the path (percent-encoded),
    /// without the empty segment a bare `/` or a trailing slash produces.
    pub fn segments(&self) -> Vec<String> {
        match &self.inner {
            Ok(url) => url
                .path_segments()
                .map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_owned).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Append segments after the current path. Each segment is
    /// percent-encoded, so a `/` inside one does not split it.
    pub(crate) fn append_segments(&mut self, segments: &[String]) {
        if let Ok(url) = &mut self.inner
            && let Ok(mut path) = url.path_segments_mut()
        {
            path.pop_if_empty().extend(segments);
        }
    }

    /// Reset the path to `/`.
    pub(crate) fn reset_path(&mut self) {
        if let Ok(url) = &mut self.inner
            && let Ok(mut path) = url.path_segments_mut()
        {
            path.clear();
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the raw `name[=value]` pair decodes to `key`.
fn pair_has_key(raw: &str, key: &str) -> bool {
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .is_some_and(|(k, _)| k == key)
}

/// Types that can become a request [`Target`].
///
/// Implemented for `&str`, `String`, `&String`, [`Url`], and `&Url`.
/// Parsing never fails here: an invalid URL is carried inside the target
/// and reported when the request is dispatched.
pub trait IntoUrl {
    /// Parse into a [`Target`].
    fn into_target(self) -> Target;
}

impl IntoUrl for &str {
    fn into_target(self) -> Target {
        Target::parse(self)
    }
}

impl IntoUrl for String {
    fn into_target(self) -> Target {
        Target::parse(&self)
    }
}

impl IntoUrl for &String {
    fn into_target(self) -> Target {
        Target::parse(self)
    }
}

impl IntoUrl for Url {
    fn into_target(self) -> Target {
        Target::from_url(self)
    }
}

impl IntoUrl for &Url {
    fn into_target(self) -> Target {
        Target::from_url(self.clone())
    }
}

impl IntoUrl for Target {
    fn into_target(self) -> Target {
        self
    }
}
