//! Request builder.
//!
//! [`RequestBuilder`] accumulates the URL, headers, JSON flag, and body of a
//! single request through chained calls, then dispatches it with one of the
//! verb methods ([`get`](RequestBuilder::get), [`post`](RequestBuilder::post),
//! ...). Obtain one via [`Client::request()`](crate::Client::request).

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::client::Client;
use crate::dispatch::Pending;
use crate::error::Fault;
use crate::param::{IntoParam, collect_params};
use crate::rejected::RequestSnapshot;
use crate::transport::Verb;
use crate::url::{IntoUrl, Target};

// The future returned by a verb method must be Send so callers can drive
// it on multi-threaded executors.
fn _assert_send_pending(rb: RequestBuilder) {
    fn require_send<T: Send>(_t: &T) {}
    let pending = rb.get();
    require_send(&pending);
}

// ---------------------------------------------------------------------------
// Options -- what the transport receives
// ---------------------------------------------------------------------------

/// The outgoing call, projected from a builder at dispatch time.
///
/// `body` is omitted from the serialized form when absent (not `null`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Options {
    /// Fully serialized URL.
    pub url: String,
    /// Header mapping.
    pub headers: BTreeMap<String, String>,
    /// JSON mode: serialize the body as JSON and expect JSON back.
    pub json: bool,
    /// Request body, if one was set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

// ---------------------------------------------------------------------------
// RequestBuilder
// ---------------------------------------------------------------------------

/// Accumulates request state through chained calls.
///
/// Every configuration method consumes the builder and returns it, so one
/// chain owns one request; a verb method consumes it for good. Clone the
/// builder to dispatch the same configuration more than once.
#[derive(Clone)]
pub struct RequestBuilder {
    client: Client,
    target: Target,
    headers: BTreeMap<String, String>,
    json: bool,
    body: Option<Value>,
    body_error: Option<String>,
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("url", &self.target.as_str())
            .field("headers", &self.headers)
            .field("json", &self.json)
            .field("body", &self.body.is_some())
            .finish()
    }
}

impl RequestBuilder {
    /// Create a builder. The URL is parsed eagerly; a failure is reported
    /// when the request is dispatched.
    pub(crate) fn new(client: Client, url: impl IntoUrl) -> Self {
        Self {
            client,
            target: url.into_target(),
            headers: BTreeMap::new(),
            json: true,
            body: None,
            body_error: None,
        }
    }

    // -- headers --

    /// Set one header, overwriting any previous value for `name`.
    /// Other headers are kept.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the whole header mapping.
    ///
    /// Headers set earlier are discarded, not merged.
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Remove every header.
    #[must_use]
    pub fn clear_headers(mut self) -> Self {
        self.headers.clear();
        self
    }

    /// Set `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> Self {
        self.header(http::header::AUTHORIZATION.as_str(), format!("Bearer {token}"))
    }

    /// Set `Authorization: Basic <base64(user:password)>`.
    #[must_use]
    pub fn basic_auth<U, P>(self, username: U, password: Option<P>) -> Self
    where
        U: std::fmt::Display,
        P: std::fmt::Display,
    {
        use base64::Engine as _;

        let credentials = match password {
            Some(p) => format!("{username}:{p}"),
            None => format!("{username}:"),
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.header(http::header::AUTHORIZATION.as_str(), format!("Basic {encoded}"))
    }

    // -- json --

    /// Toggle JSON mode (on by default).
    ///
    /// In JSON mode the body is sent as JSON with a JSON content type and
    /// the response body is parsed as JSON when possible.
    #[must_use]
    pub fn json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    // -- query --

    /// Add or overwrite one query parameter; other parameters are kept.
    ///
    /// An absent or empty `value` writes nothing at all, and neither does
    /// an empty `key`. Use [`clear_query`](Self::clear_query) to drop the
    /// whole query string.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl IntoParam) -> Self {
        if let Some(value) = value.into_param()
            && !key.is_empty()
        {
            self.target.set_query_param(key, value);
        }
        self
    }

    /// Add or overwrite every parameter in `pairs`, skipping absent or
    /// empty values.
    #[must_use]
    pub fn queries<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoParam,
    {
        pairs
            .into_iter()
            .fold(self, |rb, (k, v)| rb.query(k.as_ref(), v))
    }

    /// Remove the query string entirely.
    #[must_use]
    pub fn clear_query(mut self) -> Self {
        self.target.clear_query();
        self
    }

    // -- path --

    /// Append path segments to the current path.
    ///
    /// Absent or empty segments are dropped before appending, so
    /// `path([Some("h"), None])` yields `/h`. Passing no segments at all
    /// resets the path to `/`.
    ///
    /// ```rust,ignore
    /// client.request("http://host/api").path(["v1", "users"]); // /api/v1/users
    /// client.request("http://host/api").path(Vec::<&str>::new()); // /
    /// ```
    #[must_use]
    pub fn path<I>(mut self, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoParam,
    {
        let (given, kept) = collect_params(segments);
        if given == 0 {
            self.target.reset_path();
        } else {
            self.target.append_segments(&kept);
        }
        self
    }

    /// Append a single path segment unless it is absent or empty.
    #[must_use]
    pub fn segment(mut self, segment: impl IntoParam) -> Self {
        if let Some(segment) = segment.into_param() {
            self.target.append_segments(&[segment]);
        }
        self
    }

    /// Reset the path to `/`.
    #[must_use]
    pub fn reset_path(mut self) -> Self {
        self.target.reset_path();
        self
    }

    // -- body --

    /// Set the body, replacing any previous one.
    ///
    /// The value is converted to JSON immediately; a conversion failure is
    /// reported when the request is dispatched. A value that serializes to
    /// `null` (such as `None`) clears the body.
    #[must_use]
    pub fn body<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => {
                self.body = (!value.is_null()).then_some(value);
                self.body_error = None;
            }
            Err(e) => {
                self.body = None;
                self.body_error = Some(e.to_string());
            }
        }
        self
    }

    // -- accessors --

    /// The serialized URL as currently configured.
    pub fn url(&self) -> &str {
        self.target.as_str()
    }

    /// The request target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The current header mapping.
    pub fn header_map(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Whether JSON mode is on.
    pub fn is_json(&self) -> bool {
        self.json
    }

    /// The stored body, if any.
    pub fn body_value(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Project the current state into the options a transport receives.
    ///
    /// Fails if the URL could not be parsed or the body could not be
    /// serialized.
    pub fn options(&self) -> Result<Options, Fault> {
        if let Some(fault) = self.target.fault() {
            return Err(fault);
        }
        if let Some(msg) = &self.body_error {
            return Err(Fault::builder(format!("body serialization failed: {msg}")));
        }
        Ok(Options {
            url: self.target.as_str().to_owned(),
            headers: self.headers.clone(),
            json: self.json,
            body: self.body.clone(),
        })
    }

    pub(crate) fn snapshot(&self, verb: Verb) -> RequestSnapshot {
        RequestSnapshot::new(verb, self.target.as_str(), &self.headers)
    }

    // -- dispatch --

    /// Dispatch with `verb`.
    pub fn send(self, verb: Verb) -> Pending {
        let transport = self.client.transport();
        Pending::dispatch(&*transport, verb, &self)
    }

    /// Dispatch as `GET`.
    pub fn get(self) -> Pending {
        self.send(Verb::Get)
    }

    /// Dispatch as `POST`.
    pub fn post(self) -> Pending {
        self.send(Verb::Post)
    }

    /// Dispatch as `PUT`.
    pub fn put(self) -> Pending {
        self.send(Verb::Put)
    }

    /// Dispatch as `PATCH`.
    pub fn patch(self) -> Pending {
        self.send(Verb::Patch)
    }

    /// Dispatch as `DELETE`.
    pub fn delete(self) -> Pending {
        self.send(Verb::Delete)
    }

    /// Dispatch as `HEAD`.
    pub fn head(self) -> Pending {
        self.send(Verb::Head)
    }
}
