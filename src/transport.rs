//! The transport contract.
//!
//! A [`Transport`] performs the actual I/O. The dispatcher hands it a verb,
//! the projected [`Options`](crate::Options), and a one-shot
//! [`Callback`]. The transport returns an [`AbortHandle`] that cancels the
//! in-flight call, or a [`Fault`] if it cannot even start the call.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::callback::Callback;
use crate::error::Fault;
use crate::request::Options;

/// HTTP verbs a request can be dispatched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
}

impl Verb {
    /// Every supported verb.
    pub const ALL: [Verb; 7] = [
        Verb::Get,
        Verb::Post,
        Verb::Put,
        Verb::Patch,
        Verb::Delete,
        Verb::Head,
        Verb::Options,
    ];

    /// The matching [`http::Method`].
    pub fn method(self) -> http::Method {
        match self {
            Verb::Get => http::Method::GET,
            Verb::Post => http::Method::POST,
            Verb::Put => http::Method::PUT,
            Verb::Patch => http::Method::PATCH,
            Verb::Delete => http::Method::DELETE,
            Verb::Head => http::Method::HEAD,
            Verb::Options => http::Method::OPTIONS,
        }
    }

    /// Upper-case method name, e.g. `"POST"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Head => "HEAD",
            Verb::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status line and headers of a received response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHead {
    /// Status code.
    #[serde(rename = "statusCode", serialize_with = "serialize_status")]
    pub status: http::StatusCode,
    /// Reason phrase, e.g. `"Internal Server Error"`.
    pub status_message: String,
    /// Response headers, names lower-cased by the transport.
    pub headers: BTreeMap<String, String>,
}

fn serialize_status<S: serde::Serializer>(
    status: &http::StatusCode,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.as_u16())
}

impl ResponseHead {
    /// A head with the canonical reason phrase and no headers.
    pub fn new(status: http::StatusCode) -> Self {
        Self {
            status,
            status_message: status.canonical_reason().unwrap_or_default().to_owned(),
            headers: BTreeMap::new(),
        }
    }

    /// Add a header (builder pattern).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns `true` if the status is in `200..=299`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Cancels one in-flight transport call.
///
/// Wraps the transport's own abort operation. Running it more than once
/// is impossible: [`abort`](Self::abort) consumes the handle.
pub struct AbortHandle {
    hook: Option<Box<dyn FnOnce() + Send>>,
}

impl AbortHandle {
    /// Wrap an abort operation.
    pub fn new(hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            hook: Some(Box::new(hook)),
        }
    }

    /// A handle for calls that cannot be aborted (or already finished).
    pub fn noop() -> Self {
        Self { hook: None }
    }

    /// Run the abort operation.
    pub fn abort(self) {
        if let Some(hook) = self.hook {
            hook();
        }
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortHandle")
            .field("noop", &self.hook.is_none())
            .finish()
    }
}

/// Performs HTTP calls on behalf of the dispatcher.
///
/// Implementations must eventually either call
/// [`Callback::complete`] or drop the callback; the latter settles the
/// request as cancelled.
pub trait Transport: Send + Sync {
    /// Start a call.
    ///
    /// Returning `Err` means the call never started; the callback is
    /// dropped and the request rejects with the returned fault.
    fn call(&self, verb: Verb, options: Options, callback: Callback) -> Result<AbortHandle, Fault>;
}

impl<F> Transport for F
where
    F: Fn(Verb, Options, Callback) -> Result<AbortHandle, Fault> + Send + Sync,
{
    fn call(&self, verb: Verb, options: Options, callback: Callback) -> Result<AbortHandle, Fault> {
        self(verb, options, callback)
    }
}
