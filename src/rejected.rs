//! The single error kind every failed dispatch produces.
//!
//! [`RequestRejected`] is a detached, serializable snapshot of a failure.
//! It never holds live transport objects, only what is needed to
//! diagnose the failure:
//!
//! ```json
//! {
//!   "message": {
//!     "error":          { "message", "stack", "name", "code"?, "signal"? },
//!     "requestBuilder": { "method", "url", "headers" },
//!     "response":       { "statusCode", "statusMessage", "headers" }
//!   },
//!   "stack": "..."
//! }
//! ```
//!
//! `error` is present when the transport failed, `response` when a
//! response was received with a status outside `200..=299`. Callers
//! tell the two apart by which one is set ([`is_transport`] /
//! [`is_status`]), not by separate error types.
//!
//! [`is_transport`]: RequestRejected::is_transport
//! [`is_status`]: RequestRejected::is_status

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Fault;
use crate::transport::{ResponseHead, Verb};

/// Flattened copy of the native error's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    /// Error message.
    pub message: String,
    /// Captured backtrace, or the error's `Display` output when none was
    /// captured.
    pub stack: String,
    /// Error name, e.g. `"ConnectError"`.
    pub name: String,
    /// Errno-style code, e.g. `"ECONNREFUSED"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Terminating signal name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
}

impl ErrorDetail {
    fn capture(fault: &Fault) -> Self {
        Self {
            message: fault.message().to_owned(),
            stack: stack_of(fault),
            name: fault.name().to_owned(),
            code: fault.code().map(str::to_owned),
            signal: fault.signal().map(str::to_owned),
        }
    }
}

/// The request as it was configured at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSnapshot {
    /// The verb actually dispatched.
    pub method: String,
    /// Serialized URL.
    pub url: String,
    /// Header mapping.
    pub headers: BTreeMap<String, String>,
}

impl RequestSnapshot {
    pub(crate) fn new(verb: Verb, url: &str, headers: &BTreeMap<String, String>) -> Self {
        Self {
            method: verb.as_str().to_owned(),
            url: url.to_owned(),
            headers: headers.clone(),
        }
    }
}

/// The three structured parts of a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionMessage {
    /// Native error detail; absent for status failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// The request that was sent.
    pub request_builder: RequestSnapshot,
    /// Response metadata; absent for transport failures. No body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseHead>,
}

/// A dispatched request failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRejected {
    message: RejectionMessage,
    stack: String,
    #[serde(skip)]
    cancelled: bool,
}

impl RequestRejected {
    /// Normalize a failure into a rejection.
    ///
    /// `error` and `response` are each optional; whichever is present is
    /// snapshotted. The top-level stack is the error's stack (or its
    /// `Display` output), or empty when there is no error.
    pub fn new(error: Option<&Fault>, request: RequestSnapshot, response: Option<&ResponseHead>) -> Self {
        Self {
            message: RejectionMessage {
                error: error.map(ErrorDetail::capture),
                request_builder: request,
                response: response.cloned(),
            },
            stack: error.map(stack_of).unwrap_or_default(),
            cancelled: error.is_some_and(Fault::is_aborted),
        }
    }

    /// The structured payload.
    pub fn message(&self) -> &RejectionMessage {
        &self.message
    }

    /// Top-level stack; empty for status failures.
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Native error detail, if the transport failed.
    pub fn error(&self) -> Option<&ErrorDetail> {
        self.message.error.as_ref()
    }

    /// The request as dispatched.
    pub fn request(&self) -> &RequestSnapshot {
        &self.message.request_builder
    }

    /// Response metadata, if a response was received.
    pub fn response(&self) -> Option<&ResponseHead> {
        self.message.response.as_ref()
    }

    /// The response status, if a response was received.
    pub fn status(&self) -> Option<http::StatusCode> {
        self.response().map(|r| r.status)
    }

    /// Returns `true` if a response arrived with a non-2xx status.
    pub fn is_status(&self) -> bool {
        self.message.error.is_none() && self.message.response.is_some()
    }

    /// Returns `true` if the transport failed (including cancellation).
    pub fn is_transport(&self) -> bool {
        self.message.error.is_some()
    }

    /// Returns `true` if the request was cancelled before it settled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        // Every field is a string, map of strings, or integer.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for RequestRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let req = &self.message.request_builder;
        write!(f, "request rejected: {} {}", req.method, req.url)?;
        if let Some(resp) = &self.message.response {
            write!(f, " responded {} {}", resp.status.as_u16(), resp.status_message)?;
        }
        if let Some(err) = &self.message.error {
            write!(f, " ({}: {})", err.name, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestRejected {}

fn stack_of(fault: &Fault) -> String {
    fault
        .stack()
        .map(str::to_owned)
        .unwrap_or_else(|| fault.to_string())
}

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RequestRejected>();
};
