//! Native error detail reported by a transport.
//!
//! [`Fault`] is what a transport hands to the completion callback (or
//! returns synchronously) when a call fails before a usable response is
//! produced. It carries a `kind` classification with `is_*()` query
//! methods, plus the optional `code`, `signal`, and `stack` fields that
//! end up in the `error` sub-object of a
//! [`RequestRejected`](crate::RequestRejected).

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::io;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failure reported by a transport before (or instead of) a response.
///
/// Cheap to build and `Send + Sync`, so transports can move it across the
/// thread that completes the callback.
pub struct Fault {
    pub(crate) kind: FaultKind,
    pub(crate) message: String,
    pub(crate) code: Option<String>,
    pub(crate) signal: Option<String>,
    pub(crate) stack: Option<String>,
    pub(crate) source: Option<BoxError>,
}

/// Classification of a [`Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaultKind {
    /// Malformed configuration detected before any I/O.
    Builder,
    /// DNS, TCP connect, or TLS handshake failure.
    Connect,
    /// The transport gave up waiting.
    Timeout,
    /// Any other failure while sending or awaiting the response.
    Request,
    /// Reading the response body failed.
    Body,
    /// The in-flight call was cancelled.
    Aborted,
}

impl FaultKind {
    fn name(self) -> &'static str {
        match self {
            FaultKind::Builder => "BuilderError",
            FaultKind::Connect => "ConnectError",
            FaultKind::Timeout => "TimeoutError",
            FaultKind::Request => "RequestError",
            FaultKind::Body => "BodyError",
            FaultKind::Aborted => "AbortError",
        }
    }
}

impl Fault {
    /// Returns `true` if the request configuration was rejected before
    /// any I/O took place.
    pub fn is_builder(&self) -> bool {
        matches!(self.kind, FaultKind::Builder)
    }

    /// Returns `true` for DNS, connect, and TLS failures.
    pub fn is_connect(&self) -> bool {
        matches!(self.kind, FaultKind::Connect)
    }

    /// Returns `true` if the transport timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, FaultKind::Timeout)
    }

    /// Returns `true` for generic send/receive failures.
    pub fn is_request(&self) -> bool {
        matches!(self.kind, FaultKind::Request)
    }

    /// Returns `true` if the response body could not be read.
    pub fn is_body(&self) -> bool {
        matches!(self.kind, FaultKind::Body)
    }

    /// Returns `true` if the call was cancelled.
    pub fn is_aborted(&self) -> bool {
        matches!(self.kind, FaultKind::Aborted)
    }

    /// Stable error name, e.g. `"ConnectError"`.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// System-style error code such as `"ECONNREFUSED"`, when known.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Name of the signal that terminated the operation, when known.
    pub fn signal(&self) -> Option<&str> {
        self.signal.as_deref()
    }

    /// Backtrace captured at construction, if backtraces are enabled
    /// (`RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`).
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Attach a system-style error code (builder pattern).
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a signal name (builder pattern).
    #[must_use]
    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    /// Attach the underlying cause (builder pattern).
    ///
    /// If no code has been set yet and the source chain contains an
    /// [`io::Error`], the code is derived from its kind.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        if self.code.is_none() {
            self.code = io_kind_in_chain(&*source)
                .and_then(code_from_io_kind)
                .map(str::to_owned);
        }
        self.source = Some(source);
        self
    }

    fn with_kind(kind: FaultKind, msg: impl Into<String>) -> Self {
        let trace = Backtrace::capture();
        let stack = match trace.status() {
            BacktraceStatus::Captured => Some(trace.to_string()),
            _ => None,
        };
        Self {
            kind,
            message: msg.into(),
            code: None,
            signal: None,
            stack,
            source: None,
        }
    }

    /// Configuration error detected before any I/O.
    pub fn builder(msg: impl Into<String>) -> Self {
        Self::with_kind(FaultKind::Builder, msg)
    }

    /// Connection-phase failure.
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::with_kind(FaultKind::Connect, msg)
    }

    /// Transport-side timeout.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::with_kind(FaultKind::Timeout, msg).with_code("ETIMEDOUT")
    }

    /// Generic send/receive failure.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::with_kind(FaultKind::Request, msg)
    }

    /// Failure while reading the response body.
    pub fn body(msg: impl Into<String>) -> Self {
        Self::with_kind(FaultKind::Body, msg)
    }

    /// Cancellation of an in-flight call.
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::with_kind(FaultKind::Aborted, msg)
    }

    /// Classify an [`io::Error`] into a fault, keeping it as the source.
    pub fn from_io(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable => FaultKind::Connect,
            io::ErrorKind::TimedOut => FaultKind::Timeout,
            io::ErrorKind::UnexpectedEof => FaultKind::Body,
            _ => FaultKind::Request,
        };
        Self::with_kind(kind, err.to_string()).with_source(err)
    }

    /// Classify a `reqwest` error into a fault.
    #[cfg(feature = "reqwest")]
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FaultKind::Timeout
        } else if err.is_connect() {
            FaultKind::Connect
        } else if err.is_builder() {
            FaultKind::Builder
        } else if err.is_body() || err.is_decode() {
            FaultKind::Body
        } else {
            FaultKind::Request
        };
        let mut fault = Self::with_kind(kind, describe_chain(&err));
        if kind == FaultKind::Timeout {
            fault.code = Some("ETIMEDOUT".to_owned());
        }
        fault.with_source(err)
    }
}

impl fmt::Display for Fault {
    /// `"<name>: <message>"`, which is also the fallback for a missing
    /// stack in the serialized rejection.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("code", &self.code)
            .field("signal", &self.signal)
            .field("source", &self.source)
            .finish()
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for Fault {
    fn from(err: io::Error) -> Self {
        Fault::from_io(err)
    }
}

/// Walk a source chain and return the first [`io::ErrorKind`] found.
fn io_kind_in_chain(err: &(dyn std::error::Error + 'static)) -> Option<io::ErrorKind> {
    let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = cur {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        cur = e.source();
    }
    None
}

/// Map an [`io::ErrorKind`] to the conventional errno-style name.
fn code_from_io_kind(kind: io::ErrorKind) -> Option<&'static str> {
    let code = match kind {
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNABORTED",
        io::ErrorKind::NotConnected => "ENOTCONN",
        io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        io::ErrorKind::BrokenPipe => "EPIPE",
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        io::ErrorKind::PermissionDenied => "EACCES",
        _ => return None,
    };
    Some(code)
}

/// Join an error and its sources into one line (`outer: inner: root`).
#[cfg(feature = "reqwest")]
fn describe_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        let text = e.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        cur = e.source();
    }
    out
}

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Fault>();
};
