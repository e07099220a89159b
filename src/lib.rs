#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

#[macro_use]
mod tracing;

pub(crate) mod callback;
mod client;
mod dispatch;
mod error;
#[cfg(feature = "reqwest")]
mod http_transport;
mod param;
mod rejected;
mod request;
#[cfg(feature = "reqwest")]
mod runtime;
mod transport;
pub(crate) mod url;
pub(crate) mod util;

#[cfg(test)]
mod testing;

pub use callback::{Callback, CallbackFuture, Completion, SignalCancelled, channel};
pub use client::Client;
pub use dispatch::{Canceller, Pending};
pub use error::Fault;
pub use param::IntoParam;
pub use rejected::{ErrorDetail, RejectionMessage, RequestRejected, RequestSnapshot};
pub use request::{Options, RequestBuilder};
pub use transport::{AbortHandle, ResponseHead, Transport, Verb};
pub use url::{IntoUrl, Target, Url};

#[cfg(feature = "reqwest")]
pub use http_transport::{HttpTransport, HttpTransportBuilder};
#[cfg(feature = "reqwest")]
pub use runtime::{Runtime, block_on, runtime};

pub use http::Method;
pub use http::StatusCode;
/// Re-export the `http::header` module for header name constants.
pub use http::header;

/// A `Result` alias where the `Err` case is [`RequestRejected`].
pub type Result<T> = std::result::Result<T, RequestRejected>;
