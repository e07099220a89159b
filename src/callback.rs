//! Completion callback -> Future bridge.
//!
//! A transport receives a [`Callback`] with every call and reports the
//! outcome through [`Callback::complete`] from whatever thread or task
//! finishes the I/O. The dispatcher holds the paired [`CallbackFuture`].
//!
//! `complete` consumes the callback, so it fires at most once. A
//! callback that is dropped without completing (the transport aborted
//! or lost the call) resolves the future with [`SignalCancelled`].
//!
//! Executor-agnostic: built on `futures_channel::oneshot`.

use futures_channel::oneshot;
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::Fault;
use crate::transport::ResponseHead;

/// What the transport reported: `(error, response, body)`.
#[derive(Debug)]
pub struct Completion {
    /// Native error, if the call failed.
    pub error: Option<Fault>,
    /// Response metadata, if a response was received.
    pub response: Option<ResponseHead>,
    /// Response body. `Value::Null` when there is none.
    pub body: Value,
}

/// One-shot completion callback handed to a [`Transport`](crate::Transport).
#[derive(Debug)]
pub struct Callback {
    sender: oneshot::Sender<Completion>,
}

impl Callback {
    /// Report the outcome of the call.
    ///
    /// A no-op if the dispatcher has already gone away (cancelled or
    /// dropped).
    pub fn complete(self, error: Option<Fault>, response: Option<ResponseHead>, body: Value) {
        let _ = self.sender.send(Completion {
            error,
            response,
            body,
        });
    }

    /// Shorthand for a successful response.
    pub fn respond(self, response: ResponseHead, body: Value) {
        self.complete(None, Some(response), body);
    }

    /// Shorthand for a failure without a response.
    pub fn fail(self, error: Fault) {
        self.complete(Some(error), None, Value::Null);
    }

    /// Returns `true` if nobody is waiting for the outcome any more.
    pub fn is_canceled(&self) -> bool {
        self.sender.is_canceled()
    }
}

/// Future returned by [`channel`].
#[derive(Debug)]
pub struct CallbackFuture(oneshot::Receiver<Completion>);

/// Error returned when the [`Callback`] is dropped without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalCancelled;

impl std::fmt::Display for SignalCancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("completion callback dropped without being called")
    }
}

impl std::error::Error for SignalCancelled {}

/// Create a connected callback / future pair.
pub fn channel() -> (Callback, CallbackFuture) {
    let (sender, receiver) = oneshot::channel();
    (Callback { sender }, CallbackFuture(receiver))
}

impl Future for CallbackFuture {
    type Output = Result<Completion, SignalCancelled>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // oneshot::Receiver is Unpin.
        Pin::new(&mut self.get_mut().0)
            .poll(cx)
            .map(|r| r.map_err(|_| SignalCancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn complete_from_another_thread() {
        let (callback, future) = channel();

        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            callback.complete(None, None, Value::from(42));
        });

        let completion = futures_executor::block_on(future).expect("completed");
        assert!(completion.error.is_none());
        assert!(completion.response.is_none());
        assert_eq!(completion.body, Value::from(42));
    }

    #[test]
    fn complete_before_poll_still_works() {
        let (callback, future) = channel();
        callback.fail(Fault::connect("refused"));
        let completion = futures_executor::block_on(future).expect("completed");
        assert!(completion.error.expect("error").is_connect());
    }

    #[test]
    fn dropped_callback_returns_cancelled() {
        let (callback, future) = channel();
        drop(callback);
        assert_eq!(futures_executor::block_on(future).unwrap_err(), SignalCancelled);
    }

    #[test]
    fn complete_after_receiver_dropped_is_harmless() {
        let (callback, future) = channel();
        drop(future);
        assert!(callback.is_canceled());
        callback.complete(None, None, Value::Null);
    }

    #[test]
    fn signal_cancelled_display() {
        let s = format!("{SignalCancelled}");
        assert!(s.contains("dropped"), "{s}");
    }
}
