//! Dispatching a configured request.
//!
//! [`Pending`] is the future a verb method returns. The transport is
//! invoked eagerly, when the verb method is called; the future only waits
//! for the completion callback and classifies the outcome:
//!
//! - resolve with the body when there is no error and either no response
//!   or a response with a status in `200..=299`;
//! - otherwise reject with a [`RequestRejected`].
//!
//! A transport that fails to start the call rejects the future right
//! away, with no response.
//!
//! Cancellation ([`Pending::cancel`], a detached [`Canceller`], or dropping
//! an unsettled `Pending`) runs the transport's abort hook once and
//! settles the future as cancelled. Cancelling a settled request does
//! nothing.

use serde_json::Value;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_util::task::AtomicWaker;

use crate::callback::{self, CallbackFuture, Completion};
use crate::error::Fault;
use crate::rejected::{RequestRejected, RequestSnapshot};
use crate::request::RequestBuilder;
use crate::transport::{AbortHandle, Transport, Verb};
use crate::util::lock_or_clear;

/// Shared between a [`Pending`] and its [`Canceller`]s.
struct Shared {
    /// `Some` while the call is in flight; taken on settle or cancel.
    abort: Mutex<Option<AbortHandle>>,
    cancelled: AtomicBool,
    waker: AtomicWaker,
}

impl Shared {
    fn new(abort: Option<AbortHandle>) -> Arc<Self> {
        Arc::new(Self {
            abort: Mutex::new(abort),
            cancelled: AtomicBool::new(false),
            waker: AtomicWaker::new(),
        })
    }

    /// Abort the call if it is still in flight. Returns `true` if this
    /// call did the cancelling.
    fn cancel(&self) -> bool {
        let handle = {
            let mut slot = lock_or_clear(&self.abort);
            let Some(handle) = slot.take() else {
                return false;
            };
            // Set under the lock so a losing `settle` always sees it.
            self.cancelled.store(true, Ordering::Release);
            handle
        };
        handle.abort();
        self.waker.wake();
        true
    }

    /// Mark the call as settled; later cancels become no-ops. Returns
    /// `false` if a cancel got there first.
    fn settle(&self) -> bool {
        lock_or_clear(&self.abort).take().is_some()
    }
}

enum State {
    InFlight {
        completion: CallbackFuture,
        request: RequestSnapshot,
    },
    Rejected(Box<RequestRejected>),
    Cancelled(RequestSnapshot),
    Done,
}

/// A dispatched request.
///
/// Resolves with the response body, or a [`RequestRejected`].
#[must_use = "dropping a Pending cancels the request"]
pub struct Pending {
    state: State,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::InFlight { .. } => "in-flight",
            State::Rejected(_) => "rejected",
            State::Cancelled(_) => "cancelled",
            State::Done => "done",
        };
        f.debug_struct("Pending").field("state", &state).finish()
    }
}

impl Pending {
    /// Project `request` into options and hand them to `transport`.
    pub(crate) fn dispatch(transport: &dyn Transport, verb: Verb, request: &RequestBuilder) -> Self {
        let snapshot = request.snapshot(verb);
        debug!(method = verb.as_str(), url = %snapshot.url, "dispatching request");

        let options = match request.options() {
            Ok(options) => options,
            Err(fault) => return Self::rejected(&fault, snapshot),
        };

        let (callback, completion) = callback::channel();
        match transport.call(verb, options, callback) {
            Ok(abort) => Self {
                state: State::InFlight {
                    completion,
                    request: snapshot,
                },
                shared: Shared::new(Some(abort)),
            },
            Err(fault) => Self::rejected(&fault, snapshot),
        }
    }

    fn rejected(fault: &Fault, request: RequestSnapshot) -> Self {
        trace!(name = fault.name(), "transport call failed to start");
        Self {
            state: State::Rejected(Box::new(RequestRejected::new(Some(fault), request, None))),
            shared: Shared::new(None),
        }
    }

    /// Cancel the request.
    ///
    /// Runs the transport's abort hook and makes the future resolve with
    /// a cancelled [`RequestRejected`]. A no-op once the request settled.
    pub fn cancel(&mut self) {
        if self.shared.cancel()
            && let State::InFlight { request, .. } = std::mem::replace(&mut self.state, State::Done)
        {
            self.state = State::Cancelled(request);
        }
    }

    /// A handle that can cancel this request from elsewhere.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns `true` while the transport call is still outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, State::InFlight { .. })
            && !self.shared.cancelled.load(Ordering::Acquire)
    }
}

impl Future for Pending {
    type Output = Result<Value, RequestRejected>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.shared.waker.register(cx.waker());

        if this.shared.cancelled.load(Ordering::Acquire) {
            return match std::mem::replace(&mut this.state, State::Done) {
                State::InFlight { request, .. } | State::Cancelled(request) => {
                    Poll::Ready(Err(cancelled(request)))
                }
                State::Rejected(rejected) => Poll::Ready(Err(*rejected)),
                State::Done => panic!("Pending polled after completion"),
            };
        }

        match &mut this.state {
            State::InFlight { completion, .. } => {
                let outcome = match Pin::new(completion).poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(outcome) => outcome,
                };
                let settled = this.shared.settle();
                let State::InFlight { request, .. } = std::mem::replace(&mut this.state, State::Done)
                else {
                    unreachable!("state checked above");
                };
                if !settled {
                    return Poll::Ready(Err(cancelled(request)));
                }
                Poll::Ready(match outcome {
                    Ok(completion) => classify(completion, request),
                    Err(_) => Err(cancelled(request)),
                })
            }
            State::Rejected(_) | State::Cancelled(_) => {
                match std::mem::replace(&mut this.state, State::Done) {
                    State::Rejected(rejected) => Poll::Ready(Err(*rejected)),
                    State::Cancelled(request) => Poll::Ready(Err(cancelled(request))),
                    _ => unreachable!("state checked above"),
                }
            }
            State::Done => panic!("Pending polled after completion"),
        }
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        if matches!(self.state, State::InFlight { .. }) && self.shared.cancel() {
            trace!("unsettled request dropped; aborted transport call");
        }
    }
}

/// Cancels a [`Pending`] from another task or thread.
#[derive(Clone)]
pub struct Canceller {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Canceller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canceller")
            .field("cancelled", &self.shared.cancelled.load(Ordering::Acquire))
            .finish()
    }
}

impl Canceller {
    /// Cancel the request. Returns `false` if it had already settled or
    /// been cancelled.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }
}

/// Turn a completion into the future's output.
fn classify(completion: Completion, request: RequestSnapshot) -> Result<Value, RequestRejected> {
    let Completion {
        error,
        response,
        body,
    } = completion;

    let bad_status = response.as_ref().is_some_and(|r| !r.is_success());
    if error.is_none() && !bad_status {
        trace!(status = response.as_ref().map(|r| r.status.as_u16()), "request resolved");
        return Ok(body);
    }
    trace!(
        status = response.as_ref().map(|r| r.status.as_u16()),
        transport_error = error.is_some(),
        "request rejected",
    );
    Err(RequestRejected::new(error.as_ref(), request, response.as_ref()))
}

fn cancelled(request: RequestSnapshot) -> RequestRejected {
    RequestRejected::new(Some(&Fault::aborted("request aborted")), request, None)
}
