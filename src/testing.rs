//! In-memory transport for unit tests.

use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::callback::Callback;
use crate::client::Client;
use crate::error::Fault;
use crate::request::Options;
use crate::transport::{AbortHandle, ResponseHead, Transport, Verb};

/// How the [`Recorder`] answers each call.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Complete with a response head (plus `x-recorder: 1`) and body.
    Respond(http::StatusCode, Value),
    /// Complete with a body but no response head.
    Bare(Value),
    /// Complete with a connect fault and no response.
    Fail,
    /// Complete with both a fault and a 200 head.
    FailAfterHead,
    /// Refuse synchronously.
    Throw,
    /// Keep the callback until [`Recorder::release`].
    Hold,
    /// Drop the callback without calling it.
    Drop,
}

/// Records every call and answers according to its [`Reply`].
pub(crate) struct Recorder {
    reply: Reply,
    calls: Mutex<Vec<(Verb, Options)>>,
    held: Arc<Mutex<Option<Callback>>>,
    aborts: Arc<AtomicUsize>,
}

impl Recorder {
    pub(crate) fn with(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(Vec::new()),
            held: Arc::new(Mutex::new(None)),
            aborts: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Answers `200 OK` with body `"ok"`.
    pub(crate) fn ok() -> Arc<Self> {
        Self::with(Reply::Respond(http::StatusCode::OK, json!("ok")))
    }

    pub(crate) fn client(self: &Arc<Self>) -> Client {
        Client::from_arc(Arc::clone(self) as Arc<dyn Transport>)
    }

    pub(crate) fn calls(&self) -> Vec<(Verb, Options)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Complete a held callback.
    pub(crate) fn release(&self, head: ResponseHead, body: Value) {
        if let Some(cb) = self.held.lock().unwrap().take() {
            cb.respond(head, body);
        }
    }
}

impl Transport for Recorder {
    fn call(&self, verb: Verb, options: Options, callback: Callback) -> Result<AbortHandle, Fault> {
        self.calls.lock().unwrap().push((verb, options));

        let aborts = Arc::clone(&self.aborts);
        let abort = AbortHandle::new(move || {
            aborts.fetch_add(1, Ordering::SeqCst);
        });

        match self.reply.clone() {
            Reply::Respond(status, body) => {
                callback.respond(ResponseHead::new(status).with_header("x-recorder", "1"), body);
            }
            Reply::Bare(body) => callback.complete(None, None, body),
            Reply::Fail => callback.fail(Fault::connect("refused").with_code("ECONNREFUSED")),
            Reply::FailAfterHead => callback.complete(
                Some(Fault::body("truncated")),
                Some(ResponseHead::new(http::StatusCode::OK)),
                Value::Null,
            ),
            Reply::Throw => return Err(Fault::builder("refusing to start")),
            Reply::Hold => *self.held.lock().unwrap() = Some(callback),
            Reply::Drop => drop(callback),
        }
        Ok(abort)
    }
}
