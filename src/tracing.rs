//! Internal log shims.
//!
//! With the `tracing` feature the macros below forward to [`tracing`];
//! without it they expand to nothing, so the dispatcher and transports can
//! log unconditionally without `#[cfg]` noise at every call site.

// Only one side of each cfg pair is active at a time.
#![allow(unused_macros)]

#[cfg(feature = "tracing")]
macro_rules! trace {
    ($($tt:tt)*) => { tracing::trace!($($tt)*) }
}

#[cfg(feature = "tracing")]
macro_rules! debug {
    ($($tt:tt)*) => { tracing::debug!($($tt)*) }
}

#[cfg(feature = "tracing")]
macro_rules! warn {
    ($($tt:tt)*) => { tracing::warn!($($tt)*) }
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($tt:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($tt:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn {
    ($($tt:tt)*) => {};
}

/// Subscriber that accepts everything and records nothing, so that the
/// field expressions inside the shims are actually evaluated under test.
#[cfg(all(test, feature = "tracing"))]
pub(crate) struct SinkSubscriber;

#[cfg(all(test, feature = "tracing"))]
impl ::tracing::Subscriber for SinkSubscriber {
    fn enabled(&self, _: &::tracing::Metadata<'_>) -> bool {
        true
    }
    fn new_span(&self, _: &::tracing::span::Attributes<'_>) -> ::tracing::span::Id {
        ::tracing::span::Id::from_u64(1)
    }
    fn record(&self, _: &::tracing::span::Id, _: &::tracing::span::Record<'_>) {}
    fn record_follows_from(&self, _: &::tracing::span::Id, _: &::tracing::span::Id) {}
    fn event(&self, _: &::tracing::Event<'_>) {}
    fn enter(&self, _: &::tracing::span::Id) {}
    fn exit(&self, _: &::tracing::span::Id) {}
}

#[cfg(all(test, feature = "tracing"))]
#[test]
fn dispatch_logging_evaluates_fields() {
    use crate::transport::{AbortHandle, Verb};

    let _guard = ::tracing::subscriber::set_default(SinkSubscriber);
    let client = crate::Client::new(
        |_: Verb, _: crate::Options, cb: crate::Callback| -> Result<AbortHandle, crate::Fault> {
            cb.complete(None, None, serde_json::Value::Null);
            Ok(AbortHandle::noop())
        },
    );
    let out = futures_executor::block_on(client.request("http://localhost/").get());
    assert!(out.is_ok());
}
