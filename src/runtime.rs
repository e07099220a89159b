//! Blocking entry point for callers without an async runtime.
//!
//! [`HttpTransport`](crate::HttpTransport) spawns its work onto the
//! ambient tokio runtime, so a synchronous caller needs one to drive the
//! returned [`Pending`](crate::Pending).

/// A single-threaded tokio runtime.
pub type Runtime = tokio::runtime::Runtime;

/// Create a new [`Runtime`].
///
/// # Errors
///
/// Returns [`std::io::Error`] if the tokio runtime cannot be created.
pub fn runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Create a [`Runtime`] and run `f` to completion on it.
///
/// Dispatch must happen inside `f` so the transport sees the runtime.
///
/// # Errors
///
/// Returns [`std::io::Error`] if the runtime cannot be created.
pub fn block_on<F: std::future::Future<Output = T>, T>(f: F) -> std::io::Result<T> {
    let rt = runtime()?;
    Ok(rt.block_on(f))
}
