//! Shared utility functions.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// Mutex helpers
// ---------------------------------------------------------------------------

/// Lock a [`Mutex`], recovering from poison.
///
/// Every mutex in this crate guards a single `Option<T>` slot that is only
/// ever `.take()`n or `.replace()`d, so a panic while the lock was held
/// cannot leave the slot half-updated.
pub(crate) fn lock_or_clear<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("mutex poisoned by an earlier panic; recovering the Option slot");
            mutex.clear_poison();
            poisoned.into_inner()
        }
    }
}

// ---------------------------------------------------------------------------
// Header helpers
// ---------------------------------------------------------------------------

/// Flatten an [`http::HeaderMap`] into a plain name -> value mapping.
///
/// Repeated headers are joined with `", "` (RFC 9110 §5.3). Values that
/// are not valid UTF-8 are decoded lossily.
pub(crate) fn flatten_headers(headers: &http::HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_owned())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    out
}
