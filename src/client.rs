//! Entry point.
//!
//! A [`Client`] owns an injected [`Transport`] and hands out fresh
//! [`RequestBuilder`]s. `Client` is cheap to clone (`Arc` internally).

use std::sync::Arc;

use crate::request::RequestBuilder;
use crate::transport::Transport;
use crate::url::IntoUrl;

/// Creates request builders bound to one transport.
///
/// # Example
///
/// ```rust,ignore
/// let client = Client::http()?;
/// let user = client
///     .request("https://api.example.com")
///     .path(["users", "42"])
///     .query("fields", "name")
///     .get()
///     .await?;
/// ```
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Wrap a transport.
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Wrap a shared transport.
    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// A client on a default [`HttpTransport`](crate::HttpTransport).
    ///
    /// # Errors
    ///
    /// Returns a builder [`Fault`](crate::Fault) if the HTTP stack cannot
    /// be initialized.
    #[cfg(feature = "reqwest")]
    pub fn http() -> Result<Self, crate::Fault> {
        crate::HttpTransport::builder().build().map(Self::new)
    }

    /// Start a request to `url`.
    ///
    /// The builder starts with no headers, JSON mode on, and no body.
    pub fn request<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        RequestBuilder::new(self.clone(), url)
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }
}
