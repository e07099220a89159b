//! HTTP transport backed by `reqwest`.
//!
//! Each call is spawned onto the caller's tokio runtime; the returned
//! [`AbortHandle`] aborts that task. Redirects are not followed and no
//! connections are pooled, so every call stands alone.

use http::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;

use crate::callback::Callback;
use crate::error::Fault;
use crate::request::Options;
use crate::transport::{AbortHandle, ResponseHead, Transport, Verb};
use crate::util::flatten_headers;

/// [`Transport`] over real HTTP.
///
/// Must be called from within a tokio runtime (see
/// [`runtime()`](crate::runtime)).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

/// Configures an [`HttpTransport`].
#[must_use]
#[derive(Debug, Default)]
pub struct HttpTransportBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Vec<(String, String)>,
}

impl HttpTransportBuilder {
    /// Total time allowed for one call, from connect to the end of the
    /// body. No limit by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Time allowed to establish a connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// `User-Agent` sent with every call.
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.user_agent = Some(value.into());
        self
    }

    /// A header sent with every call unless the request sets it.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns a builder fault for an invalid default header or if the
    /// TLS backend cannot be initialized.
    pub fn build(self) -> Result<HttpTransport, Fault> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .default_headers(header_map(self.default_headers.iter().map(|(k, v)| (k, v)))?);
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        if let Some(t) = self.connect_timeout {
            builder = builder.connect_timeout(t);
        }
        if let Some(ua) = self.user_agent {
            builder = builder.user_agent(ua);
        }

        let client = builder.build().map_err(Fault::from_reqwest)?;
        debug!(
            timeout_ms = self.timeout.map(|t| t.as_millis() as u64),
            "http transport ready"
        );
        Ok(HttpTransport { client })
    }
}

impl HttpTransport {
    /// Start configuring a transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// A transport with default settings.
    ///
    /// # Errors
    ///
    /// See [`HttpTransportBuilder::build`].
    pub fn new() -> Result<Self, Fault> {
        Self::builder().build()
    }

    fn prepare(&self, verb: Verb, options: Options) -> Result<reqwest::RequestBuilder, Fault> {
        let url = reqwest::Url::parse(&options.url)
            .map_err(|e| Fault::builder(format!("invalid URL {:?}", options.url)).with_source(e))?;

        let mut headers = header_map(&options.headers)?;
        if options.json {
            headers
                .entry(ACCEPT)
                .or_insert(HeaderValue::from_static("application/json"));
        }

        let mut req = self.client.request(verb.method(), url).headers(headers);
        if let Some(body) = options.body {
            req = match (options.json, body) {
                (true, body) => req.json(&body),
                (false, Value::String(text)) => req.body(text),
                (false, other) => req.body(other.to_string()),
            };
        }
        Ok(req)
    }
}

impl Transport for HttpTransport {
    fn call(&self, verb: Verb, options: Options, callback: Callback) -> Result<AbortHandle, Fault> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            Fault::builder("HttpTransport must be called within a tokio runtime").with_source(e)
        })?;

        let json = options.json;
        let req = self.prepare(verb, options)?;

        let task = handle.spawn(async move {
            if callback.is_canceled() {
                return;
            }
            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    trace!(error = %e, "http call failed");
                    callback.fail(Fault::from_reqwest(e));
                    return;
                }
            };

            let mut head = ResponseHead::new(resp.status());
            head.headers = flatten_headers(resp.headers());
            match resp.text().await {
                Ok(text) => callback.respond(head, decode_body(text, json)),
                Err(e) => callback.complete(Some(Fault::from_reqwest(e)), Some(head), Value::Null),
            }
        });

        Ok(AbortHandle::new(move || task.abort()))
    }
}

fn header_map<'a, I>(pairs: I) -> Result<HeaderMap, Fault>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Fault::builder(format!("invalid header name {name:?}")).with_source(e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Fault::builder(format!("invalid value for header {name}")).with_source(e))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// JSON mode parses the body, keeping the raw text when it is not JSON.
/// An empty body is `null` in JSON mode.
fn decode_body(text: String, json: bool) -> Value {
    if !json {
        return Value::String(text);
    }
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
