//! The response snapshot handed back by the transport.
//!
//! [`Response`] is a plain, read-only record of one HTTP exchange: status,
//! headers, final URL, elapsed time, and the body text. The retry loops only
//! ever inspect it; they never mutate it.

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// A completed HTTP exchange as seen by the retry loops.
///
/// Because an exhausted retry loop still returns its last response, callers
/// should check [`Response::is_success`] (or apply their own predicate) rather
/// than assume an `Ok` return means the request was accepted.
///
/// # Examples
///
/// ```no_run
/// use autoauth::Session;
/// use http::Method;
///
/// # async fn example() -> Result<(), autoauth::Error> {
/// let session = Session::builder()
///     .auth_endpoint(Method::POST, "https://api.example.com/login")?
///     .build()?;
///
/// let response = session.get("https://api.example.com/widgets").await?;
/// println!("{} {} in {:?}", response.status, response.reason(), response.elapsed);
/// if !response.is_success() {
///     eprintln!("server said: {}", response.body);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code.
    pub status: StatusCode,

    /// The response headers. Lookup by name is case-insensitive.
    pub headers: HeaderMap,

    /// The final URL of the exchange, after any transport-level redirects.
    pub url: Url,

    /// Wall-clock time the transport spent on this exchange.
    pub elapsed: Duration,

    /// The response body as text.
    pub body: String,
}

impl Response {
    /// Creates a new `Response`. Typically called by a [`Transport`](crate::Transport)
    /// implementation.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        url: Url,
        elapsed: Duration,
        body: String,
    ) -> Self {
        Self {
            status,
            headers,
            url,
            elapsed,
            body,
        }
    }

    /// The canonical reason phrase for the status code, or `""` for
    /// non-standard codes.
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Looks up a header value by name (case-insensitive).
    ///
    /// Returns `None` if the header is absent or its value is not valid
    /// UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// # use autoauth::Response;
    /// # use http::{HeaderMap, HeaderValue, StatusCode};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// let response = Response::new(
    ///     StatusCode::OK,
    ///     headers,
    ///     "https://example.com/".parse().unwrap(),
    ///     Duration::from_millis(12),
    ///     String::new(),
    /// );
    ///
    /// assert_eq!(response.header("Content-Type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Deserializes the body text as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}
