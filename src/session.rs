//! The retrying session and its builder.
//!
//! [`Session`] wraps an abstract [`Transport`] with two retry loops: one for
//! ordinary requests and one for the dedicated authentication call. An
//! ordinary request answered with 401 triggers a full nested authentication
//! cycle (refreshing whatever credentials the transport holds) before the
//! next attempt; a 429 answer is slept through according to the server's
//! `Retry-After` hint. Neither loop ever turns exhaustion into an error: the
//! last response obtained is always returned, with a warning in the logs as
//! the only sign of failure.

use crate::{
    policy::{accept_any, CallOverrides, RetryPolicy, SuccessPredicate},
    rate_limit::retry_after_delay,
    transport::{ReqwestTransport, Transport},
    Error, RequestOptions, Response, Result,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// An HTTP session that retries unexpected responses and re-authenticates on
/// 401.
///
/// The session is cheap to clone and safe to share across tasks. All retry
/// defaults are fixed at build time; per-call values are supplied through
/// [`CallOverrides`] and never mutate the session.
///
/// Concurrent calls share the transport's credential state (for the stock
/// transport, its cookie store) without extra locking, so two calls that both
/// hit a 401 may re-authenticate twice. That race is accepted.
///
/// # Examples
///
/// ```no_run
/// use autoauth::{CallOverrides, RequestOptions, RetryPolicy, Session};
/// use http::Method;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), autoauth::Error> {
/// let session = Session::builder()
///     .auth_endpoint(Method::POST, "https://api.example.com/login")?
///     .auth_options(RequestOptions::new().json(&serde_json::json!({
///         "user": "bot",
///         "key": "secret",
///     }))?)
///     .auth_expected(|r| r.is_success())
///     .expected(|r| r.is_success())
///     .policy(RetryPolicy::new(3, Duration::from_secs(2)))
///     .build()?;
///
/// let response = session
///     .request(
///         Method::GET,
///         "https://api.example.com/widgets",
///         RequestOptions::new(),
///         CallOverrides::new().log_tag("list widgets"),
///     )
///     .await?;
///
/// // Exhausted retries still return the last response.
/// if !response.is_success() {
///     eprintln!("gave up: {} {}", response.status, response.body);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    transport: Arc<dyn Transport>,
    auth_method: Method,
    auth_url: Url,
    auth_options: RequestOptions,
    auth_expected: SuccessPredicate,
    auth_policy: RetryPolicy,
    expected: SuccessPredicate,
    policy: RetryPolicy,
}

impl Session {
    /// Creates a new [`SessionBuilder`].
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Performs an ordinary request, retrying unexpected responses.
    ///
    /// The success predicate, attempt bound, and backoff delay fall back to
    /// the session's ordinary-request defaults unless overridden in `call`.
    /// `options` are passed to the transport as-is (only authentication calls
    /// merge options with session defaults).
    ///
    /// Per attempt: if the predicate accepts the response the loop stops.
    /// Otherwise, between attempts, a 401 triggers one full nested
    /// authentication cycle followed by the fixed delay; a 429 sleeps for the
    /// server's `Retry-After` hint (fixed delay if absent or malformed); any
    /// other unexpected status sleeps for the fixed delay.
    ///
    /// # Errors
    ///
    /// Only transport faults and an unparseable `url` produce `Err`.
    /// Exhausted retries return `Ok` with the last response; inspect it to
    /// detect failure.
    pub async fn request(
        &self,
        method: Method,
        url: impl AsRef<str>,
        options: RequestOptions,
        call: CallOverrides,
    ) -> Result<Response> {
        let inner = &self.inner;
        let url = Url::parse(url.as_ref())?;
        let expected = call.expected.unwrap_or_else(|| inner.expected.clone());
        let policy = inner.policy.with_overrides(call.max_tries, call.delay);

        let mut tries = 1usize;
        let mut resp = inner.transport.send(method.clone(), &url, &options).await?;
        let succeeded = loop {
            tracing::debug!(
                attempt = tries,
                method = %method,
                url = %url,
                status = resp.status.as_u16(),
                "request attempt finished"
            );
            if (*expected)(&resp) {
                break true;
            }
            if tries >= policy.max_tries() {
                break false;
            }
            match resp.status.as_u16() {
                401 => {
                    // Refresh whatever credentials the transport holds. An
                    // exhausted auth cycle does not abort this loop.
                    self.auth_request().await?;
                    tokio::time::sleep(policy.delay()).await;
                }
                429 => {
                    let wait = retry_after_delay(&resp.headers).unwrap_or_else(|| policy.delay());
                    tokio::time::sleep(wait).await;
                }
                _ => tokio::time::sleep(policy.delay()).await,
            }
            tries += 1;
            resp = inner.transport.send(method.clone(), &url, &options).await?;
        };

        if !succeeded {
            log_exhausted("request", &policy, &method, &url, &options, &resp);
        }
        if let Some(tag) = call.log_tag.as_deref() {
            tracing::info!(operation = "request", tries, tag, "call finished");
        }
        Ok(resp)
    }

    /// Performs the dedicated authentication call with the session's
    /// authentication defaults.
    ///
    /// This is the cycle [`Session::request`] runs when it sees a 401. It can
    /// also be called directly, for example to log in eagerly at startup.
    pub async fn auth_request(&self) -> Result<Response> {
        self.auth_request_with(AuthOverrides::new()).await
    }

    /// Performs the authentication call with per-call overrides.
    ///
    /// Omitted values fall back to the session's authentication defaults.
    /// Call-supplied options are overlaid on the session's authentication
    /// options, call keys winning. The loop classifies unexpected responses
    /// like [`Session::request`] does, except that a 401 here is just another
    /// unexpected status (no recursion).
    ///
    /// # Errors
    ///
    /// Only transport faults produce `Err`; exhaustion returns the last
    /// response.
    pub async fn auth_request_with(&self, overrides: AuthOverrides) -> Result<Response> {
        let inner = &self.inner;
        let method = overrides.method.unwrap_or_else(|| inner.auth_method.clone());
        let url = overrides.url.unwrap_or_else(|| inner.auth_url.clone());
        let options = match &overrides.options {
            Some(options) => options.merged_over(&inner.auth_options),
            None => inner.auth_options.clone(),
        };
        let call = overrides.call;
        let expected = call.expected.unwrap_or_else(|| inner.auth_expected.clone());
        let policy = inner.auth_policy.with_overrides(call.max_tries, call.delay);

        let mut tries = 1usize;
        let mut resp = inner.transport.send(method.clone(), &url, &options).await?;
        let succeeded = loop {
            tracing::debug!(
                attempt = tries,
                method = %method,
                url = %url,
                status = resp.status.as_u16(),
                "authentication attempt finished"
            );
            if (*expected)(&resp) {
                break true;
            }
            if tries >= policy.max_tries() {
                break false;
            }
            let wait = if resp.status.as_u16() == 429 {
                retry_after_delay(&resp.headers).unwrap_or_else(|| policy.delay())
            } else {
                policy.delay()
            };
            tokio::time::sleep(wait).await;
            tries += 1;
            resp = inner.transport.send(method.clone(), &url, &options).await?;
        };

        if !succeeded {
            log_exhausted("auth_request", &policy, &method, &url, &options, &resp);
        }
        if let Some(tag) = call.log_tag.as_deref() {
            tracing::info!(operation = "auth_request", tries, tag, "call finished");
        }
        Ok(resp)
    }

    /// Makes a GET request with session defaults.
    pub async fn get(&self, url: impl AsRef<str>) -> Result<Response> {
        self.request(Method::GET, url, RequestOptions::new(), CallOverrides::new())
            .await
    }

    /// Makes a POST request with session defaults.
    pub async fn post(&self, url: impl AsRef<str>, options: RequestOptions) -> Result<Response> {
        self.request(Method::POST, url, options, CallOverrides::new())
            .await
    }
}

/// One warning with the full call signature and final response, the only
/// visible sign of an exhausted loop.
fn log_exhausted(
    operation: &str,
    policy: &RetryPolicy,
    method: &Method,
    url: &Url,
    options: &RequestOptions,
    resp: &Response,
) {
    tracing::warn!(
        operation,
        max_tries = policy.max_tries(),
        method = %method,
        url = %url,
        options = ?options,
        status = resp.status.as_u16(),
        reason = resp.reason(),
        final_url = %resp.url,
        elapsed_ms = resp.elapsed.as_millis(),
        headers = ?resp.headers,
        body = %resp.body,
        "retries exhausted; returning last response"
    );
}

/// Per-call overrides for [`Session::auth_request_with`].
///
/// On top of the usual [`CallOverrides`], the authentication call may replace
/// the method, the URL, and the transport options stored at build time.
///
/// # Examples
///
/// ```no_run
/// use autoauth::{AuthOverrides, CallOverrides, RequestOptions, Session};
/// use http::Method;
///
/// # async fn example(session: &Session) -> Result<(), autoauth::Error> {
/// let response = session
///     .auth_request_with(
///         AuthOverrides::new()
///             .url("https://api.example.com/token/refresh")?
///             .options(RequestOptions::new().header("X-Scope", "admin")?)
///             .call(CallOverrides::new().max_tries(5)),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct AuthOverrides {
    method: Option<Method>,
    url: Option<Url>,
    options: Option<RequestOptions>,
    call: CallOverrides,
}

impl AuthOverrides {
    /// Creates an empty set of overrides (session auth defaults apply).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the authentication HTTP method for this call.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Replaces the authentication URL for this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Supplies extra transport options, overlaid on the session's
    /// authentication options (keys supplied here win).
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the predicate/policy overrides for this call.
    pub fn call(mut self, call: CallOverrides) -> Self {
        self.call = call;
        self
    }
}

/// Builder for configuring and creating a [`Session`].
///
/// The authentication endpoint is the only required piece of configuration.
/// Both retry pairs default to accepting every response after up to three
/// attempts two seconds apart.
///
/// # Examples
///
/// ```no_run
/// use autoauth::{RetryPolicy, SessionBuilder};
/// use http::Method;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), autoauth::Error> {
/// let session = SessionBuilder::new()
///     .auth_endpoint(Method::POST, "https://api.example.com/login")?
///     .auth_policy(RetryPolicy::new(3, Duration::from_secs(5)))
///     .expected(|r| r.is_success())
///     .default_header("User-Agent", "my-app/1.0")?
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    auth_method: Option<Method>,
    auth_url: Option<Url>,
    auth_options: RequestOptions,
    auth_expected: SuccessPredicate,
    auth_policy: RetryPolicy,
    expected: SuccessPredicate,
    policy: RetryPolicy,
    transport: Option<Arc<dyn Transport>>,
    timeout: Option<Duration>,
    default_headers: HeaderMap,
}

impl SessionBuilder {
    /// Creates a new `SessionBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            auth_method: None,
            auth_url: None,
            auth_options: RequestOptions::new(),
            auth_expected: accept_any(),
            auth_policy: RetryPolicy::default(),
            expected: accept_any(),
            policy: RetryPolicy::default(),
            transport: None,
            timeout: None,
            default_headers: HeaderMap::new(),
        }
    }

    /// Sets the method and URL of the dedicated authentication endpoint.
    /// Required.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn auth_endpoint(mut self, method: Method, url: impl AsRef<str>) -> Result<Self> {
        self.auth_method = Some(method);
        self.auth_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets transport options reused on every authentication call, such as
    /// the credential body. Per-call options are overlaid on top of these.
    pub fn auth_options(mut self, options: RequestOptions) -> Self {
        self.auth_options = options;
        self
    }

    /// Sets the default success predicate for authentication calls.
    /// Defaults to accepting every response.
    pub fn auth_expected<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.auth_expected = Arc::new(predicate);
        self
    }

    /// Sets the default retry policy for authentication calls.
    pub fn auth_policy(mut self, policy: RetryPolicy) -> Self {
        self.auth_policy = policy;
        self
    }

    /// Sets the default success predicate for ordinary requests.
    /// Defaults to accepting every response.
    pub fn expected<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.expected = Arc::new(predicate);
        self
    }

    /// Sets the default retry policy for ordinary requests.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the stock transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the per-request timeout on the stock transport. Ignored when a
    /// custom transport is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a header the stock transport sends with every request. Ignored
    /// when a custom transport is supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header value: {e}")))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Builds the configured `Session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the authentication endpoint was not set or the
    /// stock transport cannot be constructed.
    pub fn build(self) -> Result<Session> {
        let auth_method = self
            .auth_method
            .ok_or_else(|| Error::Configuration("authentication endpoint is required".into()))?;
        let auth_url = self
            .auth_url
            .ok_or_else(|| Error::Configuration("authentication endpoint is required".into()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                // Cookie store so a successful auth call refreshes the
                // credentials later requests ride on.
                let mut builder = reqwest::Client::builder()
                    .cookie_store(true)
                    .default_headers(self.default_headers);
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                let client = builder.build().map_err(|e| {
                    Error::Configuration(format!("failed to build HTTP client: {e}"))
                })?;
                Arc::new(ReqwestTransport::with_client(client))
            }
        };

        Ok(Session {
            inner: Arc::new(SessionInner {
                transport,
                auth_method,
                auth_url,
                auth_options: self.auth_options,
                auth_expected: self.auth_expected,
                auth_policy: self.auth_policy,
                expected: self.expected,
                policy: self.policy,
            }),
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
