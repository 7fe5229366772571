//! The abstract transport the retry loops drive.
//!
//! [`Transport`] is the seam between this crate's control logic and a real
//! HTTP stack: one call in, one [`Response`] snapshot out. The stock
//! implementation, [`ReqwestTransport`], wraps a `reqwest::Client` with an
//! in-process cookie store, so a successful authentication call leaves its
//! cookies behind for every later request through the same session.
//!
//! Connection management, TLS, redirects, and per-request timeouts all live
//! on the transport side of this seam; the retry loops never see them.

use crate::{RequestOptions, Response, Result};
use async_trait::async_trait;
use http::Method;
use std::time::Instant;
use url::Url;

/// Sends one HTTP request and reports what came back.
///
/// An implementation must return `Ok` with a [`Response`] for every exchange
/// that produced an HTTP status, including error statuses like 401 or 500 —
/// those drive the retry loops. Only transport-level faults (connection
/// refused, DNS failure, timeout) should surface as `Err`, and the loops
/// propagate them to the caller untouched.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one HTTP exchange.
    async fn send(&self, method: Method, url: &Url, options: &RequestOptions) -> Result<Response>;
}

/// The stock [`Transport`] backed by `reqwest`.
///
/// Holds whatever credential state the server sets (cookies) across calls.
/// That state is shared by concurrent calls on the same session without
/// additional locking; two calls that both trigger re-authentication may
/// race on it.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an existing `reqwest::Client`.
    ///
    /// Build the client with `cookie_store(true)` if authentication calls
    /// should refresh cookie-based credentials.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, method: Method, url: &Url, options: &RequestOptions) -> Result<Response> {
        let started = Instant::now();

        let mut request = self.client.request(method, url.clone());
        for (name, value) in options.headers() {
            request = request.header(name, value);
        }
        if !options.query_params().is_empty() {
            request = request.query(options.query_params());
        }
        if let Some(body) = options.json_body() {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let body = response.text().await?;

        Ok(Response::new(
            status,
            headers,
            final_url,
            started.elapsed(),
            body,
        ))
    }
}
