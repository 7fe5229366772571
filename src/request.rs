//! Per-call transport options.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

/// Options handed to the transport alongside a method and URL: extra headers,
/// query parameters, and an optional JSON body.
///
/// Options are immutable per call. For authentication calls the session holds
/// a default set; call-supplied options are overlaid on top of them via
/// [`RequestOptions::merged_over`], with call-supplied keys winning. Ordinary
/// requests use their options as-is.
///
/// # Examples
///
/// ```
/// use autoauth::RequestOptions;
/// use serde_json::json;
///
/// # fn example() -> Result<(), autoauth::Error> {
/// let options = RequestOptions::new()
///     .header("Accept", "application/json")?
///     .query("page", "1")
///     .json(&json!({ "name": "alice" }))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: HeaderMap,
    query: Vec<(String, String)>,
    json: Option<serde_json::Value>,
}

impl RequestOptions {
    /// Creates an empty set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter. A parameter added twice keeps the last value.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.query.retain(|(k, _)| *k != key);
        self.query.push((key, value.into()));
        self
    }

    /// Sets a JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the body cannot be serialized.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.json =
            Some(serde_json::to_value(body).map_err(|e| Error::Serialization(e.to_string()))?);
        Ok(self)
    }

    /// The extra headers for this call.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The query parameters for this call, in insertion order.
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    /// The JSON body for this call, if any.
    pub fn json_body(&self) -> Option<&serde_json::Value> {
        self.json.as_ref()
    }

    /// Overlays `self` on top of `defaults`: the result carries every entry
    /// from `defaults`, with entries from `self` replacing those sharing a
    /// header name or query key. A body in `self` replaces a default body.
    pub fn merged_over(&self, defaults: &RequestOptions) -> RequestOptions {
        let mut merged = defaults.clone();
        for (name, value) in &self.headers {
            merged.headers.insert(name.clone(), value.clone());
        }
        for (key, value) in &self.query {
            merged.query.retain(|(k, _)| k != key);
            merged.query.push((key.clone(), value.clone()));
        }
        if self.json.is_some() {
            merged.json = self.json.clone();
        }
        merged
    }
}
