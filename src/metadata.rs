//! Per-call options for dispatched requests.

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

/// Free-form options for a single call: extra query parameters, headers, and
/// an optional body for calls that do not take one positionally.
///
/// # Examples
///
/// ```
/// use tiki_client::RequestMetadata;
///
/// let metadata = RequestMetadata::new()
///     .with_query_param("page", "2")
///     .with_query_param("limit", "50");
///
/// assert_eq!(metadata.query_params.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    /// Additional headers for this request.
    pub headers: HeaderMap,

    /// Query parameters for this request, in insertion order.
    pub query_params: Vec<(String, String)>,

    /// A body for this request.
    ///
    /// Used by DELETE calls; POST and PUT take their body as an argument and
    /// ignore this field.
    pub body: Option<Value>,
}

impl RequestMetadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, http::Error> {
        let name = HeaderName::try_from(name.as_ref())?;
        let value = HeaderValue::try_from(value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Sets the request body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn with_body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}
