//! The request/response values passed through the middleware chain, and the
//! [`Transport`] that puts them on the wire.
//!
//! [`ReqwestTransport`] is the default transport. Any other [`Transport`] can
//! be injected through [`ClientBuilder::transport`](crate::ClientBuilder::transport).

use crate::credential::Credential;
use crate::error::TransportError;
use async_trait::async_trait;
use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::Value;
use std::time::Instant;
use url::Url;

/// The body of an outgoing request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A structured body not yet encoded by the chain.
    Value(Value),
    /// A body already encoded, with its content type.
    Encoded {
        /// The `content-type` header to send
        content_type: String,
        /// The encoded payload
        data: String,
    },
}

/// Per-call values attached to a request by the chain.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// The call identifier, set to the request path by the dispatcher.
    pub call: Option<String>,
    /// The proxy the client was built with, if any.
    pub proxy: Option<String>,
    /// The validated credential, absent when signing is skipped.
    pub credential: Option<Credential>,
    /// The outgoing request as seen before encoding.
    pub kept: Option<KeptRequest>,
}

/// A snapshot of the outgoing request taken before the body is encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct KeptRequest {
    /// The resolved request URL, without query.
    pub url: String,
    /// The request headers at the time of the snapshot.
    pub headers: HeaderMap,
    /// The request body before encoding.
    pub body: RequestBody,
}

/// An outgoing request travelling through the chain.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// The request path, or the absolute URL once the base URL step ran.
    pub url: String,
    /// Query parameters, in insertion order.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: RequestBody,
    /// Values attached by the chain.
    pub context: CallContext,
}

impl HttpRequest {
    /// Creates a request with no query, headers, or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            context: CallContext::default(),
        }
    }
}

/// A response travelling back through the chain.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body.
    ///
    /// Transports deliver text as a JSON string (`null` when empty); the
    /// decode steps replace it with the parsed value.
    pub body: Value,
    /// The response body exactly as received.
    pub raw_body: String,
    /// The request snapshot recorded on the way out, if any.
    pub request: Option<KeptRequest>,
}

impl HttpResponse {
    /// Creates a response from a status and the raw body text.
    pub fn new(status: StatusCode, headers: HeaderMap, raw_body: impl Into<String>) -> Self {
        let raw_body = raw_body.into();
        let body = if raw_body.is_empty() {
            Value::Null
        } else {
            Value::String(raw_body.clone())
        };
        Self {
            status,
            headers,
            body,
            raw_body,
            request: None,
        }
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// Puts a fully transformed request on the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the raw response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// The default transport, backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport routing every request through `proxy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is rejected or the HTTP client cannot
    /// be built.
    pub fn with_proxy(proxy: &str) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .proxy(reqwest::Proxy::all(proxy)?)
            .build()?;
        Ok(Self::from_client(http_client))
    }

    /// Wraps an existing `reqwest::Client`.
    pub fn from_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::from_client(reqwest::Client::new())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut url = Url::parse(&request.url)?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        tracing::debug!(
            method = %request.method,
            url = %url,
            "Executing HTTP request"
        );

        let start_time = Instant::now();
        let mut builder = self
            .http_client
            .request(request.method.clone(), url)
            .headers(request.headers);

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Value(value) => builder.json(&value),
            RequestBody::Encoded { content_type, data } => {
                let content_type = HeaderValue::try_from(content_type)
                    .map_err(|e| TransportError::Encode(format!("Invalid content type: {}", e)))?;
                builder.header(CONTENT_TYPE, content_type).body(data)
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let raw_body = response.text().await?;

        tracing::info!(
            status = status.as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "Received HTTP response"
        );

        if status.is_client_error() {
            tracing::error!(status = status.as_u16(), response = %raw_body, "Client error (4xx)");
        } else if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), response = %raw_body, "Server error (5xx)");
        }

        Ok(HttpResponse::new(status, headers, raw_body))
    }
}
