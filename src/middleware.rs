//! The ordered request/response transformation chain.
//!
//! A client's chain is assembled once by [`build_chain`] and never changes.
//! For every call, request transforms run first to last, then the transport
//! sends the request, then response transforms run last to first. A
//! [`Middleware::Timeout`] step bounds everything after it.
//!
//! The built-in order is:
//!
//! 1. [`Middleware::BaseUrl`]
//! 2. [`Middleware::Options`]
//! 3. [`Middleware::KeepRequest`]
//! 4. [`Middleware::FormUrlencoded`] + [`Middleware::DecodeJson`] when form
//!    encoding is requested, [`Middleware::Json`] otherwise
//!
//! with [`Middleware::Timeout`] moved to the front when a timeout is
//! configured, and custom steps appended at the end.

use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::error::TransportError;
use crate::transport::{HttpRequest, HttpResponse, KeptRequest, RequestBody, Transport};
use http::header::CONTENT_TYPE;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A user-supplied chain step.
///
/// Both hooks default to doing nothing, so a step only implements the side it
/// cares about.
///
/// # Examples
///
/// ```
/// use tiki_client::{CustomMiddleware, HttpRequest, TransportError};
///
/// struct UserAgent;
///
/// impl CustomMiddleware for UserAgent {
///     fn name(&self) -> &str {
///         "user_agent"
///     }
///
///     fn on_request(&self, request: &mut HttpRequest) -> Result<(), TransportError> {
///         request
///             .headers
///             .insert("user-agent", http::HeaderValue::from_static("my-app/1.0"));
///         Ok(())
///     }
/// }
/// ```
pub trait CustomMiddleware: Send + Sync {
    /// The name this step is reported under.
    fn name(&self) -> &str;

    /// Transforms the outgoing request.
    fn on_request(&self, _request: &mut HttpRequest) -> Result<(), TransportError> {
        Ok(())
    }

    /// Transforms the incoming response.
    fn on_response(&self, _response: &mut HttpResponse) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Values the options step attaches to every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// The proxy the transport was built with.
    pub proxy: Option<String>,
    /// The validated credential, `None` when signing is skipped.
    pub credential: Option<Credential>,
}

/// A single step of the chain.
#[derive(Clone)]
pub enum Middleware {
    /// Resolves relative request paths against the endpoint.
    BaseUrl(String),
    /// Attaches proxy and credential to the request context.
    Options(CallOptions),
    /// Records the request before it is encoded and returns the record on the
    /// response.
    KeepRequest,
    /// Encodes object bodies as `application/x-www-form-urlencoded`.
    FormUrlencoded,
    /// Decodes JSON response bodies.
    DecodeJson,
    /// Encodes request bodies as JSON and decodes JSON response bodies.
    Json,
    /// Bounds the rest of the chain.
    Timeout(Duration),
    /// A user-supplied step.
    Custom(Arc<dyn CustomMiddleware>),
}

impl Middleware {
    /// Wraps a custom step.
    pub fn custom(middleware: impl CustomMiddleware + 'static) -> Self {
        Middleware::Custom(Arc::new(middleware))
    }

    /// Returns the step's name.
    pub fn name(&self) -> &str {
        match self {
            Middleware::BaseUrl(_) => "base_url",
            Middleware::Options(_) => "options",
            Middleware::KeepRequest => "keep_request",
            Middleware::FormUrlencoded => "form_urlencoded",
            Middleware::DecodeJson => "decode_json",
            Middleware::Json => "json",
            Middleware::Timeout(_) => "timeout",
            Middleware::Custom(custom) => custom.name(),
        }
    }

    fn on_request(&self, request: &mut HttpRequest) -> Result<(), TransportError> {
        match self {
            Middleware::BaseUrl(base) => {
                request.url = join_url(base, &request.url);
            }
            Middleware::Options(options) => {
                request.context.proxy = options.proxy.clone();
                request.context.credential = options.credential.clone();
            }
            Middleware::KeepRequest => {
                request.context.kept = Some(KeptRequest {
                    url: request.url.clone(),
                    headers: request.headers.clone(),
                    body: request.body.clone(),
                });
            }
            Middleware::FormUrlencoded => encode_form(request)?,
            Middleware::Json => encode_json(request)?,
            Middleware::Custom(custom) => custom.on_request(request)?,
            Middleware::DecodeJson | Middleware::Timeout(_) => {}
        }
        Ok(())
    }

    fn on_response(&self, response: &mut HttpResponse) -> Result<(), TransportError> {
        match self {
            Middleware::Json | Middleware::DecodeJson => decode_json(response),
            Middleware::Custom(custom) => custom.on_response(response),
            _ => Ok(()),
        }
    }

    async fn handle<'a>(
        &'a self,
        mut request: HttpRequest,
        rest: &'a [Middleware],
        transport: &'a dyn Transport,
    ) -> Result<HttpResponse, TransportError> {
        if let Middleware::Timeout(duration) = self {
            return match tokio::time::timeout(*duration, run(rest, transport, request)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(timeout_ms = duration.as_millis(), "Request timed out");
                    Err(TransportError::Timeout(*duration))
                }
            };
        }

        self.on_request(&mut request)?;
        let kept = match self {
            Middleware::KeepRequest => request.context.kept.clone(),
            _ => None,
        };

        let mut response = run(rest, transport, request).await?;
        if kept.is_some() {
            response.request = kept;
        }
        self.on_response(&mut response)?;
        Ok(response)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Middleware::BaseUrl(base) => f.debug_tuple("BaseUrl").field(base).finish(),
            Middleware::Options(options) => f.debug_tuple("Options").field(options).finish(),
            Middleware::Timeout(duration) => f.debug_tuple("Timeout").field(duration).finish(),
            Middleware::Custom(custom) => f.debug_tuple("Custom").field(&custom.name()).finish(),
            other => f.write_str(match other {
                Middleware::KeepRequest => "KeepRequest",
                Middleware::FormUrlencoded => "FormUrlencoded",
                Middleware::DecodeJson => "DecodeJson",
                _ => "Json",
            }),
        }
    }
}

/// Assembles the chain for a resolved configuration.
///
/// `credential` is the validated credential, `None` when signing is skipped.
/// The result depends only on its inputs.
pub fn build_chain(config: &ClientConfig, credential: Option<&Credential>) -> Vec<Middleware> {
    let mut chain = vec![
        Middleware::BaseUrl(config.endpoint.clone()),
        Middleware::Options(CallOptions {
            proxy: config.proxy.clone(),
            credential: credential.cloned(),
        }),
        Middleware::KeepRequest,
    ];

    if config.form_data {
        chain.push(Middleware::FormUrlencoded);
        chain.push(Middleware::DecodeJson);
    } else {
        chain.push(Middleware::Json);
    }

    if let Some(timeout) = config.timeout {
        chain.insert(0, Middleware::Timeout(timeout));
    }

    chain.extend(config.middlewares.iter().cloned());
    chain
}

type ChainFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + 'a>>;

/// Runs `request` through `chain` and then `transport`.
pub(crate) fn run<'a>(
    chain: &'a [Middleware],
    transport: &'a dyn Transport,
    request: HttpRequest,
) -> ChainFuture<'a> {
    Box::pin(async move {
        match chain.split_first() {
            Some((step, rest)) => step.handle(request, rest, transport).await,
            None => transport.send(request).await,
        }
    })
}

/// Joins a request path onto a base URL.
///
/// Absolute `http://` and `https://` URLs are returned unchanged.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    let lower = path.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn encode_json(request: &mut HttpRequest) -> Result<(), TransportError> {
    if let RequestBody::Value(value) = &request.body {
        let data = serde_json::to_string(value).map_err(|e| TransportError::Encode(e.to_string()))?;
        request.body = RequestBody::Encoded {
            content_type: JSON_CONTENT_TYPE.to_string(),
            data,
        };
    }
    Ok(())
}

fn encode_form(request: &mut HttpRequest) -> Result<(), TransportError> {
    let RequestBody::Value(value) = &request.body else {
        return Ok(());
    };
    let Value::Object(map) = value else {
        return Err(TransportError::Encode(format!(
            "form bodies must be objects, got {}",
            value
        )));
    };

    let mut pairs = Vec::new();
    for (key, value) in map {
        flatten_form(key.clone(), value, &mut pairs);
    }

    let data = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    request.body = RequestBody::Encoded {
        content_type: FORM_CONTENT_TYPE.to_string(),
        data,
    };
    Ok(())
}

fn flatten_form(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (sub, nested) in map {
                flatten_form(format!("{}[{}]", key, sub), nested, pairs);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_form(format!("{}[]", key), item, pairs);
            }
        }
        Value::Null => pairs.push((key, String::new())),
        Value::String(s) => pairs.push((key, s.clone())),
        other => pairs.push((key, other.to_string())),
    }
}

fn decode_json(response: &mut HttpResponse) -> Result<(), TransportError> {
    let is_json = response
        .header(CONTENT_TYPE.as_str())
        .is_some_and(|v| v.to_ascii_lowercase().contains("json"));
    if !is_json {
        return Ok(());
    }

    if let Value::String(text) = &response.body {
        let decoded = serde_json::from_str(text).map_err(|e| {
            tracing::error!(error = %e, raw_response = %text, "Failed to decode JSON response");
            TransportError::Decode {
                raw: text.clone(),
                message: e.to_string(),
            }
        })?;
        response.body = decoded;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue, Method, StatusCode};
    use serde_json::json;

    fn request_with(body: Value) -> HttpRequest {
        let mut request = HttpRequest::new(Method::POST, "/v2/products");
        request.body = RequestBody::Value(body);
        request
    }

    #[test]
    fn test_join_url() {
        let base = "https://api.tiki.vn/integration";
        assert_eq!(
            join_url(base, "/v2/sellers/me"),
            "https://api.tiki.vn/integration/v2/sellers/me"
        );
        assert_eq!(
            join_url("https://api.tiki.vn/integration/", "v2/sellers/me"),
            "https://api.tiki.vn/integration/v2/sellers/me"
        );
        assert_eq!(join_url(base, ""), base);
        assert_eq!(
            join_url(base, "HTTPS://other.example.com/x"),
            "HTTPS://other.example.com/x"
        );
    }

    #[test]
    fn test_json_encoding() {
        let mut request = request_with(json!({"name": "Shirt"}));
        encode_json(&mut request).unwrap();
        assert_eq!(
            request.body,
            RequestBody::Encoded {
                content_type: JSON_CONTENT_TYPE.to_string(),
                data: r#"{"name":"Shirt"}"#.to_string(),
            }
        );
    }

    #[test]
    fn test_form_encoding_flattens_nested_values() {
        let mut request = request_with(json!({
            "a": "x y",
            "b": 1,
            "c": null,
            "d": ["p", "q"],
            "e": {"f": true},
        }));
        encode_form(&mut request).unwrap();

        match request.body {
            RequestBody::Encoded { content_type, data } => {
                assert_eq!(content_type, FORM_CONTENT_TYPE);
                assert_eq!(data, "a=x+y&b=1&c=&d%5B%5D=p&d%5B%5D=q&e%5Bf%5D=true");
            }
            other => panic!("Expected encoded body, got {:?}", other),
        }
    }

    #[test]
    fn test_form_encoding_rejects_non_objects() {
        let mut request = request_with(json!([1, 2]));
        assert!(matches!(
            encode_form(&mut request),
            Err(TransportError::Encode(_))
        ));
    }

    #[test]
    fn test_decode_json_only_for_json_content() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        let mut response = HttpResponse::new(StatusCode::OK, headers, r#"{"id":42}"#);
        decode_json(&mut response).unwrap();
        assert_eq!(response.body, json!({"id": 42}));

        let mut plain = HttpResponse::new(StatusCode::OK, HeaderMap::new(), r#"{"id":42}"#);
        decode_json(&mut plain).unwrap();
        assert_eq!(plain.body, json!(r#"{"id":42}"#));
    }

    #[test]
    fn test_decode_json_failure_keeps_raw_body() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut response = HttpResponse::new(StatusCode::OK, headers, "not json");

        match decode_json(&mut response) {
            Err(TransportError::Decode { raw, .. }) => assert_eq!(raw, "not json"),
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }
}
