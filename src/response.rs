//! Normalization of raw transport outcomes.
//!
//! Every dispatched call ends with a [`RequestOutcome`] being handed to the
//! client's [`ResponseHandler`], which turns it into a
//! [`NormalizedResult`](crate::NormalizedResult). The built-in
//! [`DefaultResponseHandler`] can be replaced process-wide through
//! [`SettingsBuilder::response_handler`](crate::SettingsBuilder::response_handler).

use crate::error::{Error, NormalizedResult, SystemError, TransportError};
use crate::transport::HttpResponse;
use http::StatusCode;
use serde_json::{Map, Value};

/// What came back from the chain for a single call.
#[derive(Debug)]
pub enum RequestOutcome {
    /// A response was received and went back through the chain.
    Response(HttpResponse),
    /// The call failed before a response could be produced.
    Failure(TransportError),
}

impl RequestOutcome {
    /// Returns the HTTP status code if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestOutcome::Response(response) => Some(response.status),
            RequestOutcome::Failure(_) => None,
        }
    }

    /// Renders the outcome as JSON for diagnostics.
    pub fn to_value(&self) -> Value {
        match self {
            RequestOutcome::Response(response) => {
                let headers: Map<String, Value> = response
                    .headers
                    .iter()
                    .filter_map(|(name, value)| {
                        let value = value.to_str().ok()?;
                        Some((name.as_str().to_string(), Value::String(value.to_string())))
                    })
                    .collect();
                serde_json::json!({
                    "status": response.status.as_u16(),
                    "headers": headers,
                    "body": response.body,
                })
            }
            RequestOutcome::Failure(err) => serde_json::json!({ "error": err.to_string() }),
        }
    }
}

impl From<Result<HttpResponse, TransportError>> for RequestOutcome {
    fn from(result: Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(response) => RequestOutcome::Response(response),
            Err(err) => RequestOutcome::Failure(err),
        }
    }
}

/// Turns a raw outcome into a normalized result.
///
/// Any `Fn(RequestOutcome) -> NormalizedResult` closure is a handler.
///
/// # Examples
///
/// ```
/// use tiki_client::{Error, RequestOutcome, Settings, SystemError};
///
/// // Treat every received response as a success, whatever its status.
/// let settings = Settings::builder()
///     .response_handler(|outcome: RequestOutcome| match outcome {
///         RequestOutcome::Response(response) => Ok(response.body),
///         failure => Err(Error::System(SystemError::new(failure))),
///     })
///     .build();
/// # let _ = settings;
/// ```
pub trait ResponseHandler: Send + Sync {
    /// Normalizes the outcome of one call.
    fn handle(&self, outcome: RequestOutcome) -> NormalizedResult;
}

impl<F> ResponseHandler for F
where
    F: Fn(RequestOutcome) -> NormalizedResult + Send + Sync,
{
    fn handle(&self, outcome: RequestOutcome) -> NormalizedResult {
        self(outcome)
    }
}

/// The built-in handler.
///
/// - A response whose body is an object with a truthy `error` field is an
///   [`Error::Api`] carrying that body.
/// - Any other 2xx response succeeds with its body as-is.
/// - Everything else is an [`Error::System`] wrapping the outcome.
///
/// A field is truthy unless it is `null` or `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponseHandler;

impl ResponseHandler for DefaultResponseHandler {
    fn handle(&self, outcome: RequestOutcome) -> NormalizedResult {
        match outcome {
            RequestOutcome::Response(response) if has_error(&response.body) => {
                tracing::warn!(
                    status = response.status.as_u16(),
                    error = %response.body["error"],
                    "Platform returned an error"
                );
                Err(Error::Api(response.body))
            }
            RequestOutcome::Response(response) if response.status.is_success() => {
                Ok(response.body)
            }
            other => Err(Error::System(SystemError::new(other))),
        }
    }
}

fn has_error(body: &Value) -> bool {
    body.as_object()
        .and_then(|map| map.get("error"))
        .is_some_and(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;
    use serde_json::json;
    use std::time::Duration;

    fn response(status: u16, body: Value) -> RequestOutcome {
        let mut response = HttpResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            body.to_string(),
        );
        response.body = body;
        RequestOutcome::Response(response)
    }

    #[test]
    fn test_error_body_is_api_error() {
        let result = DefaultResponseHandler.handle(response(200, json!({"error": "bad request"})));
        match result {
            Err(Error::Api(body)) => assert_eq!(body, json!({"error": "bad request"})),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_body_on_4xx_is_api_error() {
        let result = DefaultResponseHandler.handle(response(401, json!({"error": "unauthorized"})));
        assert!(matches!(result, Err(Error::Api(_))));
    }

    #[test]
    fn test_success_body_passes_through() {
        let result = DefaultResponseHandler.handle(response(200, json!({"id": 42})));
        assert_eq!(result.unwrap(), json!({"id": 42}));

        let result = DefaultResponseHandler.handle(response(200, json!("plain text")));
        assert_eq!(result.unwrap(), json!("plain text"));
    }

    #[test]
    fn test_falsy_error_field_is_success() {
        let result = DefaultResponseHandler.handle(response(200, json!({"error": null, "id": 1})));
        assert_eq!(result.unwrap(), json!({"error": null, "id": 1}));

        let result = DefaultResponseHandler.handle(response(200, json!({"error": false})));
        assert!(result.is_ok());
    }

    #[test]
    fn test_non_success_status_is_system_error() {
        let result = DefaultResponseHandler.handle(response(500, json!("boom")));
        match result {
            Err(Error::System(err)) => {
                assert_eq!(err.kind(), "system_error");
                assert_eq!(err.raw.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("Expected System error, got {:?}", other),
        }
    }

    #[test]
    fn test_transport_failure_is_system_error() {
        let timeout = Duration::from_millis(10);
        let outcome = RequestOutcome::Failure(TransportError::Timeout(timeout));
        let expected_raw = outcome.to_value();

        let err = DefaultResponseHandler.handle(outcome).unwrap_err();

        assert_eq!(
            err.payload(),
            json!({"kind": "system_error", "raw": expected_raw})
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_closure_handler() {
        let handler = |_outcome: RequestOutcome| -> NormalizedResult { Ok(json!("handled")) };
        let result = handler.handle(response(500, json!(null)));
        assert_eq!(result.unwrap(), json!("handled"));
    }
}
