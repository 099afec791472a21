//! Error types for client creation and API calls.
//!
//! Failures are split by the stage that produces them:
//!
//! - [`ValidationError`] is returned while building a [`Client`](crate::Client)
//!   when required credential fields are missing or empty.
//! - [`Error`] is what every dispatched call fails with. It is either the
//!   platform's own error body ([`Error::Api`]) or a [`SystemError`] that keeps
//!   the raw transport outcome around for debugging.
//! - [`TransportError`] describes what went wrong below the response handler
//!   (network, timeout, encoding, decoding).

use crate::response::RequestOutcome;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// The error returned by dispatched calls.
///
/// # Examples
///
/// ```no_run
/// use tiki_client::{Client, Error, RequestMetadata, Settings};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = Settings::from_env()?;
/// let client = Client::builder(&settings).build()?;
///
/// match client.get("/v2/sellers/me", RequestMetadata::default()).await {
///     Ok(body) => println!("Seller: {}", body),
///     Err(Error::Api(body)) => eprintln!("Platform rejected the call: {}", body),
///     Err(Error::System(err)) => eprintln!("Call failed: {}", err),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The platform answered with a body carrying a truthy `error` field.
    ///
    /// The body is surfaced verbatim.
    #[error("API error: {0}")]
    Api(Value),

    /// The call failed below the application level, or came back in a shape
    /// the handler does not understand.
    #[error(transparent)]
    System(#[from] SystemError),
}

impl Error {
    /// Returns the error payload as a JSON value.
    ///
    /// API errors yield the platform body unchanged, system errors yield
    /// `{"kind": "system_error", "raw": ...}`.
    pub fn payload(&self) -> Value {
        match self {
            Error::Api(body) => body.clone(),
            Error::System(err) => err.to_payload(),
        }
    }

    /// Returns `true` if the platform itself reported the error.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Error::Api(_))
    }

    /// Returns the HTTP status behind a system error, if a response was
    /// received.
    ///
    /// [`Error::Api`] carries only the platform's body, so this is always
    /// `None` for API errors.
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Error::Api(_) => None,
            Error::System(err) => err.raw.status(),
        }
    }
}

/// A transport-level failure or an unexpected outcome.
#[derive(Debug)]
pub struct SystemError {
    /// The raw outcome that could not be normalized.
    pub raw: RequestOutcome,
}

impl SystemError {
    /// The error tag used in the payload form.
    pub const KIND: &'static str = "system_error";

    /// Wraps a raw outcome.
    pub fn new(raw: RequestOutcome) -> Self {
        Self { raw }
    }

    /// Returns the error tag, always `"system_error"`.
    pub fn kind(&self) -> &'static str {
        Self::KIND
    }

    /// Renders the error as `{"kind": "system_error", "raw": <outcome>}`.
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "kind": Self::KIND,
            "raw": self.raw.to_value(),
        })
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw {
            RequestOutcome::Response(response) => write!(
                f,
                "System error: unexpected response (status {}): {}",
                response.status, response.body
            ),
            RequestOutcome::Failure(err) => write!(f, "System error: {}", err),
        }
    }
}

impl std::error::Error for SystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.raw {
            RequestOutcome::Failure(err) => Some(err),
            RequestOutcome::Response(_) => None,
        }
    }
}

/// A failure raised by the transport or by a middleware step.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The timeout step expired before the chain completed.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The request body could not be encoded.
    #[error("Failed to encode request body: {0}")]
    Encode(String),

    /// The response body could not be decoded.
    #[error("Failed to decode response body: {message}")]
    Decode {
        /// The raw response body that failed to decode
        raw: String,
        /// The decoder error message
        message: String,
    },

    /// A custom middleware refused the request.
    #[error("Middleware `{name}` failed: {message}")]
    Middleware {
        /// The middleware name
        name: String,
        /// What went wrong
        message: String,
    },

    /// The resolved request URL is invalid.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Credential or adapter validation failure raised while building a client.
///
/// Every offending field is listed, in declaration order.
///
/// # Examples
///
/// ```
/// use tiki_client::{Client, ClientOptions, Settings};
///
/// let settings = Settings::default();
/// let err = Client::create(&settings, ClientOptions::default()).unwrap_err();
///
/// assert_eq!(err.field_names(), vec!["client_id", "client_secret"]);
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed: {}", describe_fields(.fields))]
pub struct ValidationError {
    /// The fields that failed validation.
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    /// Returns the names of the failing fields.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.field).collect()
    }

    /// Returns `true` if `field` is among the failing fields.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The field name, e.g. `client_id`.
    pub field: &'static str,
    /// Why the field was rejected.
    pub reason: FieldErrorReason,
}

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorReason {
    /// The field was not provided.
    Missing,
    /// The field was provided as an empty string.
    Empty,
    /// The field was provided but could not be used.
    Invalid(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FieldErrorReason::Missing => write!(f, "{} is required", self.field),
            FieldErrorReason::Empty => write!(f, "{} must not be empty", self.field),
            FieldErrorReason::Invalid(reason) => write!(f, "{} is invalid: {}", self.field, reason),
        }
    }
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while loading [`Settings`](crate::Settings) from the environment.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The timeout variable is not a whole number of milliseconds.
    #[error("Invalid timeout `{value}`: {source}")]
    InvalidTimeout {
        /// The rejected value
        value: String,
        /// The parse error
        source: std::num::ParseIntError,
    },
}

/// A specialized `Result` type for dispatched calls.
pub type Result<T> = std::result::Result<T, Error>;

/// The uniform shape every dispatched call returns.
pub type NormalizedResult = Result<Value>;
