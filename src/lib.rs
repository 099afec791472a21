//! # tiki-client - an HTTP client for the Tiki seller integration API
//!
//! Every call goes through a fixed chain of middleware steps (base URL,
//! credential/proxy options, request keeping, JSON or form encoding, an
//! optional timeout, then any custom steps) and comes back as a normalized
//! result: the decoded body on success, or an [`Error`] that is either the
//! platform's own error body or a system error holding the raw outcome.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tiki_client::{Client, Credential, RequestMetadata, Settings};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Process-wide settings, loaded once
//!     let settings = Settings::builder()
//!         .credential(Credential::new("app-id", "app-secret").with_access_token("token"))
//!         .timeout(Duration::from_secs(30))
//!         .build();
//!
//!     // A client per credential/endpoint combination
//!     let client = Client::builder(&settings).build()?;
//!
//!     match client.get("/v2/sellers/me", RequestMetadata::default()).await {
//!         Ok(seller) => println!("Seller: {}", seller),
//!         Err(tiki_client::Error::Api(body)) => eprintln!("Rejected: {}", body),
//!         Err(e) => eprintln!("Call failed: {}", e),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Chain order
//!
//! Requests pass the steps first to last and responses come back last to
//! first. See [`middleware`] for the exact composition.
//!
//! ## Request signing
//!
//! The validated credential is carried on every request in
//! [`CallContext::credential`], but no step signs requests yet.

mod client;
mod config;
mod credential;
mod error;
mod metadata;
pub mod middleware;
mod response;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ClientOptions, Settings, SettingsBuilder, DEFAULT_ENDPOINT};
pub use credential::{validate as validate_credential, Credential, CredentialOverride};
pub use error::{
    ConfigError, Error, FieldError, FieldErrorReason, NormalizedResult, Result, SystemError,
    TransportError, ValidationError,
};
pub use metadata::RequestMetadata;
pub use middleware::{build_chain, CallOptions, CustomMiddleware, Middleware};
pub use response::{DefaultResponseHandler, RequestOutcome, ResponseHandler};
pub use transport::{
    CallContext, HttpRequest, HttpResponse, KeptRequest, RequestBody, ReqwestTransport, Transport,
};
