//! Process-wide settings, per-client options, and their resolution into a
//! [`ClientConfig`].
//!
//! [`Settings`] are loaded once (usually at startup) and passed by reference
//! to every client creation. [`ClientOptions`] are given per client. Values
//! resolve as defaults < per-client overrides.

use crate::credential::{Credential, CredentialOverride};
use crate::error::ConfigError;
use crate::middleware::Middleware;
use crate::response::{DefaultResponseHandler, ResponseHandler};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The platform base URL used when no endpoint override is given.
pub const DEFAULT_ENDPOINT: &str = "https://api.tiki.vn/integration";

/// Process-wide configuration shared by every client.
///
/// # Examples
///
/// ```
/// use tiki_client::{Credential, Settings};
/// use std::time::Duration;
///
/// let settings = Settings::builder()
///     .credential(Credential::new("app-id", "app-secret"))
///     .timeout(Duration::from_secs(30))
///     .build();
///
/// assert_eq!(settings.timeout(), Some(Duration::from_secs(30)));
/// ```
#[derive(Clone, Default)]
pub struct Settings {
    proxy: Option<String>,
    credential: Credential,
    timeout: Option<Duration>,
    response_handler: Option<Arc<dyn ResponseHandler>>,
    middlewares: Vec<Middleware>,
}

impl Settings {
    /// Creates a new `SettingsBuilder`.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Loads settings from `TIKI_*` environment variables.
    ///
    /// Reads `TIKI_CLIENT_ID`, `TIKI_CLIENT_SECRET`, `TIKI_ACCESS_TOKEN`,
    /// `TIKI_SHOP_ID`, `TIKI_PROXY` and `TIKI_TIMEOUT_MS`. Unset or empty
    /// variables are left unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] if `TIKI_TIMEOUT_MS` is not a
    /// whole number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through `lookup`, using the same keys as [`Settings::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let timeout = match get("TIKI_TIMEOUT_MS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(millis) => Some(Duration::from_millis(millis)),
                Err(source) => return Err(ConfigError::InvalidTimeout { value, source }),
            },
            None => None,
        };

        Ok(Self {
            proxy: get("TIKI_PROXY"),
            credential: Credential {
                client_id: get("TIKI_CLIENT_ID"),
                client_secret: get("TIKI_CLIENT_SECRET"),
                access_token: get("TIKI_ACCESS_TOKEN"),
                shop_id: get("TIKI_SHOP_ID"),
            },
            timeout,
            ..Self::default()
        })
    }

    /// Returns the proxy URL, if configured.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Returns the default credential.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Returns the default timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the registered response handler, if any.
    pub fn response_handler(&self) -> Option<&Arc<dyn ResponseHandler>> {
        self.response_handler.as_ref()
    }

    /// Returns the custom middlewares appended to every chain.
    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("proxy", &self.proxy)
            .field("credential", &self.credential)
            .field("timeout", &self.timeout)
            .field("response_handler", &self.response_handler.is_some())
            .field("middlewares", &self.middlewares)
            .finish()
    }
}

/// Builder for [`Settings`].
#[derive(Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Routes every request through the given proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.settings.proxy = Some(proxy.into());
        self
    }

    /// Sets the default credential.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.settings.credential = credential;
        self
    }

    /// Bounds every call, including encoding and decoding, by `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = Some(timeout);
        self
    }

    /// Replaces the built-in response handler.
    pub fn response_handler(mut self, handler: impl ResponseHandler + 'static) -> Self {
        self.settings.response_handler = Some(Arc::new(handler));
        self
    }

    /// Appends a custom middleware. Custom steps run after the built-in ones,
    /// in the order they were added.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.settings.middlewares.push(middleware);
        self
    }

    /// Builds the settings.
    pub fn build(self) -> Settings {
        self.settings
    }
}

/// Options given when creating a single client.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Fields overriding the default credential.
    pub credential: CredentialOverride,
    /// Overrides [`DEFAULT_ENDPOINT`].
    pub endpoint: Option<String>,
    /// Sends request bodies form-encoded instead of as JSON.
    pub form_data: bool,
    /// Skips credential validation; no credential is carried.
    pub skip_signing: bool,
}

/// Configuration resolved for one client. Never mutated after resolution.
#[derive(Clone)]
pub struct ClientConfig {
    /// The proxy adapter option, present only if a proxy was configured.
    pub proxy: Option<String>,
    /// The base URL requests are resolved against.
    pub endpoint: String,
    /// The timeout, present only if one was configured.
    pub timeout: Option<Duration>,
    /// Whether bodies are form-encoded.
    pub form_data: bool,
    /// Whether credential validation is skipped.
    pub skip_signing: bool,
    /// The merged, not yet validated credential.
    pub credential: Credential,
    /// Custom middlewares appended to the chain.
    pub middlewares: Vec<Middleware>,
    /// The handler that normalizes outcomes.
    pub response_handler: Arc<dyn ResponseHandler>,
}

impl ClientConfig {
    /// Resolves `settings` and `options` into a client configuration.
    pub fn resolve(settings: &Settings, options: ClientOptions) -> Self {
        Self {
            proxy: settings.proxy.clone(),
            endpoint: options
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout: settings.timeout,
            form_data: options.form_data,
            skip_signing: options.skip_signing,
            credential: settings.credential.merge(&options.credential),
            middlewares: settings.middlewares.clone(),
            response_handler: settings
                .response_handler
                .clone()
                .unwrap_or_else(|| Arc::new(DefaultResponseHandler)),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("proxy", &self.proxy)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("form_data", &self.form_data)
            .field("skip_signing", &self.skip_signing)
            .field("credential", &self.credential)
            .field("middlewares", &self.middlewares)
            .finish_non_exhaustive()
    }
}
