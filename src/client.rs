//! Client creation and request dispatch.
//!
//! The [`Client`] type is the main entry point for making calls. Use
//! [`Client::builder`] or [`Client::create`] to build one from [`Settings`].

use crate::{
    config::{ClientConfig, ClientOptions, Settings},
    credential::{self, Credential, CredentialOverride},
    error::{FieldError, FieldErrorReason, NormalizedResult, TransportError, ValidationError},
    metadata::RequestMetadata,
    middleware::{self, Middleware},
    response::{RequestOutcome, ResponseHandler},
    transport::{HttpRequest, RequestBody, ReqwestTransport, Transport},
};
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// A client bound to one credential, endpoint and middleware chain.
///
/// Clients are immutable and cheap to clone; a single client can serve any
/// number of concurrent calls.
///
/// # Examples
///
/// ```no_run
/// use tiki_client::{Client, Credential, RequestMetadata, Settings};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = Settings::builder()
///     .credential(Credential::new("app-id", "app-secret").with_access_token("token"))
///     .build();
///
/// let client = Client::builder(&settings).build()?;
///
/// let seller = client.get("/v2/sellers/me", RequestMetadata::default()).await?;
/// println!("Seller: {}", seller);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    credential: Option<Credential>,
    chain: Vec<Middleware>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Creates a new `ClientBuilder` reading defaults from `settings`.
    pub fn builder(settings: &Settings) -> ClientBuilder<'_> {
        ClientBuilder::new(settings)
    }

    /// Creates a client from `settings` and per-client `options`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming every missing or empty credential
    /// field, unless `options.skip_signing` is set.
    pub fn create(settings: &Settings, options: ClientOptions) -> Result<Client, ValidationError> {
        ClientBuilder::new(settings).options(options).build()
    }

    /// Returns the validated credential, or `None` if signing was skipped.
    pub fn credential(&self) -> Option<&Credential> {
        self.inner.credential.as_ref()
    }

    /// Returns the resolved configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the middleware chain, outermost step first.
    pub fn chain(&self) -> &[Middleware] {
        &self.inner.chain
    }

    /// Returns the names of the chain's steps, outermost first.
    pub fn chain_names(&self) -> Vec<&str> {
        self.inner.chain.iter().map(Middleware::name).collect()
    }

    /// Runs one call through the chain and normalizes the outcome.
    ///
    /// The call is tagged with `path` in its tracing span and in the request
    /// context. It is never retried.
    pub async fn call(
        &self,
        method: Method,
        path: impl Into<String>,
        body: Option<Value>,
        metadata: RequestMetadata,
    ) -> NormalizedResult {
        let path = path.into();
        let span = tracing::info_span!("tiki_call", call = %path, method = %method);

        async move {
            let mut request = HttpRequest::new(method, path.clone());
            request.query = metadata.query_params;
            request.headers = metadata.headers;
            request.body = body.map_or(RequestBody::Empty, RequestBody::Value);
            request.context.call = Some(path);

            let start_time = Instant::now();
            let result =
                middleware::run(&self.inner.chain, self.inner.transport.as_ref(), request).await;

            match &result {
                Ok(response) => tracing::debug!(
                    status = response.status.as_u16(),
                    latency_ms = start_time.elapsed().as_millis(),
                    "Call completed"
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    latency_ms = start_time.elapsed().as_millis(),
                    "Request failed"
                ),
            }

            self.inner
                .config
                .response_handler
                .handle(RequestOutcome::from(result))
        }
        .instrument(span)
        .await
    }

    /// Makes a GET request.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tiki_client::{Client, RequestMetadata, Settings};
    ///
    /// # async fn example(client: Client) -> Result<(), tiki_client::Error> {
    /// let metadata = RequestMetadata::new().with_query_param("page", "1");
    /// let orders = client.get("/v2/orders", metadata).await?;
    /// println!("Orders: {}", orders);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(
        &self,
        path: impl Into<String>,
        metadata: RequestMetadata,
    ) -> NormalizedResult {
        self.call(Method::GET, path, None, metadata).await
    }

    /// Makes a POST request with `body`.
    pub async fn post<Req>(
        &self,
        path: impl Into<String>,
        body: &Req,
        metadata: RequestMetadata,
    ) -> NormalizedResult
    where
        Req: Serialize + ?Sized,
    {
        self.send_with_body(Method::POST, path, body, metadata).await
    }

    /// Makes a PUT request with `body`.
    pub async fn put<Req>(
        &self,
        path: impl Into<String>,
        body: &Req,
        metadata: RequestMetadata,
    ) -> NormalizedResult
    where
        Req: Serialize + ?Sized,
    {
        self.send_with_body(Method::PUT, path, body, metadata).await
    }

    /// Makes a DELETE request. A body, if needed, goes in `metadata.body`.
    pub async fn delete(
        &self,
        path: impl Into<String>,
        mut metadata: RequestMetadata,
    ) -> NormalizedResult {
        let body = metadata.body.take();
        self.call(Method::DELETE, path, body, metadata).await
    }

    async fn send_with_body<Req>(
        &self,
        method: Method,
        path: impl Into<String>,
        body: &Req,
        metadata: RequestMetadata,
    ) -> NormalizedResult
    where
        Req: Serialize + ?Sized,
    {
        match serde_json::to_value(body) {
            Ok(body) => self.call(method, path, Some(body), metadata).await,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize request body");
                let outcome = RequestOutcome::Failure(TransportError::Encode(e.to_string()));
                self.inner.config.response_handler.handle(outcome)
            }
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("chain", &self.chain_names())
            .finish_non_exhaustive()
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```
/// use tiki_client::{Client, Credential, CredentialOverride, Settings};
///
/// let settings = Settings::builder()
///     .credential(Credential::new("app-id", "app-secret"))
///     .build();
///
/// let client = Client::builder(&settings)
///     .credential(CredentialOverride {
///         shop_id: Some("shop-1".to_string()),
///         ..Default::default()
///     })
///     .form_data(true)
///     .build()
///     .unwrap();
///
/// assert_eq!(client.credential().unwrap().shop_id.as_deref(), Some("shop-1"));
/// ```
pub struct ClientBuilder<'a> {
    settings: &'a Settings,
    options: ClientOptions,
    transport: Option<Arc<dyn Transport>>,
}

impl<'a> ClientBuilder<'a> {
    /// Creates a builder reading defaults from `settings`.
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            options: ClientOptions::default(),
            transport: None,
        }
    }

    /// Replaces all per-client options at once.
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides fields of the default credential.
    pub fn credential(mut self, credential: CredentialOverride) -> Self {
        self.options.credential = credential;
        self
    }

    /// Overrides the platform endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.endpoint = Some(endpoint.into());
        self
    }

    /// Sends request bodies form-encoded instead of as JSON.
    pub fn form_data(mut self, form_data: bool) -> Self {
        self.options.form_data = form_data;
        self
    }

    /// Skips credential validation.
    pub fn skip_signing(mut self, skip_signing: bool) -> Self {
        self.options.skip_signing = skip_signing;
        self
    }

    /// Uses `transport` instead of the default `reqwest` one.
    ///
    /// The configured proxy is not applied to a custom transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a required credential field is missing
    /// or empty (unless signing is skipped), or if the proxy is rejected.
    pub fn build(self) -> Result<Client, ValidationError> {
        let config = ClientConfig::resolve(self.settings, self.options);

        let credential = credential::validate(config.credential.clone(), config.skip_signing)
            .map_err(|err| {
                tracing::warn!(error = %err, "Client creation rejected");
                err
            })?;

        let transport: Arc<dyn Transport> = match (self.transport, config.proxy.as_deref()) {
            (Some(transport), _) => transport,
            (None, None) => Arc::new(ReqwestTransport::default()),
            (None, Some(proxy)) => match ReqwestTransport::with_proxy(proxy) {
                Ok(transport) => Arc::new(transport),
                Err(e) => {
                    let err = ValidationError {
                        fields: vec![FieldError {
                            field: "proxy",
                            reason: FieldErrorReason::Invalid(e.to_string()),
                        }],
                    };
                    tracing::warn!(error = %err, "Client creation rejected");
                    return Err(err);
                }
            },
        };

        let chain = middleware::build_chain(&config, credential.as_ref());

        tracing::debug!(
            endpoint = %config.endpoint,
            form_data = config.form_data,
            skip_signing = config.skip_signing,
            chain = ?chain.iter().map(Middleware::name).collect::<Vec<_>>(),
            "Built client"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                config,
                credential,
                chain,
                transport,
            }),
        })
    }
}
