//! API client: request construction, the verb helpers, and session helpers.

use crate::headers::{content_type, names, HeaderMap};
use crate::interceptor::{CsrfInterceptor, RequestInterceptor};
use crate::request::{combine_url, query_pairs, sends_body, HttpVerb, Request, RequestConfig};
use crate::response::Response;
use crate::session::{self, BrowserSession, SessionStore};
use crate::transport::{ReqwestTransport, Transport};
use bytes::Bytes;
use http::StatusCode;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// API client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Timeout")]
    Timeout,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Request error: {0}")]
    Request(String),
    #[error("Response error: {0}")]
    Response(String),
    #[error("HTTP {status} from {url}")]
    Status {
        status: StatusCode,
        url: Url,
        body: Bytes,
    },
}

impl ClientError {
    /// The HTTP status, for errors caused by a non-2xx response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Origin every endpoint is resolved against.
    pub server_url: String,
    /// Path of the endpoint that sets the CSRF cookie.
    pub csrf_cookie_path: String,
    /// Request timeout. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Maximum redirects.
    pub max_redirects: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            csrf_cookie_path: "/sanctum/csrf-cookie".to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: format!("sanctum-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// The parsed server URL.
    pub fn server_url(&self) -> Result<Url, ClientError> {
        Url::parse(&self.server_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.server_url, e)))
    }

    /// The csrf-cookie endpoint on the server.
    pub fn csrf_cookie_url(&self) -> Result<Url, ClientError> {
        combine_url(&self.server_url, &self.csrf_cookie_path)
    }
}

/// HTTP client for a Sanctum-backed API.
///
/// Every call gets `Accept: application/json`, the configured server URL as
/// its base, and cookies. Non-GET calls made without a CSRF cookie fetch one
/// first.
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    /// Create a client with reqwest, a fresh browser session and the CSRF
    /// interceptor.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        ClientBuilder::with_config(config).build()
    }

    /// Start building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build the request `request` would send, without sending it.
    pub fn build_request(
        &self,
        verb: HttpVerb,
        endpoint: &str,
        data: Option<&Value>,
        overrides: RequestConfig,
    ) -> Result<Request, ClientError> {
        let method = overrides.method.unwrap_or_else(|| verb.as_method());
        let base_url = overrides
            .base_url
            .as_deref()
            .unwrap_or(&self.config.server_url);

        let mut headers = HeaderMap::new();
        headers.insert(names::ACCEPT, content_type::JSON);
        headers.merge(&overrides.headers);

        let mut request = Request::new(method, combine_url(base_url, endpoint)?)
            .headers(&headers)
            .with_credentials(overrides.with_credentials.unwrap_or(true));
        request.timeout = overrides.timeout.or(self.config.timeout);

        let empty = Value::Object(Map::new());
        let data = data.unwrap_or(&empty);
        if sends_body(&request.method) {
            request = request.json(data.clone());
        } else {
            request.query = query_pairs(data)?;
        }

        Ok(request)
    }

    /// Build and send a request.
    pub async fn request(
        &self,
        verb: HttpVerb,
        endpoint: &str,
        data: Option<&Value>,
        overrides: RequestConfig,
    ) -> Result<Response, ClientError> {
        let request = self.build_request(verb, endpoint, data, overrides)?;
        self.dispatch(request).await
    }

    /// Run the interceptors, then hand the request to the transport.
    pub async fn dispatch(&self, mut request: Request) -> Result<Response, ClientError> {
        for interceptor in &self.interceptors {
            request = interceptor.intercept(request, self.transport.as_ref()).await?;
        }

        tracing::debug!("{} {}", request.method, request.url);
        self.transport.send(request).await
    }

    /// GET with `params` as the query string.
    pub async fn get(&self, endpoint: &str, params: Option<&Value>) -> Result<Response, ClientError> {
        self.request(HttpVerb::Get, endpoint, params, RequestConfig::default())
            .await
    }

    /// POST with `data` as the JSON body.
    pub async fn post(
        &self,
        endpoint: &str,
        data: &Value,
        config: Option<RequestConfig>,
    ) -> Result<Response, ClientError> {
        self.request(HttpVerb::Post, endpoint, Some(data), config.unwrap_or_default())
            .await
    }

    /// PUT with `data` as the JSON body.
    pub async fn put(&self, endpoint: &str, data: &Value) -> Result<Response, ClientError> {
        self.request(HttpVerb::Put, endpoint, Some(data), RequestConfig::default())
            .await
    }

    /// DELETE with `params` as the query string.
    pub async fn delete(
        &self,
        endpoint: &str,
        params: Option<&Value>,
    ) -> Result<Response, ClientError> {
        self.request(HttpVerb::Delete, endpoint, params, RequestConfig::default())
            .await
    }

    /// Whether the session currently holds the CSRF cookie.
    pub fn csrf_cookie_exists(&self) -> bool {
        session::csrf_cookie_exists(self.session.as_ref())
    }

    /// Drop cached user info and expire the CSRF cookie.
    pub fn clear_session(&self) {
        session::clear_session(self.session.as_ref())
    }

    /// The session store shared with the transport and interceptors.
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Get client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// API client builder.
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    session: Option<Arc<dyn SessionStore>>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Start from an existing configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            session: None,
            interceptors: Vec::new(),
        }
    }

    /// Set the server URL.
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    /// Set the csrf-cookie endpoint path.
    pub fn csrf_cookie_path(mut self, path: impl Into<String>) -> Self {
        self.config.csrf_cookie_path = path.into();
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set maximum redirects.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Set user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Use a custom transport instead of reqwest.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom session store instead of a fresh browser session.
    pub fn session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Register an interceptor. Interceptors run after the CSRF gate, in
    /// registration order.
    pub fn interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let server_url = self.config.server_url()?;

        let session: Arc<dyn SessionStore> = match self.session {
            Some(session) => session,
            None => Arc::new(BrowserSession::new(server_url)),
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config, session.clone())?),
        };

        let mut csrf = CsrfInterceptor::new(self.config.csrf_cookie_url()?, session.clone());
        if let Some(timeout) = self.config.timeout {
            csrf = csrf.with_timeout(timeout);
        }

        let mut interceptors: Vec<Arc<dyn RequestInterceptor>> = vec![Arc::new(csrf)];
        interceptors.extend(self.interceptors);

        Ok(ApiClient {
            config: self.config,
            transport,
            interceptors,
            session,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
