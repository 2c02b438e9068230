//! Request interceptors, including the CSRF cookie gate.

use crate::client::ClientError;
use crate::headers::{content_type, names};
use crate::request::Request;
use crate::session::{csrf_cookie_exists, SessionStore};
use crate::transport::Transport;
use async_trait::async_trait;
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Hook run on every outgoing request before it reaches the transport.
///
/// An interceptor may issue its own requests through `transport` and may
/// rewrite the request it passes on.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(
        &self,
        request: Request,
        transport: &dyn Transport,
    ) -> Result<Request, ClientError>;
}

/// Fetches the CSRF cookie before the first mutating request.
///
/// When the session has no `XSRF-TOKEN` cookie and the request is not a GET,
/// a GET to the csrf-cookie endpoint is sent first. Its outcome is not
/// checked: the original request goes out either way.
pub struct CsrfInterceptor {
    csrf_url: Url,
    session: Arc<dyn SessionStore>,
    timeout: Option<Duration>,
}

impl CsrfInterceptor {
    pub fn new(csrf_url: Url, session: Arc<dyn SessionStore>) -> Self {
        Self {
            csrf_url,
            session,
            timeout: None,
        }
    }

    /// Bound the priming request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The csrf-cookie endpoint.
    pub fn csrf_url(&self) -> &Url {
        &self.csrf_url
    }

    fn priming_request(&self) -> Request {
        let request = Request::new(Method::GET, self.csrf_url.clone())
            .header(names::ACCEPT, content_type::JSON)
            .with_credentials(true);
        match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }
}

#[async_trait]
impl RequestInterceptor for CsrfInterceptor {
    async fn intercept(
        &self,
        request: Request,
        transport: &dyn Transport,
    ) -> Result<Request, ClientError> {
        if request.method == Method::GET || csrf_cookie_exists(self.session.as_ref()) {
            return Ok(request);
        }

        tracing::debug!(
            "No CSRF cookie before {} {}, fetching {}",
            request.method,
            request.url,
            self.csrf_url
        );

        if let Err(e) = transport.send(self.priming_request()).await {
            tracing::warn!("CSRF cookie request to {} failed: {}", self.csrf_url, e);
        }

        Ok(request)
    }
}
