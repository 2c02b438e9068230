//! Request execution.

use crate::client::{ClientConfig, ClientError};
use crate::headers::names;
use crate::request::Request;
use crate::response::Response;
use crate::session::{xsrf_token_in, SessionStore};
use async_trait::async_trait;
use http::{Method, StatusCode};
use std::sync::Arc;

/// Executes fully-built requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request. Non-2xx responses are returned as
    /// `ClientError::Status`.
    async fn send(&self, request: Request) -> Result<Response, ClientError>;
}

/// Transport backed by reqwest, sharing cookies with a session store.
///
/// For requests made with credentials it attaches the cookies scoped to the
/// request URL, echoes the `XSRF-TOKEN` cookie among them as `X-XSRF-TOKEN`,
/// and records every Set-Cookie header it receives. Redirects are followed
/// here rather than inside reqwest so cookies set by a 3xx hop are kept.
pub struct ReqwestTransport {
    inner: reqwest::Client,
    session: Arc<dyn SessionStore>,
    max_redirects: usize,
}

impl ReqwestTransport {
    /// Build the underlying reqwest client from the client configuration.
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none())
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;

        Ok(Self {
            inner,
            session,
            max_redirects: config.max_redirects,
        })
    }

    fn prepare(&self, request: &Request) -> reqwest::RequestBuilder {
        let mut req_builder = self.inner.request(request.method.clone(), request.url.clone());

        for (name, value) in request.headers.iter() {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        if request.with_credentials {
            let cookie_header = self.session.cookie_header(&request.url);

            if !request.headers.contains(names::X_XSRF_TOKEN) {
                if let Some(token) = xsrf_token_in(&cookie_header) {
                    req_builder = req_builder.header(names::X_XSRF_TOKEN, token);
                }
            }

            if !cookie_header.is_empty() {
                req_builder = req_builder.header(names::COOKIE, cookie_header);
            }
        }

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        if let Some(body) = &request.body {
            req_builder = req_builder.json(body);
        }

        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        req_builder
    }

    fn store_cookies(&self, response: &reqwest::Response) {
        for value in response.headers().get_all(names::SET_COOKIE) {
            if let Ok(set_cookie) = value.to_str() {
                self.session.store_response_cookie(response.url(), set_cookie);
            }
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let mut current = request;
        let mut redirects = 0;

        loop {
            let response = self.prepare(&current).send().await.map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout
                } else {
                    ClientError::Request(e.to_string())
                }
            })?;

            if current.with_credentials {
                self.store_cookies(&response);
            }

            let Some(next) = redirect_target(&current, &response) else {
                let response = Response::from_reqwest(response).await?;
                tracing::debug!(
                    "{} {} -> {}",
                    current.method,
                    current.url,
                    response.status()
                );
                return response.error_for_status();
            };

            if redirects >= self.max_redirects {
                return Err(ClientError::TooManyRedirects);
            }
            redirects += 1;

            tracing::debug!(
                "{} {} -> {}, following to {}",
                current.method,
                current.url,
                response.status(),
                next.url
            );
            current = next;
        }
    }
}

/// The request to send after a 3xx response, or `None` if it is final.
///
/// 303, and 301/302 after a POST, switch to a bodyless GET. Other redirects
/// replay the method and body.
fn redirect_target(request: &Request, response: &reqwest::Response) -> Option<Request> {
    let status = response.status();
    if !status.is_redirection() {
        return None;
    }

    let location = response.headers().get(names::LOCATION)?.to_str().ok()?;
    let url = response.url().join(location).ok()?;

    let mut next = request.clone();
    next.url = url;
    next.query.clear();

    let to_get = status == StatusCode::SEE_OTHER
        || ((status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND)
            && request.method == Method::POST);
    if to_get {
        next.method = Method::GET;
        next.body = None;
    }

    Some(next)
}
