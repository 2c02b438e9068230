//! API client for Sanctum-style backends.
//!
//! This crate handles:
//! - Request construction (base URL, JSON accept header, credentials)
//! - Payload routing (body for POST/PUT, query string otherwise)
//! - The CSRF cookie handshake before mutating requests
//! - Cookie and local-storage session state

pub mod client;
pub mod cookies;
pub mod headers;
pub mod interceptor;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;

pub use client::{ApiClient, ClientBuilder, ClientConfig, ClientError};
pub use interceptor::{CsrfInterceptor, RequestInterceptor};
pub use request::{HttpVerb, Request, RequestConfig};
pub use response::Response;
pub use session::{clear_session, csrf_cookie_exists, BrowserSession, SessionStore};
pub use transport::{ReqwestTransport, Transport};
