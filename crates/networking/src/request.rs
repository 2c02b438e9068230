//! Request descriptors and payload routing.

use crate::client::ClientError;
use crate::headers::HeaderMap;
use http::Method;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

/// The verbs the API client issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    /// The matching `http::Method`.
    pub fn as_method(self) -> Method {
        match self {
            HttpVerb::Get => Method::GET,
            HttpVerb::Post => Method::POST,
            HttpVerb::Put => Method::PUT,
            HttpVerb::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

impl From<HttpVerb> for Method {
    fn from(verb: HttpVerb) -> Self {
        verb.as_method()
    }
}

/// An HTTP request, fully specified and ready for a transport.
#[derive(Clone, Debug)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// JSON request body.
    pub body: Option<Value>,
    /// Send and accept cookies.
    pub with_credentials: bool,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl Request {
    /// Create a new request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            with_credentials: false,
            timeout: None,
        }
    }

    /// Set a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set multiple headers.
    pub fn headers(mut self, headers: &HeaderMap) -> Self {
        self.headers.merge(headers);
        self
    }

    /// Set the JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Include cookies.
    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Per-call overrides layered on top of the client defaults.
#[derive(Clone, Debug, Default)]
pub struct RequestConfig {
    /// Replace the method. Payload routing follows the replaced method.
    pub method: Option<Method>,
    /// Replace the server URL.
    pub base_url: Option<String>,
    /// Headers merged over the defaults.
    pub headers: HeaderMap,
    /// Replace the credentials flag.
    pub with_credentials: Option<bool>,
    /// Replace the timeout.
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = Some(enabled);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Whether `method` carries its payload in the body.
///
/// Only POST and PUT do; GET, DELETE and everything else send the payload as
/// query parameters.
pub fn sends_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT
}

/// Flatten an object payload into query pairs.
///
/// Strings are used verbatim, other scalars as their JSON text, arrays as
/// repeated `key[]` entries and nested objects as JSON. `null` entries are
/// dropped.
pub fn query_pairs(payload: &Value) -> Result<Vec<(String, String)>, ClientError> {
    let map = match payload {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => {
            return Err(ClientError::InvalidPayload(format!(
                "query parameters must be an object, got {}",
                json_kind(other)
            )))
        }
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let name = format!("{}[]", key);
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.push((name.clone(), scalar_text(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    Ok(pairs)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Join an endpoint onto a base URL.
///
/// Absolute endpoints (`scheme://...`) are used as-is. Otherwise slashes at
/// the seam are collapsed so `http://host/` + `/x` and `http://host` + `x`
/// both give `http://host/x`.
pub fn combine_url(base: &str, endpoint: &str) -> Result<Url, ClientError> {
    let full = if is_absolute_url(endpoint) {
        endpoint.to_string()
    } else if endpoint.is_empty() {
        base.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    };

    Url::parse(&full).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", full, e)))
}

fn is_absolute_url(endpoint: &str) -> bool {
    match endpoint.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_creation() {
        let url = Url::parse("https://example.com").unwrap();
        let request = Request::new(Method::GET, url)
            .header("Accept", "application/json")
            .query("page", "2");

        assert_eq!(request.method, Method::GET);
        assert!(request.headers.get("Accept").is_some());
        assert_eq!(request.query_value("page"), Some("2"));
        assert!(!request.with_credentials);
    }

    #[test]
    fn test_verb_display() {
        assert_eq!(HttpVerb::Get.to_string(), "GET");
        assert_eq!(HttpVerb::Delete.to_string(), "DELETE");
        assert_eq!(Method::from(HttpVerb::Put), Method::PUT);
    }

    #[test]
    fn test_sends_body() {
        assert!(sends_body(&Method::POST));
        assert!(sends_body(&Method::PUT));
        assert!(!sends_body(&Method::GET));
        assert!(!sends_body(&Method::DELETE));
        assert!(!sends_body(&Method::PATCH));
    }

    #[test]
    fn test_query_pairs_flattening() {
        let pairs = query_pairs(&json!({
            "a": 1,
            "name": "x y",
            "flag": true,
            "skip": null,
            "ids": [1, 2],
            "filter": {"k": "v"}
        }))
        .unwrap();

        assert!(pairs.contains(&("a".to_string(), "1".to_string())));
        assert!(pairs.contains(&("name".to_string(), "x y".to_string())));
        assert!(pairs.contains(&("flag".to_string(), "true".to_string())));
        assert!(pairs.contains(&("ids[]".to_string(), "1".to_string())));
        assert!(pairs.contains(&("ids[]".to_string(), "2".to_string())));
        assert!(pairs.contains(&("filter".to_string(), r#"{"k":"v"}"#.to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "skip"));
    }

    #[test]
    fn test_query_pairs_rejects_scalars() {
        assert!(query_pairs(&Value::Null).unwrap().is_empty());
        assert!(matches!(
            query_pairs(&json!([1, 2])),
            Err(ClientError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_combine_url() {
        let url = combine_url("http://localhost:8000", "/api/user").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/user");

        let url = combine_url("http://localhost:8000/", "api/user").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/user");

        let url = combine_url("http://localhost:8000/v1/", "/login").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/v1/login");

        let url = combine_url("http://localhost:8000", "https://other.test/x").unwrap();
        assert_eq!(url.as_str(), "https://other.test/x");
    }

    #[test]
    fn test_combine_url_invalid_base() {
        assert!(matches!(
            combine_url("not a url", "/x"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
