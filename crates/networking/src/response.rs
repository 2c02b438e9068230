//! HTTP response handling.

use crate::client::ClientError;
use crate::headers::HeaderMap;
use bytes::Bytes;
use encoding_rs::Encoding;
use http::StatusCode;
use mime::Mime;
use serde::de::DeserializeOwned;
use url::Url;

/// An HTTP response.
#[derive(Clone, Debug)]
pub struct Response {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL (after redirects).
    pub url: Url,
    /// Response body.
    body: Bytes,
    /// Content type.
    content_type: Option<Mime>,
}

impl Response {
    /// Build a response from already-received parts.
    pub fn from_parts(
        status: StatusCode,
        headers: HeaderMap,
        url: Url,
        body: impl Into<Bytes>,
    ) -> Self {
        let content_type = headers.content_type().and_then(|s| s.parse().ok());
        Self {
            status,
            headers,
            url,
            body: body.into(),
            content_type,
        }
    }

    /// Create a response from reqwest response.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status();
        let url = response.url().clone();

        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str(), v);
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Response(e.to_string()))?;

        Ok(Self::from_parts(status, headers, url, body))
    }

    /// Turn a non-2xx response into `ClientError::Status`.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Status {
                status: self.status,
                url: self.url,
                body: self.body,
            })
        }
    }

    /// Get the response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header.
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    /// Get the final URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the content type.
    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    /// Get the body as bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Get the body as text.
    pub fn text(&self) -> String {
        let encoding = self.detect_encoding();
        let (text, _, _) = encoding.decode(&self.body);
        text.into_owned()
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Response(e.to_string()))
    }

    /// Detect character encoding.
    fn detect_encoding(&self) -> &'static Encoding {
        if let Some(mime) = &self.content_type {
            if let Some(charset) = mime.get_param("charset") {
                if let Some(encoding) = Encoding::for_label(charset.as_str().as_bytes()) {
                    return encoding;
                }
            }
        }

        // BOM sniffing, then UTF-8
        Encoding::for_bom(&self.body)
            .map(|(encoding, _)| encoding)
            .unwrap_or(encoding_rs::UTF_8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn response(status: u16, content_type: &str, body: &'static [u8]) -> Response {
        let headers: HeaderMap = [("Content-Type", content_type)].into_iter().collect();
        Response::from_parts(
            StatusCode::from_u16(status).unwrap(),
            headers,
            Url::parse("http://localhost/api/user").unwrap(),
            Bytes::from_static(body),
        )
    }

    #[test]
    fn test_json_body() {
        let rsp = response(200, "application/json", br#"{"id":7}"#);
        let value: Value = rsp.json().unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(rsp.content_type().unwrap().essence_str(), "application/json");
    }

    #[test]
    fn test_error_for_status() {
        let rsp = response(419, "application/json", br#"{"message":"CSRF token mismatch."}"#);
        match rsp.error_for_status() {
            Err(ClientError::Status { status, body, .. }) => {
                assert_eq!(status.as_u16(), 419);
                assert!(String::from_utf8_lossy(&body).contains("CSRF"));
            }
            other => panic!("expected status error, got {:?}", other.map(|r| r.status)),
        }

        assert!(response(204, "text/plain", b"").error_for_status().is_ok());
    }

    #[test]
    fn test_text_uses_charset() {
        let rsp = response(200, "text/plain; charset=iso-8859-1", b"caf\xe9");
        assert_eq!(rsp.text(), "café");
    }
}
