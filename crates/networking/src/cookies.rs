//! Cookie management.

use chrono::DateTime;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// A cookie.
#[derive(Clone, Debug)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain.
    pub domain: Option<String>,
    /// Path.
    pub path: Option<String>,
    /// Expiration time (Unix timestamp).
    pub expires: Option<u64>,
    /// Max-Age in seconds. Zero or negative means "delete now".
    pub max_age: Option<i64>,
    /// Secure flag.
    pub secure: bool,
    /// HttpOnly flag.
    pub http_only: bool,
    /// SameSite attribute.
    pub same_site: SameSite,
    /// Creation time.
    pub created: u64,
}

/// SameSite attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    None,
    Lax,
    Strict,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl Cookie {
    /// Create a new cookie.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: SameSite::Lax,
            created: now_secs(),
        }
    }

    /// Parse a Set-Cookie header (or a `document.cookie` assignment).
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';').map(|s| s.trim());

        let name_value = parts.next()?;
        let (name, value) = name_value.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::new(name, value.trim());

        for attr in parts {
            let (attr_name, attr_value) = attr
                .split_once('=')
                .map(|(n, v)| (n.trim().to_lowercase(), Some(v.trim())))
                .unwrap_or_else(|| (attr.trim().to_lowercase(), None));

            match attr_name.as_str() {
                "domain" => {
                    cookie.domain = attr_value
                        .map(|s| s.trim_start_matches('.').to_lowercase())
                        .filter(|s| !s.is_empty());
                }
                "path" => {
                    cookie.path = attr_value
                        .filter(|s| s.starts_with('/'))
                        .map(|s| s.to_string());
                }
                "expires" => {
                    cookie.expires = attr_value.and_then(parse_http_date);
                }
                "max-age" => {
                    cookie.max_age = attr_value.and_then(|s| s.parse().ok());
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "samesite" => {
                    cookie.same_site = match attr_value.map(|s| s.to_lowercase()).as_deref() {
                        Some("strict") => SameSite::Strict,
                        Some("none") => SameSite::None,
                        _ => SameSite::Lax,
                    };
                }
                _ => {}
            }
        }

        Some(cookie)
    }

    /// Check if the cookie is expired.
    pub fn is_expired(&self) -> bool {
        let now = now_secs();

        // Max-Age takes precedence over Expires
        if let Some(max_age) = self.max_age {
            return max_age <= 0 || self.created.saturating_add(max_age as u64) <= now;
        }

        if let Some(expires) = self.expires {
            return expires <= now;
        }

        false
    }

    /// Check if cookie is valid for a URL.
    pub fn matches_url(&self, url: &Url) -> bool {
        if self.secure && url.scheme() != "https" {
            return false;
        }

        if let Some(domain) = &self.domain {
            match url.host_str() {
                Some(host) if domain_matches(host, domain) => {}
                _ => return false,
            }
        }

        if let Some(path) = &self.path {
            if !path_matches(url.path(), path) {
                return false;
            }
        }

        true
    }
}

/// Cookie jar for storing cookies.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    /// Cookies indexed by domain, then by path and name.
    cookies: HashMap<String, IndexMap<(String, String), Cookie>>,
}

impl CookieJar {
    /// Create a new cookie jar.
    pub fn new() -> Self {
        Self {
            cookies: HashMap::new(),
        }
    }

    /// Add a cookie from a Set-Cookie header received for `url`.
    ///
    /// Missing Domain and Path attributes default to the URL's host and
    /// directory. A Domain the host does not belong to is rejected.
    pub fn add_from_response(&mut self, url: &Url, header: &str) {
        let Some(mut cookie) = Cookie::parse(header) else {
            tracing::debug!("Ignoring malformed cookie from {}", url);
            return;
        };

        let host = url.host_str().unwrap_or_default().to_lowercase();
        match &cookie.domain {
            Some(domain) if !domain_matches(&host, domain) => {
                tracing::debug!(
                    "Ignoring cookie {} for domain {} set by {}",
                    cookie.name,
                    domain,
                    host
                );
                return;
            }
            Some(_) => {}
            None => cookie.domain = Some(host),
        }

        if cookie.path.is_none() {
            cookie.path = Some(default_path(url));
        }

        self.add(cookie);
    }

    /// Add a cookie, replacing one with the same domain, path and name. An
    /// already-expired cookie removes the stored one instead.
    pub fn add(&mut self, cookie: Cookie) {
        self.remove_expired();

        let domain = cookie.domain.clone().unwrap_or_default();
        let path = cookie.path.clone().unwrap_or_else(|| "/".to_string());

        if cookie.is_expired() {
            self.remove(&domain, &path, &cookie.name);
            return;
        }

        self.cookies
            .entry(domain)
            .or_default()
            .insert((path, cookie.name.clone()), cookie);
    }

    /// Get cookies for a URL.
    pub fn get_cookies(&self, url: &Url) -> Vec<&Cookie> {
        self.cookies
            .values()
            .flat_map(|cookies| cookies.values())
            .filter(|cookie| !cookie.is_expired() && cookie.matches_url(url))
            .collect()
    }

    /// Get a single cookie visible to `url` by name.
    pub fn get(&self, url: &Url, name: &str) -> Option<&Cookie> {
        self.get_cookies(url).into_iter().find(|c| c.name == name)
    }

    /// Get the Cookie header value for a URL.
    pub fn get_cookie_header(&self, url: &Url) -> String {
        join_pairs(self.get_cookies(url))
    }

    /// The `document.cookie` view of the jar for a page URL: like the
    /// Cookie header, minus HttpOnly cookies.
    pub fn document_cookie(&self, url: &Url) -> String {
        join_pairs(
            self.get_cookies(url)
                .into_iter()
                .filter(|c| !c.http_only),
        )
    }

    /// Remove a cookie.
    pub fn remove(&mut self, domain: &str, path: &str, name: &str) {
        if let Some(cookies) = self.cookies.get_mut(domain) {
            cookies.shift_remove(&(path.to_string(), name.to_string()));
        }
    }

    /// Drop every cookie whose lifetime has run out.
    pub fn remove_expired(&mut self) {
        for cookies in self.cookies.values_mut() {
            cookies.retain(|_, cookie| !cookie.is_expired());
        }
        self.cookies.retain(|_, cookies| !cookies.is_empty());
    }

    /// Get total number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.values().map(|c| c.len()).sum()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.cookies.values().all(|c| c.is_empty())
    }
}

fn join_pairs<'a>(cookies: impl IntoIterator<Item = &'a Cookie>) -> String {
    cookies
        .into_iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Host matches a cookie domain exactly or as a subdomain.
fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_lowercase();
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

/// RFC 6265 path-match.
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// Directory of the request path, used when Path is absent.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Parse an HTTP date (IMF-fixdate) to a Unix timestamp.
fn parse_http_date(date_str: &str) -> Option<u64> {
    let parsed = DateTime::parse_from_rfc2822(date_str).ok()?;
    Some(parsed.timestamp().max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_parse() {
        let cookie = Cookie::parse("session_id=abc123; Path=/; Secure; HttpOnly").unwrap();
        assert_eq!(cookie.name, "session_id");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.path, Some("/".to_string()));
        assert!(cookie.secure);
        assert!(cookie.http_only);
    }

    #[test]
    fn test_cookie_jar() {
        let mut jar = CookieJar::new();
        let url = Url::parse("https://example.com/path").unwrap();

        jar.add_from_response(&url, "session=abc123; Path=/");
        jar.add_from_response(&url, "user=john; Path=/path");

        let cookies = jar.get_cookies(&url);
        assert_eq!(cookies.len(), 2);

        let header = jar.get_cookie_header(&url);
        assert!(header.contains("session=abc123"));
        assert!(header.contains("user=john"));
    }

    #[test]
    fn test_same_site() {
        let cookie = Cookie::parse("id=123; SameSite=Strict").unwrap();
        assert_eq!(cookie.same_site, SameSite::Strict);

        let cookie = Cookie::parse("id=123; SameSite=None; Secure").unwrap();
        assert_eq!(cookie.same_site, SameSite::None);
    }

    #[test]
    fn test_max_age_zero_deletes() {
        let mut jar = CookieJar::new();
        let url = Url::parse("http://localhost:8000/").unwrap();

        jar.add_from_response(&url, "XSRF-TOKEN=abc; Path=/");
        assert_eq!(jar.len(), 1);

        jar.add_from_response(&url, "XSRF-TOKEN=; Max-Age=0; path=/; domain=localhost");
        assert!(jar.is_empty());
        assert_eq!(jar.get_cookie_header(&url), "");
    }

    #[test]
    fn test_negative_max_age_is_expired() {
        let cookie = Cookie::parse("a=b; Max-Age=-1").unwrap();
        assert!(cookie.is_expired());
    }

    #[test]
    fn test_expires_in_the_past() {
        let cookie = Cookie::parse("a=b; Expires=Thu, 01 Jan 1970 00:00:00 GMT").unwrap();
        assert_eq!(cookie.expires, Some(0));
        assert!(cookie.is_expired());

        let cookie = Cookie::parse("a=b; Expires=Fri, 31 Dec 9999 23:59:59 GMT").unwrap();
        assert!(!cookie.is_expired());
    }

    #[test]
    fn test_default_path_is_directory() {
        let mut jar = CookieJar::new();
        let url = Url::parse("http://localhost/sanctum/csrf-cookie").unwrap();
        jar.add_from_response(&url, "a=1");

        assert!(jar.get(&Url::parse("http://localhost/sanctum/other").unwrap(), "a").is_some());
        assert!(jar.get(&Url::parse("http://localhost/api/user").unwrap(), "a").is_none());
    }

    #[test]
    fn test_domain_match_requires_label_boundary() {
        let cookie = Cookie::parse("a=1; Domain=example.com").unwrap();
        assert!(cookie.matches_url(&Url::parse("http://api.example.com/").unwrap()));
        assert!(cookie.matches_url(&Url::parse("http://example.com/").unwrap()));
        assert!(!cookie.matches_url(&Url::parse("http://badexample.com/").unwrap()));
    }

    #[test]
    fn test_document_cookie_hides_http_only() {
        let mut jar = CookieJar::new();
        let url = Url::parse("http://localhost/").unwrap();
        jar.add_from_response(&url, "laravel_session=s; Path=/; HttpOnly");
        jar.add_from_response(&url, "XSRF-TOKEN=t; Path=/");

        assert_eq!(jar.document_cookie(&url), "XSRF-TOKEN=t");
        assert!(jar.get_cookie_header(&url).contains("laravel_session=s"));
    }

    #[test]
    fn test_foreign_domain_is_rejected() {
        let mut jar = CookieJar::new();
        let evil = Url::parse("http://evil.test/").unwrap();
        let app = Url::parse("http://localhost/").unwrap();

        jar.add_from_response(&evil, "XSRF-TOKEN=x; Domain=localhost; Path=/");
        assert!(jar.is_empty());
        assert_eq!(jar.document_cookie(&app), "");

        // A parent domain of the responding host is accepted
        let api = Url::parse("http://api.example.com/").unwrap();
        jar.add_from_response(&api, "a=1; Domain=example.com; Path=/");
        assert!(jar.get(&Url::parse("http://www.example.com/").unwrap(), "a").is_some());
    }

    #[test]
    fn test_same_name_on_different_paths() {
        let mut jar = CookieJar::new();
        let url = Url::parse("http://localhost/api/user").unwrap();

        jar.add_from_response(&url, "XSRF-TOKEN=root; Path=/");
        jar.add_from_response(&url, "XSRF-TOKEN=api; Path=/api");
        assert_eq!(jar.len(), 2);

        // Expiring the root cookie leaves the /api one in place
        jar.add_from_response(&url, "XSRF-TOKEN=; Max-Age=0; path=/; domain=localhost");
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get(&url, "XSRF-TOKEN").map(|c| c.value.as_str()), Some("api"));
        assert!(jar.get(&Url::parse("http://localhost/").unwrap(), "XSRF-TOKEN").is_none());
    }

    #[test]
    fn test_expired_cookies_are_purged() {
        let mut jar = CookieJar::new();
        let url = Url::parse("http://localhost/").unwrap();

        jar.add_from_response(&url, "old=1; Max-Age=60; Path=/");
        for cookie in jar.cookies.values_mut().flat_map(|c| c.values_mut()) {
            cookie.created -= 120;
        }
        assert_eq!(jar.len(), 1);
        assert!(jar.get_cookies(&url).is_empty());

        jar.add_from_response(&url, "new=2; Path=/");
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get_cookie_header(&url), "new=2");
    }
}
