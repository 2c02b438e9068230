//! HTTP header handling.

use indexmap::IndexMap;

/// HTTP header map (case-insensitive keys, order-preserving).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMap {
    headers: IndexMap<String, String>,
}

impl HeaderMap {
    /// Create a new empty header map.
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.insert(name, value.into());
    }

    /// Get a header value.
    pub fn get(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }

    /// Check if a header exists.
    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// Copy every header of `other` into this map. Values from `other` win.
    pub fn merge(&mut self, other: &HeaderMap) {
        for (name, value) in other.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
    }

    /// Get number of headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over headers.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.headers.iter()
    }

    /// Get Content-Type header.
    pub fn content_type(&self) -> Option<&String> {
        self.get(names::CONTENT_TYPE)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Header names used by the client.
pub mod names {
    pub const ACCEPT: &str = "accept";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const COOKIE: &str = "cookie";
    pub const LOCATION: &str = "location";
    pub const SET_COOKIE: &str = "set-cookie";
    pub const X_XSRF_TOKEN: &str = "x-xsrf-token";
}

/// Content type utilities.
pub mod content_type {
    pub const JSON: &str = "application/json";

    /// Check if content type is JSON.
    pub fn is_json(content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        essence == JSON || essence.ends_with("+json")
    }
}
