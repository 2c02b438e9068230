//! Session state: the cookie jar and local storage a page sees.
//!
//! The client never touches global browser state directly. Everything goes
//! through a [`SessionStore`], so tests can hand in an in-memory fake.

use crate::cookies::CookieJar;
use parking_lot::RwLock;
use url::Url;
use web_storage::{LocalStorage, Storage};

/// Name of the CSRF cookie set by `/sanctum/csrf-cookie`.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Local storage key holding the cached user info.
pub const USER_INFO_KEY: &str = "userInfo";

/// Cookie and local-storage access for one page.
pub trait SessionStore: Send + Sync {
    /// The `document.cookie` string: `k=v; k2=v2`.
    fn cookie_string(&self) -> String;

    /// Assign to `document.cookie`.
    fn set_cookie(&self, cookie: &str);

    /// Remove a local storage entry.
    fn remove_local_item(&self, key: &str);

    /// Hostname of the current page.
    fn hostname(&self) -> String;

    /// The Cookie header to send to `url`. Only cookies scoped to `url`
    /// belong here: the transport reads the `X-XSRF-TOKEN` value from it.
    fn cookie_header(&self, _url: &Url) -> String {
        self.cookie_string()
    }

    /// Record a Set-Cookie header received from `url`.
    fn store_response_cookie(&self, _url: &Url, set_cookie: &str) {
        self.set_cookie(set_cookie);
    }
}

/// Whether the session holds a cookie named exactly `XSRF-TOKEN`.
pub fn csrf_cookie_exists(store: &dyn SessionStore) -> bool {
    let prefix = format!("{}=", XSRF_COOKIE);
    store
        .cookie_string()
        .split(';')
        .any(|item| item.trim().starts_with(&prefix))
}

/// The URL-decoded `XSRF-TOKEN` value the page can read, if set.
pub fn xsrf_token(store: &dyn SessionStore) -> Option<String> {
    xsrf_token_in(&store.cookie_string())
}

/// The URL-decoded `XSRF-TOKEN` value in a `k=v; k2=v2` cookie string.
pub fn xsrf_token_in(cookies: &str) -> Option<String> {
    let raw = cookies
        .split(';')
        .filter_map(|item| item.trim().split_once('='))
        .find(|(name, _)| *name == XSRF_COOKIE)
        .map(|(_, value)| value)?;

    if raw.is_empty() {
        return None;
    }

    Some(
        urlencoding::decode(raw)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| raw.to_string()),
    )
}

/// Log out locally: drop the cached user info and expire the CSRF cookie.
pub fn clear_session(store: &dyn SessionStore) {
    store.remove_local_item(USER_INFO_KEY);
    store.set_cookie(&format!(
        "{}=; Max-Age=0; path=/; domain={}",
        XSRF_COOKIE,
        store.hostname()
    ));
    tracing::debug!("Session cleared for {}", store.hostname());
}

/// Browser-style session: a cookie jar plus the page origin's local storage.
pub struct BrowserSession {
    page_url: Url,
    cookies: RwLock<CookieJar>,
    local_storage: LocalStorage,
}

impl BrowserSession {
    /// Create an empty session for a page URL.
    pub fn new(page_url: Url) -> Self {
        let storage = LocalStorage::new(page_url.origin().ascii_serialization());
        Self::with_local_storage(page_url, storage)
    }

    /// Create a session sharing an existing local storage.
    pub fn with_local_storage(page_url: Url, local_storage: LocalStorage) -> Self {
        Self {
            page_url,
            cookies: RwLock::new(CookieJar::new()),
            local_storage,
        }
    }

    /// The page URL cookies are read for.
    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    /// A handle to the page's local storage.
    pub fn local_storage(&self) -> LocalStorage {
        self.local_storage.clone()
    }
}

impl SessionStore for BrowserSession {
    fn cookie_string(&self) -> String {
        self.cookies.read().document_cookie(&self.page_url)
    }

    fn set_cookie(&self, cookie: &str) {
        self.cookies.write().add_from_response(&self.page_url, cookie);
    }

    fn remove_local_item(&self, key: &str) {
        // Clones share storage
        let mut storage = self.local_storage.clone();
        storage.remove_item(key);
    }

    fn hostname(&self) -> String {
        self.page_url.host_str().unwrap_or_default().to_string()
    }

    fn cookie_header(&self, url: &Url) -> String {
        self.cookies.read().get_cookie_header(url)
    }

    fn store_response_cookie(&self, url: &Url, set_cookie: &str) {
        self.cookies.write().add_from_response(url, set_cookie);
    }
}
