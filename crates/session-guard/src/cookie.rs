//! Read-only access to the session cookie store.

use reqwest::cookie::CookieStore;
use std::sync::Arc;
use url::Url;

/// Reads named cookie values visible to the backend URL.
///
/// The store is written only by the server (`Set-Cookie`), so every read
/// reflects the latest rotation. Values are never cached here.
#[derive(Clone)]
pub struct CookieAccessor {
    store: Arc<dyn CookieStore>,
    url: Url,
}

impl CookieAccessor {
    pub fn new(store: Arc<dyn CookieStore>, url: Url) -> Self {
        Self { store, url }
    }

    /// Current value of the named cookie. Empty values count as absent.
    pub fn read(&self, name: &str) -> Option<String> {
        let header = self.store.cookies(&self.url)?;
        let raw = header.to_str().ok()?;
        find_cookie(raw, name)
    }
}

/// Find a cookie value in a `Cookie:` header string (`a=1; b=2`).
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
