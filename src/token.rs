//! CSRF token handling.
//!
//! The token lives in two places: a process-wide single-slot store owned by the client,
//! and the `csrf_access_token` cookie the server mirrors it into. Resolution is
//! store-first with the cookie as fallback. Writes are last-writer-wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Single-slot CSRF token store shared by every clone.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    slot: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self) -> Option<String> { self.slot.read().clone() }

    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        if token.is_empty() { return; }
        *self.slot.write() = Some(token);
    }

    /// Stores `token` when present; an absent token never clears what is already held.
    pub fn store_if_present(&self, token: Option<&str>) -> bool {
        match token {
            Some(t) if !t.is_empty() => { self.set(t); true }
            _ => false,
        }
    }

    pub fn clear(&self) { *self.slot.write() = None; }

    /// Store-first, cookie-fallback token resolution.
    pub fn resolve(&self, cookies: &dyn CookieSource, cookie_name: &str) -> Option<String> {
        self.get().or_else(|| cookies.cookie_header().and_then(|h| token_from_cookie_header(&h, cookie_name)))
    }
}

/// Read/expire access to the cookies the client currently holds for the backend origin.
pub trait CookieSource: Send + Sync {
    /// Cookie header as it would be sent: `a=1; b=2`.
    fn cookie_header(&self) -> Option<String>;
    /// Drops the named cookie client-side.
    fn expire(&self, name: &str);
}

/// Extracts a cookie value from a `Cookie` header string. Empty values count as absent.
pub fn token_from_cookie_header(header: &str, name: &str) -> Option<String> {
    for part in header.split(';') {
        let p = part.trim();
        if let Some((k, v)) = p.split_once('=') {
            if k.trim() == name {
                let v = v.trim().trim_matches('"');
                if v.is_empty() { return None; }
                return Some(v.to_string());
            }
        }
    }
    None
}

/// In-memory cookie source for contexts without a live HTTP cookie jar.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookies {
    inner: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryCookies {
    pub fn new() -> Self { Self::default() }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.lock().insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<String> { self.inner.lock().get(name).cloned() }
}

impl CookieSource for MemoryCookies {
    fn cookie_header(&self) -> Option<String> {
        let map = self.inner.lock();
        if map.is_empty() { return None; }
        Some(map.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("; "))
    }

    fn expire(&self, name: &str) { self.inner.lock().remove(name); }
}
