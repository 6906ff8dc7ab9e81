//! Account identity and the per-account cookie store
//!
//! An [`AccountId`] is an opaque handle minted by whatever manages logins;
//! this crate only uses it to scope cookies and credentials. The
//! [`CookieStore`] is the one piece of long-lived shared state in the
//! posting pipeline: entries are keyed by (account, origin) with a lock
//! per entry, so in-flight requests for different accounts never contend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Opaque identifier scoping cookie storage and credentials; one per
/// website login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One stored cookie. Only name and value matter for replaying a session;
/// attributes are the origin server's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse the name=value part of a `Set-Cookie` header value,
    /// discarding attributes after the first ';'.
    pub fn parse_set_cookie(header: &str) -> Option<Self> {
        let pair = header.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value.trim()))
    }
}

type CookieKey = (AccountId, String);
type CookieEntry = Arc<RwLock<Vec<Cookie>>>;

/// In-memory cookie storage keyed by (account, origin).
///
/// Writes merge by cookie name, so a fresh session token replaces the
/// stale one without dropping unrelated cookies. Durable persistence is
/// the account subsystem's job; this store lives for the process.
#[derive(Default)]
pub struct CookieStore {
    entries: RwLock<HashMap<CookieKey, CookieEntry>>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, account: &AccountId, origin: &str) -> Option<CookieEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&(account.clone(), origin.to_string()))
            .cloned()
    }

    fn entry_or_insert(&self, account: &AccountId, origin: &str) -> CookieEntry {
        if let Some(entry) = self.entry(account, origin) {
            return entry;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries
            .entry((account.clone(), origin.to_string()))
            .or_default()
            .clone()
    }

    /// All cookies owned by `account` for `origin`.
    pub fn get(&self, account: &AccountId, origin: &str) -> Vec<Cookie> {
        match self.entry(account, origin) {
            Some(entry) => entry.read().unwrap_or_else(|e| e.into_inner()).clone(),
            None => Vec::new(),
        }
    }

    /// Serialize an account's cookies for `origin` into a `Cookie` header
    /// value: `name=value` pairs joined by `"; "`.
    pub fn header_value(&self, account: &AccountId, origin: &str) -> String {
        self.get(account, origin)
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Merge `cookies` into the account's entry for `origin`, replacing
    /// same-named cookies and appending new ones.
    pub fn store(&self, account: &AccountId, origin: &str, cookies: &[Cookie]) {
        if cookies.is_empty() {
            return;
        }
        let entry = self.entry_or_insert(account, origin);
        let mut stored = entry.write().unwrap_or_else(|e| e.into_inner());
        for cookie in cookies {
            match stored.iter_mut().find(|c| c.name == cookie.name) {
                Some(existing) => existing.value = cookie.value.clone(),
                None => stored.push(cookie.clone()),
            }
        }
    }

    /// Import cookies from a `Cookie`-header-shaped string
    /// (`name=value; name2=value2`), e.g. captured from a browser.
    pub fn import(&self, account: &AccountId, origin: &str, header: &str) {
        let cookies: Vec<Cookie> = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                if name.trim().is_empty() {
                    return None;
                }
                Some(Cookie::new(name.trim(), value.trim()))
            })
            .collect();
        self.store(account, origin, &cookies);
    }

    /// Drop every origin's cookies for an account (logout/credential
    /// expiry).
    pub fn clear(&self, account: &AccountId) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(owner, _), _| owner != account);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_cookie_strips_attributes() {
        let cookie =
            Cookie::parse_set_cookie("session=abc123; Path=/; HttpOnly; Secure").unwrap();
        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
    }

    #[test]
    fn test_parse_set_cookie_rejects_garbage() {
        assert!(Cookie::parse_set_cookie("no-equals-here").is_none());
        assert!(Cookie::parse_set_cookie("=orphan-value").is_none());
    }

    #[test]
    fn test_header_value_joins_with_semicolon_space() {
        let store = CookieStore::new();
        let account = AccountId::from("acct-1");
        store.store(
            &account,
            "https://derpibooru.org",
            &[Cookie::new("a", "1"), Cookie::new("b", "2")],
        );

        assert_eq!(
            store.header_value(&account, "https://derpibooru.org"),
            "a=1; b=2"
        );
    }

    #[test]
    fn test_header_value_empty_when_unknown() {
        let store = CookieStore::new();
        let account = AccountId::from("acct-1");
        assert_eq!(store.header_value(&account, "https://example.com"), "");
    }

    #[test]
    fn test_store_merges_by_name() {
        let store = CookieStore::new();
        let account = AccountId::from("acct-1");
        let origin = "https://example.com";

        store.store(&account, origin, &[Cookie::new("session", "old")]);
        store.store(
            &account,
            origin,
            &[Cookie::new("session", "new"), Cookie::new("csrf", "x")],
        );

        let cookies = store.get(&account, origin);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0], Cookie::new("session", "new"));
        assert_eq!(cookies[1], Cookie::new("csrf", "x"));
    }

    #[test]
    fn test_accounts_and_origins_are_isolated() {
        let store = CookieStore::new();
        let alice = AccountId::from("alice");
        let bob = AccountId::from("bob");

        store.store(&alice, "https://a.example", &[Cookie::new("s", "1")]);
        store.store(&bob, "https://a.example", &[Cookie::new("s", "2")]);
        store.store(&alice, "https://b.example", &[Cookie::new("s", "3")]);

        assert_eq!(store.header_value(&alice, "https://a.example"), "s=1");
        assert_eq!(store.header_value(&bob, "https://a.example"), "s=2");
        assert_eq!(store.header_value(&alice, "https://b.example"), "s=3");
    }

    #[test]
    fn test_import_header_string() {
        let store = CookieStore::new();
        let account = AccountId::from("acct-1");
        store.import(&account, "https://example.com", "a=1; b=2;   c=3");

        assert_eq!(store.header_value(&account, "https://example.com"), "a=1; b=2; c=3");
    }

    #[test]
    fn test_clear_drops_all_origins_for_account() {
        let store = CookieStore::new();
        let alice = AccountId::from("alice");
        let bob = AccountId::from("bob");

        store.store(&alice, "https://a.example", &[Cookie::new("s", "1")]);
        store.store(&alice, "https://b.example", &[Cookie::new("s", "2")]);
        store.store(&bob, "https://a.example", &[Cookie::new("s", "3")]);

        store.clear(&alice);

        assert!(store.get(&alice, "https://a.example").is_empty());
        assert!(store.get(&alice, "https://b.example").is_empty());
        assert_eq!(store.header_value(&bob, "https://a.example"), "s=3");
    }

    #[test]
    fn test_concurrent_reads_of_one_key() {
        let store = Arc::new(CookieStore::new());
        let account = AccountId::from("shared");
        store.store(&account, "https://example.com", &[Cookie::new("s", "1")]);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let account = account.clone();
            handles.push(std::thread::spawn(move || {
                store.header_value(&account, "https://example.com")
            }));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "s=1");
        }
    }
}
