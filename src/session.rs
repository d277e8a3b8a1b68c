//! Per-server WebAdmin sessions
//!
//! Each server gets its own HTTP client with its own cookie jar, so the
//! `sessionid`/`authcred` cookies of one console never leak into requests to
//! another. Sessions are created on first use and live for the process
//! lifetime; whether a session is still logged in is discovered by probing
//! the console, not tracked here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{redirect, Client};
use url::Url;

/// Applies to every console request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP client and cookie jar bound to one server.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
}

impl Session {
    fn new() -> Result<Self, SessionError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            // WebAdmin answers a login with a 302; the cookie is on that response
            .redirect(redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, jar })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Sessions keyed by server root URL.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Session for `root`, created on first use.
    pub fn session(&mut self, root: &Url) -> Result<&Session, SessionError> {
        let key = root.origin().ascii_serialization();
        if !self.sessions.contains_key(&key) {
            tracing::debug!("[session] [create] root={}", key);
            let session = Session::new()?;
            self.sessions.insert(key.clone(), session);
        }
        // Inserted above if it was missing
        Ok(&self.sessions[&key])
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    fn root(port: u16) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap()
    }

    /// The `Cookie` header the session would send to `url`.
    fn cookie_header(session: &Session, url: &Url) -> Option<String> {
        session
            .jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    #[test]
    fn test_session_created_once_per_server() {
        let mut store = SessionStore::new();
        assert!(store.is_empty());

        store.session(&root(8000)).unwrap();
        store.session(&root(8000)).unwrap();
        assert_eq!(store.len(), 1);

        store.session(&root(8001)).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_cookies_are_isolated_per_server() {
        let mut store = SessionStore::new();
        let a = root(8000);
        let b = root(8001);

        let session_a = store.session(&a).unwrap().clone();
        session_a
            .jar
            .add_cookie_str("authcred=abc123; Path=/", &a);

        assert_eq!(cookie_header(&session_a, &a).as_deref(), Some("authcred=abc123"));

        // Same host, different port: cookies are not shared between servers
        let session_b = store.session(&b).unwrap();
        assert_eq!(cookie_header(session_b, &b), None);
    }

    #[test]
    fn test_session_reused_keeps_cookies() {
        let mut store = SessionStore::new();
        let a = root(8000);

        store
            .session(&a)
            .unwrap()
            .jar
            .add_cookie_str("authcred=abc123; Path=/", &a);

        let again = store.session(&a).unwrap();
        assert!(cookie_header(again, &a).is_some_and(|h| h.contains("authcred=abc123")));
    }
}
