//! KF2 WebAdmin console access
//!
//! [`AdminConsole`] is the set of operations the fleet controller needs from a
//! server's admin console. [`HttpConsole`] talks to the real WebAdmin over
//! HTTP and scrapes its pages with the patterns in [`scrape`].

pub mod http;
#[cfg(test)]
pub(crate) mod mock;
pub mod scrape;

pub use http::HttpConsole;

use url::Url;

use crate::config::GameMode;

// WebAdmin paths, relative to a server's root URL
pub const LOGIN_PAGE: &str = "/ServerAdmin/";
pub const INFO_PAGE: &str = "/ServerAdmin/current/info";
pub const GAMESUMMARY_PAGE: &str = "/ServerAdmin/current+gamesummary";
pub const CHANGE_PAGE: &str = "/ServerAdmin/current/change";
pub const CONSOLE_PAGE: &str = "/ServerAdmin/console";

/// Cookie set by WebAdmin on a successful login.
pub const AUTH_COOKIE: &str = "authcred";

/// Error types for console operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Could not find {what} in response from {url}")]
    Parse { url: String, what: &'static str },

    #[error("No login token on {url}")]
    MissingToken { url: String },

    #[error("Login rejected by {url}: no {AUTH_COOKIE} cookie received")]
    AuthRejected { url: String },
}

impl ConsoleError {
    /// Errors that mean the console no longer looks like WebAdmin at all.
    ///
    /// These abort the run instead of counting towards the unreachable
    /// threshold.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConsoleError::MissingToken { .. })
    }
}

/// Operations on one server's admin console, addressed by its root URL.
///
/// Implementations keep one session per root URL: whatever `login`
/// establishes is reused by every later call for that server. No call retries.
#[allow(async_fn_in_trait)]
pub trait AdminConsole {
    /// `true` if the status page no longer shows the login form.
    async fn probe_session(&mut self, root: &Url) -> Result<bool, ConsoleError>;

    async fn login(&mut self, root: &Url, username: &str, password: &str)
        -> Result<(), ConsoleError>;

    async fn player_count(&mut self, root: &Url) -> Result<u32, ConsoleError>;

    async fn current_map(&mut self, root: &Url) -> Result<String, ConsoleError>;

    async fn change_map(
        &mut self,
        root: &Url,
        game_mode: GameMode,
        config_subfolder: &str,
        map: &str,
    ) -> Result<(), ConsoleError>;

    /// Ask the server process to exit.
    async fn shutdown(&mut self, root: &Url) -> Result<(), ConsoleError>;
}
