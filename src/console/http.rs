//! WebAdmin over HTTP
//!
//! One request per operation (two for login), no retries. Responses are
//! scraped with [`super::scrape`]; markup that does not match is a
//! [`ConsoleError::Parse`].

use reqwest::{RequestBuilder, StatusCode};
use url::Url;

use super::{
    scrape, AdminConsole, ConsoleError, AUTH_COOKIE, CHANGE_PAGE, CONSOLE_PAGE,
    GAMESUMMARY_PAGE, INFO_PAGE, LOGIN_PAGE,
};
use crate::config::GameMode;
use crate::session::{Session, SessionStore};

/// A fetched page, read fully into memory.
struct Page {
    url: String,
    status: StatusCode,
    body: String,
    cookies: Vec<String>,
}

impl Page {
    /// Only `200 OK` counts; anything else is reported as an HTTP error.
    fn require_ok(self) -> Result<Self, ConsoleError> {
        if self.status == StatusCode::OK {
            Ok(self)
        } else {
            Err(self.http_error())
        }
    }

    /// Form posts may answer with a redirect, which we do not follow.
    fn require_accepted(self) -> Result<Self, ConsoleError> {
        if self.status.is_success() || self.status.is_redirection() {
            Ok(self)
        } else {
            Err(self.http_error())
        }
    }

    fn http_error(&self) -> ConsoleError {
        ConsoleError::Http {
            url: self.url.clone(),
            status: self.status.as_u16(),
        }
    }

    fn parse_error(&self, what: &'static str) -> ConsoleError {
        ConsoleError::Parse {
            url: self.url.clone(),
            what,
        }
    }
}

/// [`AdminConsole`] backed by reqwest, one cookie jar per server.
#[derive(Debug, Default)]
pub struct HttpConsole {
    sessions: SessionStore,
}

impl HttpConsole {
    pub fn new() -> Self {
        Self {
            sessions: SessionStore::new(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn session(&mut self, root: &Url) -> Result<Session, ConsoleError> {
        self.sessions
            .session(root)
            .cloned()
            .map_err(|e| ConsoleError::Network {
                url: root.to_string(),
                reason: e.to_string(),
            })
    }

    fn page_url(root: &Url, path: &str) -> Result<Url, ConsoleError> {
        root.join(path).map_err(|e| ConsoleError::Network {
            url: format!("{}{}", root, path),
            reason: e.to_string(),
        })
    }

    async fn get(&mut self, root: &Url, path: &str) -> Result<Page, ConsoleError> {
        let url = Self::page_url(root, path)?;
        let session = self.session(root)?;
        tracing::debug!("[console] [get] url={}", url);
        fetch(session.client().get(url.clone()), &url).await
    }

    async fn post(
        &mut self,
        root: &Url,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Page, ConsoleError> {
        let url = Self::page_url(root, path)?;
        let session = self.session(root)?;
        tracing::debug!("[console] [post] url={}", url);
        fetch(session.client().post(url.clone()).form(form), &url).await
    }
}

async fn fetch(request: RequestBuilder, url: &Url) -> Result<Page, ConsoleError> {
    let network_error = |e: reqwest::Error| ConsoleError::Network {
        url: url.to_string(),
        reason: e.to_string(),
    };

    let response = request.send().await.map_err(network_error)?;
    let status = response.status();
    let cookies: Vec<String> = response.cookies().map(|c| c.name().to_string()).collect();
    let body = response.text().await.map_err(network_error)?;

    tracing::trace!("[console] [response] url={} status={} bytes={}", url, status, body.len());

    Ok(Page {
        url: url.to_string(),
        status,
        body,
        cookies,
    })
}

impl AdminConsole for HttpConsole {
    async fn probe_session(&mut self, root: &Url) -> Result<bool, ConsoleError> {
        let page = self.get(root, INFO_PAGE).await?.require_ok()?;
        Ok(!scrape::has_login_form(&page.body))
    }

    async fn login(
        &mut self,
        root: &Url,
        username: &str,
        password: &str,
    ) -> Result<(), ConsoleError> {
        let login_page = self.get(root, LOGIN_PAGE).await?.require_ok()?;
        let token = scrape::login_token(&login_page.body)
            .ok_or_else(|| ConsoleError::MissingToken {
                url: login_page.url.clone(),
            })?
            .to_string();

        let form = [
            ("token", token.as_str()),
            ("password_hash", ""),
            ("username", username),
            ("password", password),
            ("remember", "-1"),
        ];
        let response = self.post(root, LOGIN_PAGE, &form).await?.require_accepted()?;

        if response.cookies.iter().any(|name| name == AUTH_COOKIE) {
            Ok(())
        } else {
            Err(ConsoleError::AuthRejected { url: response.url })
        }
    }

    async fn player_count(&mut self, root: &Url) -> Result<u32, ConsoleError> {
        let page = self
            .post(root, GAMESUMMARY_PAGE, &[("ajax", "1")])
            .await?
            .require_ok()?;
        scrape::player_count(&page.body).ok_or_else(|| page.parse_error("player count"))
    }

    async fn current_map(&mut self, root: &Url) -> Result<String, ConsoleError> {
        let page = self.get(root, CHANGE_PAGE).await?.require_ok()?;
        scrape::current_map(&page.body)
            .map(str::to_string)
            .ok_or_else(|| page.parse_error("selected map"))
    }

    async fn change_map(
        &mut self,
        root: &Url,
        game_mode: GameMode,
        config_subfolder: &str,
        map: &str,
    ) -> Result<(), ConsoleError> {
        let urlextra = format!("?ConfigSubDir={}", config_subfolder);
        let form = [
            ("gametype", game_mode.class_name()),
            ("map", map),
            ("mutatorGroupCount", "0"),
            ("urlextra", urlextra.as_str()),
            ("action", "change"),
        ];
        self.post(root, CHANGE_PAGE, &form).await?.require_accepted()?;
        Ok(())
    }

    async fn shutdown(&mut self, root: &Url) -> Result<(), ConsoleError> {
        self.post(root, CONSOLE_PAGE, &[("command", "exit")])
            .await?
            .require_accepted()?;
        Ok(())
    }
}
