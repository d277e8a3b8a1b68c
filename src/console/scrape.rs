//! Pattern extraction from WebAdmin pages
//!
//! Only the few fragments the controller depends on are matched; anything
//! else in the markup is ignored. Each pattern is compiled once.

use regex::Regex;
use std::sync::OnceLock;

/// Present on any WebAdmin page served to an unauthenticated client.
pub const LOGIN_FORM_MARKER: &str = r#"<form id="loginform""#;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
static PLAYERS_RE: OnceLock<Regex> = OnceLock::new();
static MAP_SELECT_RE: OnceLock<Regex> = OnceLock::new();
static SELECTED_OPTION_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| {
        Regex::new(r#"name="token"\s+value="([^"]*)""#).expect("token pattern is valid")
    })
}

fn players_re() -> &'static Regex {
    PLAYERS_RE.get_or_init(|| {
        Regex::new(r#"class="gs_players">\s*(\d+)\s*/"#).expect("players pattern is valid")
    })
}

fn map_select_re() -> &'static Regex {
    MAP_SELECT_RE.get_or_init(|| {
        Regex::new(r#"(?s)<select id="map"[^>]*>(.*?)</select>"#)
            .expect("map select pattern is valid")
    })
}

fn selected_option_re() -> &'static Regex {
    SELECTED_OPTION_RE.get_or_init(|| {
        Regex::new(r#"<option value="([^"]*)"[^>]*\bselected\b"#)
            .expect("selected option pattern is valid")
    })
}

/// `true` when the page carries the login form.
pub fn has_login_form(body: &str) -> bool {
    body.contains(LOGIN_FORM_MARKER)
}

/// The single-use anti-forgery token from the login form.
pub fn login_token(body: &str) -> Option<&str> {
    token_re()
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|t| !t.is_empty())
}

/// Connected players from the game summary fragment (`<dd class="gs_players">2/6</dd>`).
pub fn player_count(body: &str) -> Option<u32> {
    players_re()
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Value of the selected option inside `<select id="map">`.
pub fn current_map(body: &str) -> Option<&str> {
    let select = map_select_re().captures(body)?.get(1)?.as_str();
    selected_option_re()
        .captures(select)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|m| !m.is_empty())
}
