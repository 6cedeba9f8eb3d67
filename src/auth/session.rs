use std::collections::HashMap;

use base64::Engine as _;
use openidconnect::{CsrfToken, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tower_cookies::{Cookie, Cookies};

use crate::app::AppState;
use crate::auth::provider::{Provider, UserInfo};
use crate::auth::store::SessionEdit;

pub const SESSION_COOKIE: &str = "sid";
pub const SESSION_TTL: Duration = Duration::hours(24);
/// How long a login started with `begin_login` may wait for its callback.
pub const PENDING_TTL: Duration = Duration::minutes(10);

/// Replay-protection values for one in-flight login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuth {
    pub nonce: String,
    pub state: String,
    pub created_at: i64, // unix seconds
}

impl PendingAuth {
    /// 16 random bytes each, base64url encoded.
    pub fn generate() -> Self {
        Self {
            nonce: Nonce::new_random().secret().to_string(),
            state: CsrfToken::new_random().secret().to_string(),
            created_at: OffsetDateTime::now_utc().unix_timestamp(),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now - self.created_at > PENDING_TTL.whole_seconds()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user_info: Option<UserInfo>,
    pub pending: HashMap<Provider, PendingAuth>,
    pub expires_at: i64, // unix seconds
}

impl SessionData {
    pub fn new() -> Self {
        let mut data = Self {
            user_info: None,
            pending: HashMap::new(),
            expires_at: 0,
        };
        data.renew();
        data
    }

    /// Restarts the session lifetime from now.
    pub fn renew(&mut self) {
        self.expires_at = (OffsetDateTime::now_utc() + SESSION_TTL).unix_timestamp();
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new()
    }
}

/// Id carried by the request's private `sid` cookie, if any.
pub fn session_id(state: &AppState, cookies: &Cookies) -> Option<String> {
    cookies
        .private(&state.cookie_key)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn load_session(state: &AppState, cookies: &Cookies) -> anyhow::Result<Option<SessionData>> {
    let Some(id) = session_id(state, cookies) else {
        return Ok(None);
    };
    state.sessions.load(&id).await
}

/// Applies `edit` to the current session, starting a new one (and issuing
/// its cookie) when the request carries no live session.
pub async fn update_or_create(state: &AppState, cookies: &Cookies, edit: SessionEdit<'_>) -> anyhow::Result<()> {
    let mut live = session_id(state, cookies);
    if let Some(id) = &live {
        if state.sessions.load(id).await?.is_none() {
            live = None;
        }
    }
    match live {
        Some(id) => {
            state.sessions.update(&id, true, edit).await?;
        }
        None => {
            let id = new_session_id();
            state.sessions.update(&id, true, edit).await?;
            set_session_cookie(state, cookies, &id);
        }
    }
    Ok(())
}

/// Applies `edit` to the current session only if it exists.
pub async fn update_current(state: &AppState, cookies: &Cookies, edit: SessionEdit<'_>) -> anyhow::Result<bool> {
    match session_id(state, cookies) {
        Some(id) => state.sessions.update(&id, false, edit).await,
        None => Ok(false),
    }
}

/// Moves the current session to a fresh id, applying `edit`, and reissues
/// the cookie. Returns `false` when the request has no live session.
pub async fn rotate_session(state: &AppState, cookies: &Cookies, edit: SessionEdit<'_>) -> anyhow::Result<bool> {
    let Some(old_id) = session_id(state, cookies) else {
        return Ok(false);
    };
    let new_id = new_session_id();
    if !state.sessions.rotate(&old_id, &new_id, edit).await? {
        return Ok(false);
    }
    set_session_cookie(state, cookies, &new_id);
    Ok(true)
}

/// Removes the server record and the cookie. Returns what the session held.
pub async fn destroy_session(state: &AppState, cookies: &Cookies) -> anyhow::Result<Option<SessionData>> {
    let Some(id) = session_id(state, cookies) else {
        return Ok(None);
    };
    let previous = state.sessions.load(&id).await?;
    state.sessions.destroy(&id).await?;
    clear_session_cookie(state, cookies);
    Ok(previous)
}

fn new_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn set_session_cookie(state: &AppState, cookies: &Cookies, id: &str) {
    let mut cookie = Cookie::new(SESSION_COOKIE, id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_secure(state.config.server.secure_cookies);
    cookie.set_max_age(SESSION_TTL);
    cookies.private(&state.cookie_key).add(cookie);
}

fn clear_session_cookie(state: &AppState, cookies: &Cookies) {
    let mut base = Cookie::new(SESSION_COOKIE, "");
    base.set_path("/");
    cookies.private(&state.cookie_key).remove(base);
}
