//! Login orchestration shared by both sign-in paths.
//!
//! Session lifecycle: anonymous, then pending (one entry per provider), then
//! authenticated or back to anonymous on a failed callback. Only a callback
//! whose `state` matches the pending entry of the same session sets
//! `user_info`; logout removes the whole record.

use time::OffsetDateTime;
use tower_cookies::Cookies;
use url::Url;

use crate::app::AppState;
use crate::auth::provider::{Provider, UserInfo};
use crate::auth::session::{self, PendingAuth, SessionData};
use crate::error::{AppError, CallbackError};

/// Query string of an authorization callback.
#[derive(Debug, Default, serde::Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Generates fresh pending values for `provider` and the authorization URL
/// embedding them. Nothing is stored yet.
pub fn prepare_login(state: &AppState, provider: Provider) -> Result<(Url, PendingAuth), AppError> {
    let pending = PendingAuth::generate();
    let url = match provider {
        Provider::Google => state
            .managed
            .as_ref()
            .ok_or(AppError::NotReady("OIDC client not initialized"))?
            .authorization_url(provider, &pending)?,
        Provider::LinkedIn => state
            .linkedin
            .as_ref()
            .ok_or(AppError::NotReady("LinkedIn client not configured"))?
            .authorization_url(&pending),
    };
    Ok((url, pending))
}

/// Starts a login: records the provider's pending entry in the session,
/// replacing a stale one, and returns the URL to redirect the browser to.
pub async fn begin_login(state: &AppState, cookies: &Cookies, provider: Provider) -> Result<Url, AppError> {
    let (url, pending) = prepare_login(state, provider)?;
    session::update_or_create(
        state,
        cookies,
        Box::new(move |data: &mut SessionData| {
            data.pending.insert(provider, pending);
        }),
    )
    .await?;
    tracing::debug!(%provider, "login started");
    Ok(url)
}

/// Managed-provider callback: validates state, lets the OIDC client verify
/// the code and ID token, then signs the session in.
pub async fn complete_managed_login(
    state: &AppState,
    cookies: &Cookies,
    query: AuthCallbackQuery,
) -> Result<UserInfo, CallbackError> {
    let Some(idp) = state.managed.clone() else {
        return Err(CallbackError::TokenExchange("OIDC client not initialized".into()));
    };
    let (code, pending) = consume_pending(state, cookies, Provider::Google, query).await?;
    let user = idp.complete(&code, &pending).await?;
    sign_in(state, cookies, user).await
}

/// LinkedIn callback over the hand-rolled OAuth2 client.
pub async fn complete_linkedin_login(
    state: &AppState,
    cookies: &Cookies,
    query: AuthCallbackQuery,
) -> Result<UserInfo, CallbackError> {
    let Some(client) = state.linkedin.clone() else {
        return Err(CallbackError::TokenExchange("LinkedIn client not configured".into()));
    };
    let (code, _pending) = consume_pending(state, cookies, Provider::LinkedIn, query).await?;
    let user = client.complete(&code).await?;
    sign_in(state, cookies, user).await
}

/// Removes the provider's pending entry from the session (it is single use
/// whatever happens next) and checks the callback against it. Entries of
/// other providers are left alone.
async fn consume_pending(
    state: &AppState,
    cookies: &Cookies,
    provider: Provider,
    query: AuthCallbackQuery,
) -> Result<(String, PendingAuth), CallbackError> {
    if let Some(err) = query.error {
        let detail = query.error_description.unwrap_or_default();
        return Err(CallbackError::ProviderDenied(format!("{err} {detail}").trim().to_string()));
    }

    let mut taken = None;
    session::update_current(
        state,
        cookies,
        Box::new(|data: &mut SessionData| taken = data.pending.remove(&provider)),
    )
    .await?;
    let pending = taken.ok_or(CallbackError::NoPendingLogin)?;

    let code = query.code.filter(|c| !c.is_empty()).ok_or(CallbackError::MissingCode)?;
    let returned_state = query.state.ok_or(CallbackError::MissingState)?;
    if returned_state != pending.state {
        return Err(CallbackError::StateMismatch);
    }
    if pending.is_expired(OffsetDateTime::now_utc().unix_timestamp()) {
        return Err(CallbackError::PendingExpired);
    }
    Ok((code, pending))
}

/// Marks the session signed in under a new id with a fresh lifetime.
async fn sign_in(state: &AppState, cookies: &Cookies, user: UserInfo) -> Result<UserInfo, CallbackError> {
    let stored = user.clone();
    let rotated = session::rotate_session(
        state,
        cookies,
        Box::new(move |data: &mut SessionData| {
            data.user_info = Some(stored);
            data.renew();
        }),
    )
    .await?;
    if !rotated {
        return Err(CallbackError::Session("session ended before sign-in completed".into()));
    }
    tracing::info!(provider = %user.provider, email = ?user.email, "user authenticated");
    Ok(user)
}

/// Destroys the session and picks where to send the browser: the identity
/// provider's logout endpoint for managed sign-ins, home otherwise.
pub async fn logout(state: &AppState, cookies: &Cookies) -> Result<String, AppError> {
    let previous = session::destroy_session(state, cookies).await?;
    let managed_user = previous
        .and_then(|d| d.user_info)
        .and_then(|u| u.provider.parse::<Provider>().ok())
        .is_some_and(|p| p.is_managed());

    if managed_user {
        if let Some(url) = state.managed.as_ref().and_then(|idp| idp.logout_url()) {
            return Ok(url.to_string());
        }
    }
    Ok("/".to_string())
}
