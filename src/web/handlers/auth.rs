use axum::{extract::{Query, State}, response::{IntoResponse, Response}};
use tower_cookies::Cookies;

use crate::app::AppState;
use crate::auth::flow::{self, AuthCallbackQuery};
use crate::auth::provider::{Provider, UserInfo};
use crate::error::{AppError, CallbackError};
use crate::web::found;

pub async fn start_google(State(state): State<AppState>, cookies: Cookies) -> Result<Response, AppError> {
    let url = flow::begin_login(&state, &cookies, Provider::Google).await?;
    Ok(found(url.as_str()))
}

pub async fn start_linkedin(State(state): State<AppState>, cookies: Cookies) -> Result<Response, AppError> {
    let url = flow::begin_login(&state, &cookies, Provider::LinkedIn).await?;
    Ok(found(url.as_str()))
}

pub async fn callback(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(q): Query<AuthCallbackQuery>,
) -> Result<Response, AppError> {
    if state.managed.is_none() {
        return Err(AppError::NotReady("OIDC client not initialized"));
    }
    let result = flow::complete_managed_login(&state, &cookies, q).await;
    Ok(finish(Provider::Google, result))
}

pub async fn linkedin_callback(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(q): Query<AuthCallbackQuery>,
) -> Response {
    let result = flow::complete_linkedin_login(&state, &cookies, q).await;
    finish(Provider::LinkedIn, result)
}

fn finish(provider: Provider, result: Result<UserInfo, CallbackError>) -> Response {
    match result {
        Ok(_) => found("/dashboard"),
        Err(e) => {
            tracing::warn!(%provider, error = %e, "callback failed");
            found(&format!("/login?error={}", provider.failure_tag()))
        }
    }
}

pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    match flow::logout(&state, &cookies).await {
        Ok(target) => found(&target),
        Err(e) => {
            tracing::error!(error = %e, "logout failed");
            e.into_response()
        }
    }
}
