use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_cookies::Cookies;

use crate::app::AppState;
use crate::auth::{flow, provider::Provider, session::{self, SessionData}};
use crate::error::AppError;
use crate::web::session::ApiUser;

pub async fn user(ApiUser(user): ApiUser) -> Json<Value> {
    Json(json!({ "user": user }))
}

/// Authorization URLs for every available provider, each backed by its own
/// pending entry in the session.
pub async fn auth_urls(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<BTreeMap<&'static str, String>>, AppError> {
    let mut urls = BTreeMap::new();
    let mut entries = Vec::new();
    for provider in Provider::ALL {
        if provider == Provider::LinkedIn && state.linkedin.is_none() {
            continue;
        }
        let (url, pending) = flow::prepare_login(&state, provider)?;
        urls.insert(provider.as_str(), url.to_string());
        entries.push((provider, pending));
    }
    session::update_or_create(
        &state,
        &cookies,
        Box::new(move |data: &mut SessionData| data.pending.extend(entries)),
    )
    .await?;
    Ok(Json(urls))
}

pub async fn health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "status": "OK",
        "timestamp": timestamp,
        "endpoints": {
            "home": "GET /",
            "login": "GET /login",
            "dashboard": "GET /dashboard",
            "api_user": "GET /api/user",
            "api_urls": "GET /api/auth/urls",
            "health": "GET /health",
        },
    }))
}
