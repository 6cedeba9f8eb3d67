use axum::{extract::{Query, State}, response::Html};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::error::AppError;
use crate::web::session::{CurrentUser, RequireUser};
use crate::web::views::login_error_message;

pub async fn home(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Html<String>, AppError> {
    state.views.render("home", &json!({
        "authenticated": user.is_some(),
        "displayName": user.as_ref().map(|u| u.display_name()),
        "user": user,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}

pub async fn login(State(state): State<AppState>, Query(q): Query<LoginQuery>) -> Result<Html<String>, AppError> {
    state.views.render("login", &json!({
        "error": q.error.as_deref().map(login_error_message),
        "linkedin": state.linkedin.is_some(),
    }))
}

pub async fn dashboard(State(state): State<AppState>, RequireUser(user): RequireUser) -> Result<Html<String>, AppError> {
    state.views.render("dashboard", &json!({ "user": user }))
}
