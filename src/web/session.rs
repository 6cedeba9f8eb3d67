use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::future::Future;
use tower_cookies::Cookies;

use crate::app::AppState;
use crate::auth::provider::UserInfo;
use crate::auth::session;
use crate::error::AppError;
use crate::web::found;

async fn session_user(parts: &mut Parts, state: &AppState) -> Result<Option<UserInfo>, Response> {
    let cookies = Cookies::from_request_parts(parts, state).await.map_err(|e| {
        tracing::error!(error = ?e, "Failed to extract cookies");
        e.into_response()
    })?;
    let sess = session::load_session(state, &cookies)
        .await
        .map_err(|e| AppError::Internal(e).into_response())?;
    Ok(sess.and_then(|s| s.user_info))
}

/// The signed-in user, if any. Never rejects except on store failure.
pub struct CurrentUser(pub Option<UserInfo>);

/// Page gate: redirects anonymous visitors to `/login`.
///
/// ```ignore
/// async fn dashboard(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello {}", user.display_name())
/// }
/// ```
pub struct RequireUser(pub UserInfo);

/// API gate: anonymous callers get `401 {"error": "Not authenticated"}`.
pub struct ApiUser(pub UserInfo);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move { Ok(CurrentUser(session_user(parts, state).await?)) }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            match session_user(parts, state).await? {
                Some(user) => Ok(RequireUser(user)),
                None => Err(found("/login")),
            }
        }
    }
}

impl FromRequestParts<AppState> for ApiUser {
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            match session_user(parts, state).await? {
                Some(user) => Ok(ApiUser(user)),
                None => Err((
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": "Not authenticated"})),
                )
                    .into_response()),
            }
        }
    }
}
