use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failures a handler cannot turn into a redirect. All of them are 500s.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A provider client the route needs was never constructed.
    #[error("{0}")]
    NotReady(&'static str),

    /// Session store or URL construction failure.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("render error: {0}")]
    Render(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotReady(msg) => {
                tracing::error!(reason = msg, "route unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
            Self::Internal(ref e) => {
                tracing::error!(error = ?e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
            Self::Render(ref e) => {
                tracing::error!(error = %e, "view rendering failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

/// Why an authorization callback did not produce a signed-in session.
///
/// The user only ever sees an opaque tag on the login page; the variant is
/// logged server-side.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("provider returned error: {0}")]
    ProviderDenied(String),

    #[error("missing authorization code")]
    MissingCode,

    #[error("missing state parameter")]
    MissingState,

    #[error("no login in progress for this session")]
    NoPendingLogin,

    #[error("state mismatch")]
    StateMismatch,

    #[error("pending login expired")]
    PendingExpired,

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("id token rejected: {0}")]
    IdToken(String),

    #[error("user info request failed: {0}")]
    UserInfo(String),

    #[error("session store error: {0}")]
    Session(String),
}

impl From<anyhow::Error> for CallbackError {
    fn from(e: anyhow::Error) -> Self {
        Self::Session(e.to_string())
    }
}
