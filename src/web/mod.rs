use axum::http::{header::LOCATION, StatusCode};
use axum::response::{IntoResponse, Response};

pub mod handlers;
pub mod session;
pub mod views;

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}
