use std::sync::Arc;

use axum::response::Html;
use handlebars::Handlebars;
use serde::Serialize;

use crate::error::AppError;

const LAYOUT: &str = include_str!("../../views/layout.hbs");
const TEMPLATES: [(&str, &str); 3] = [
    ("home", include_str!("../../views/home.hbs")),
    ("login", include_str!("../../views/login.hbs")),
    ("dashboard", include_str!("../../views/dashboard.hbs")),
];

/// Compiled page templates, shared across requests.
#[derive(Clone)]
pub struct Views {
    registry: Arc<Handlebars<'static>>,
}

impl Views {
    pub fn new() -> anyhow::Result<Self> {
        let mut hb = Handlebars::new();
        hb.register_partial("layout", LAYOUT)?;
        for (name, source) in TEMPLATES {
            hb.register_template_string(name, source)?;
        }
        Ok(Self { registry: Arc::new(hb) })
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<Html<String>, AppError> {
        self.registry
            .render(name, data)
            .map(Html)
            .map_err(|e| AppError::Render(e.to_string()))
    }
}

/// Human text for the `?error=` tags the auth routes emit.
pub fn login_error_message(tag: &str) -> String {
    match tag {
        "auth_failed" => "Sign-in with Google failed. Please try again.".to_string(),
        "linkedin_auth_failed" => "Sign-in with LinkedIn failed. Please try again.".to_string(),
        other => format!("Sign-in failed ({other})."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn templates_compile_and_escape() {
        let views = Views::new().unwrap();
        let Html(body) = views
            .render("login", &json!({ "error": "<script>", "linkedin": true }))
            .unwrap();
        assert!(body.contains("&lt;script&gt;"));
        assert!(body.contains("/auth/linkedin"));
    }

    #[test]
    fn known_tags_have_messages() {
        assert!(login_error_message("auth_failed").contains("Google"));
        assert!(login_error_message("linkedin_auth_failed").contains("LinkedIn"));
        assert_eq!(login_error_message("x"), "Sign-in failed (x).");
    }
}
