#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::{Body, to_bytes}, http::{header, Request, Response}, Router};
use base64::Engine;
use cognito_social::{
    app::{build_router, AppState},
    auth::{
        cognito::IdentityProvider,
        provider::{Provider, UserInfo},
        session::{PendingAuth, SessionData},
        store::{MemorySessionStore, SessionEdit, SessionStore},
    },
    config::{AppConfig, CognitoCfg, LinkedInCfg, ServerCfg},
    error::CallbackError,
};
use rand::RngCore;
use tower::ServiceExt;
use tower_cookies::cookie::{Cookie, CookieJar};

pub const GOOD_CODE: &str = "valid-fake-code";
pub const FAKE_AUTHORIZE: &str = "https://idp.example.com/oauth2/authorize";
pub const FAKE_LOGOUT: &str = "https://idp.example.com/logout?client_id=demo&logout_uri=http%3A%2F%2Flocalhost%3A3000";

pub fn test_config(linkedin: Option<LinkedInCfg>) -> AppConfig {
    AppConfig {
        server: ServerCfg {
            bind_addr: "127.0.0.1:0".to_string(),
            public_url: "http://localhost:3000".to_string(),
            cookie_key_base64: {
                let mut key = [0u8; 64];
                rand::rngs::OsRng.fill_bytes(&mut key);
                base64::engine::general_purpose::STANDARD.encode(key)
            },
            secure_cookies: false,
        },
        cognito: CognitoCfg {
            issuer: "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_test".to_string(),
            client_id: "demo".to_string(),
            client_secret: "demo-secret".to_string(),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            domain: None,
            logout_uri: "http://localhost:3000".to_string(),
        },
        linkedin,
    }
}

pub fn linkedin_config(base: &str) -> LinkedInCfg {
    LinkedInCfg {
        client_id: "li-client".to_string(),
        client_secret: "li-secret".to_string(),
        callback_url: "http://localhost:3000/auth/linkedin/callback".to_string(),
        auth_url: format!("{base}/oauth/v2/authorization"),
        token_url: format!("{base}/oauth/v2/accessToken"),
        userinfo_url: format!("{base}/v2/userinfo"),
        timeout_secs: 5,
    }
}

/// Stand-in for the managed user pool: accepts [`GOOD_CODE`] only.
pub struct FakeIdp;

#[async_trait]
impl IdentityProvider for FakeIdp {
    fn authorization_url(&self, provider: Provider, pending: &PendingAuth) -> anyhow::Result<url::Url> {
        let mut url = url::Url::parse(FAKE_AUTHORIZE)?;
        url.query_pairs_mut()
            .append_pair("client_id", "demo")
            .append_pair("response_type", "code")
            .append_pair("state", &pending.state)
            .append_pair("nonce", &pending.nonce);
        if let Some(hint) = provider.identity_provider_hint() {
            url.query_pairs_mut().append_pair("identity_provider", hint);
        }
        Ok(url)
    }

    async fn complete(&self, code: &str, _pending: &PendingAuth) -> Result<UserInfo, CallbackError> {
        if code != GOOD_CODE {
            return Err(CallbackError::TokenExchange("invalid_grant".into()));
        }
        Ok(UserInfo {
            subject: "google_1234".into(),
            email: Some("user@example.com".into()),
            name: Some("Test User".into()),
            given_name: Some("Test".into()),
            family_name: Some("User".into()),
            picture: None,
            email_verified: true,
            provider: "google".into(),
        })
    }

    fn logout_url(&self) -> Option<url::Url> {
        url::Url::parse(FAKE_LOGOUT).ok()
    }
}

pub fn test_state(managed: Option<Arc<dyn IdentityProvider>>, linkedin: Option<LinkedInCfg>) -> AppState {
    AppState::new(test_config(linkedin), managed).expect("app state")
}

pub fn fake_app() -> (AppState, Router) {
    let state = test_state(Some(Arc::new(FakeIdp)), None);
    (state.clone(), build_router(state))
}

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut req = Request::builder().uri(uri);
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, c);
    }
    app.clone().oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
}

pub fn location(res: &Response<Body>) -> String {
    res.headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// `sid=<value>` from the response's Set-Cookie, without attributes.
pub fn session_cookie(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("sid="))
        .map(|v| v.split(';').next().unwrap().to_string())
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    let url = url::Url::parse(url).unwrap();
    url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
}

/// Decrypts the session id out of a `sid=...` cookie.
pub fn session_id_of(state: &AppState, cookie: &str) -> Option<String> {
    let mut jar = CookieJar::new();
    jar.add_original(Cookie::parse_encoded(cookie.to_string()).unwrap());
    let id = jar.private(&state.cookie_key).get("sid")?.value().to_string();
    Some(id)
}

/// Reads the server-side record behind a `sid=...` cookie.
pub async fn stored_session(state: &AppState, cookie: &str) -> Option<SessionData> {
    let id = session_id_of(state, cookie)?;
    state.sessions.load(&id).await.unwrap()
}

/// Signs in through the fake provider and returns the cookie issued by the
/// callback.
pub async fn sign_in_google(app: &Router) -> String {
    let res = get(app, "/login/google", None).await;
    let cookie = session_cookie(&res).expect("session cookie");
    let returned_state = query_param(&location(&res), "state").unwrap();
    let res = get(app, &format!("/auth/callback?code={GOOD_CODE}&state={returned_state}"), Some(&cookie)).await;
    assert_eq!(location(&res), "/dashboard");
    session_cookie(&res).expect("rotated session cookie")
}

/// Memory store whose `destroy` always fails.
#[derive(Default)]
pub struct FailingStore {
    inner: MemorySessionStore,
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn load(&self, id: &str) -> anyhow::Result<Option<SessionData>> {
        self.inner.load(id).await
    }

    async fn update(&self, id: &str, create: bool, edit: SessionEdit<'_>) -> anyhow::Result<bool> {
        self.inner.update(id, create, edit).await
    }

    async fn rotate(&self, old_id: &str, new_id: &str, edit: SessionEdit<'_>) -> anyhow::Result<bool> {
        self.inner.rotate(old_id, new_id, edit).await
    }

    async fn destroy(&self, _id: &str) -> anyhow::Result<()> {
        anyhow::bail!("session backend unavailable")
    }

    async fn purge_expired(&self) -> anyhow::Result<usize> {
        self.inner.purge_expired().await
    }
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    let body = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn body_text(res: Response<Body>) -> String {
    let body = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
