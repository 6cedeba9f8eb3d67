use std::time::Duration;

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope, TokenUrl};
use serde::Deserialize;
use url::Url;

use crate::auth::provider::{Provider, UserInfo};
use crate::auth::session::PendingAuth;
use crate::config::LinkedInCfg;
use crate::error::CallbackError;

/// LinkedIn sign-in without discovery: fixed endpoints, a form-encoded token
/// request and a bearer user-info call.
pub struct LinkedInClient {
    oauth: BasicClient,
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
    token_url: String,
    userinfo_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LinkedInProfile {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
    email_verified: Option<bool>,
}

impl From<LinkedInProfile> for UserInfo {
    fn from(p: LinkedInProfile) -> Self {
        UserInfo {
            subject: p.sub,
            email: p.email,
            name: p.name,
            given_name: p.given_name,
            family_name: p.family_name,
            picture: p.picture,
            // absent claim means unverified
            email_verified: p.email_verified.unwrap_or(false),
            provider: Provider::LinkedIn.as_str().to_string(),
        }
    }
}

impl LinkedInClient {
    pub fn new(cfg: &LinkedInCfg) -> anyhow::Result<Self> {
        let oauth = BasicClient::new(
            ClientId::new(cfg.client_id.clone()),
            Some(ClientSecret::new(cfg.client_secret.clone())),
            AuthUrl::new(cfg.auth_url.clone())?,
            Some(TokenUrl::new(cfg.token_url.clone())?),
        )
        .set_redirect_uri(RedirectUrl::new(cfg.callback_url.clone())?);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Self {
            oauth,
            http,
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            callback_url: cfg.callback_url.clone(),
            token_url: cfg.token_url.clone(),
            userinfo_url: cfg.userinfo_url.clone(),
        })
    }

    pub fn authorization_url(&self, pending: &PendingAuth) -> Url {
        let state = pending.state.clone();
        let (url, _) = self
            .oauth
            .authorize_url(move || CsrfToken::new(state))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_extra_param("nonce", pending.nonce.clone())
            .url();
        url
    }

    pub async fn complete(&self, code: &str) -> Result<UserInfo, CallbackError> {
        let access_token = self.exchange_code(code).await?;
        self.fetch_user_info(&access_token).await
    }

    async fn exchange_code(&self, code: &str) -> Result<String, CallbackError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.callback_url.as_str()),
        ];
        let body: TokenBody = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CallbackError::TokenExchange(e.to_string()))?
            .json()
            .await
            .map_err(|e| CallbackError::TokenExchange(e.to_string()))?;
        Ok(body.access_token)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, CallbackError> {
        let profile: LinkedInProfile = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CallbackError::UserInfo(e.to_string()))?
            .json()
            .await
            .map_err(|e| CallbackError::UserInfo(e.to_string()))?;
        Ok(profile.into())
    }
}
