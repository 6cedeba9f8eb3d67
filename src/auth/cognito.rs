//! Client for the managed user pool, driven through `openidconnect`.
//!
//! Discovery happens once in [`CognitoClient::discover`]; the resulting handle
//! is immutable and shared by every request.

use async_trait::async_trait;
use openidconnect::core::{
    CoreClient, CoreIdTokenClaims, CoreIdTokenVerifier, CoreProviderMetadata, CoreResponseType,
    CoreUserInfoClaims,
};
use openidconnect::reqwest::async_http_client;
use openidconnect::{
    AuthenticationFlow, AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce,
    OAuth2TokenResponse, RedirectUrl, Scope, TokenResponse,
};
use url::Url;

use crate::auth::provider::{Provider, UserInfo};
use crate::auth::session::PendingAuth;
use crate::config::CognitoCfg;
use crate::error::CallbackError;

/// The managed identity provider as the auth flow sees it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization URL carrying `pending.state` and `pending.nonce`, with an
    /// `identity_provider` hint when the provider has one.
    fn authorization_url(&self, provider: Provider, pending: &PendingAuth) -> anyhow::Result<Url>;

    /// Exchanges `code`, validates the ID token against `pending.nonce` and
    /// fetches the user's profile.
    async fn complete(&self, code: &str, pending: &PendingAuth) -> Result<UserInfo, CallbackError>;

    /// Provider-side logout URL, when one is configured.
    fn logout_url(&self) -> Option<Url>;
}

pub struct CognitoClient {
    client: CoreClient,
    client_id: String,
    domain: Option<String>,
    logout_uri: String,
}

impl CognitoClient {
    pub async fn discover(cfg: &CognitoCfg) -> anyhow::Result<Self> {
        if cfg.client_id.is_empty() {
            anyhow::bail!("COGNITO_CLIENT_ID is not set");
        }
        tracing::info!(issuer = %cfg.issuer, "discovering OIDC issuer");
        let issuer = IssuerUrl::new(cfg.issuer.clone())?;
        let metadata = CoreProviderMetadata::discover_async(issuer, async_http_client).await?;

        let client = CoreClient::from_provider_metadata(
            metadata,
            ClientId::new(cfg.client_id.clone()),
            Some(ClientSecret::new(cfg.client_secret.clone())),
        )
        .set_redirect_uri(RedirectUrl::new(cfg.redirect_uri.clone())?);

        Ok(Self {
            client,
            client_id: cfg.client_id.clone(),
            domain: cfg.domain.clone(),
            logout_uri: cfg.logout_uri.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    fn authorization_url(&self, provider: Provider, pending: &PendingAuth) -> anyhow::Result<Url> {
        let state = pending.state.clone();
        let nonce = pending.nonce.clone();
        let mut request = self
            .client
            .authorize_url(
                AuthenticationFlow::<CoreResponseType>::AuthorizationCode,
                move || CsrfToken::new(state),
                move || Nonce::new(nonce),
            )
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()));
        if let Some(hint) = provider.identity_provider_hint() {
            request = request.add_extra_param("identity_provider", hint);
        }
        let (url, _, _) = request.url();
        Ok(url)
    }

    async fn complete(&self, code: &str, pending: &PendingAuth) -> Result<UserInfo, CallbackError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| CallbackError::TokenExchange(e.to_string()))?;

        let subject = {
            let id_token = token
                .id_token()
                .ok_or_else(|| CallbackError::IdToken("missing id_token".into()))?;
            let verifier: CoreIdTokenVerifier = self.client.id_token_verifier();
            let id_claims: &CoreIdTokenClaims = id_token
                .claims(&verifier, &Nonce::new(pending.nonce.clone()))
                .map_err(|e| CallbackError::IdToken(e.to_string()))?;
            id_claims.subject().clone()
        };

        let claims: CoreUserInfoClaims = self
            .client
            .user_info(token.access_token().to_owned(), Some(subject))
            .map_err(|e| CallbackError::UserInfo(e.to_string()))?
            .request_async(async_http_client)
            .await
            .map_err(|e| CallbackError::UserInfo(e.to_string()))?;

        Ok(UserInfo {
            subject: claims.subject().to_string(),
            email: claims.email().map(|e| e.to_string()),
            name: claims.name().and_then(|n| n.get(None)).map(|v| v.to_string()),
            given_name: claims.given_name().and_then(|n| n.get(None)).map(|v| v.to_string()),
            family_name: claims.family_name().and_then(|n| n.get(None)).map(|v| v.to_string()),
            picture: claims.picture().and_then(|p| p.get(None)).map(|v| v.to_string()),
            email_verified: claims.email_verified().unwrap_or(false),
            provider: Provider::Google.as_str().to_string(),
        })
    }

    fn logout_url(&self) -> Option<Url> {
        let domain = self.domain.as_deref()?;
        let mut url = Url::parse(&format!("https://{}/logout", domain)).ok()?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("logout_uri", &self.logout_uri);
        Some(url)
    }
}
