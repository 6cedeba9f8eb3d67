use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_cookies::{CookieManagerLayer, Key};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::auth::cognito::{CognitoClient, IdentityProvider};
use crate::auth::linkedin::LinkedInClient;
use crate::auth::store::{MemorySessionStore, SessionStore};
use crate::config::{decode_cookie_key, AppConfig};
use crate::web::{handlers, views::Views};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub cookie_key: Key,
    pub sessions: Arc<dyn SessionStore>,
    /// `None` when discovery failed at startup; managed routes answer 500.
    pub managed: Option<Arc<dyn IdentityProvider>>,
    pub linkedin: Option<Arc<LinkedInClient>>,
    pub views: Views,
}

impl AppState {
    /// Wires everything except the managed client, which needs discovery.
    pub fn new(config: AppConfig, managed: Option<Arc<dyn IdentityProvider>>) -> anyhow::Result<Self> {
        let key_bytes = decode_cookie_key(&config.server.cookie_key_base64)?;
        let linkedin = config
            .linkedin
            .as_ref()
            .map(LinkedInClient::new)
            .transpose()?
            .map(Arc::new);
        Ok(Self {
            cookie_key: Key::from(&key_bytes),
            sessions: Arc::new(MemorySessionStore::new()),
            managed,
            linkedin,
            views: Views::new()?,
            config,
        })
    }
}

pub async fn run() -> anyhow::Result<()> {
    // logging
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .try_init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!(?config, "loaded config");

    // Discovery runs before the listener binds, so no request can observe a
    // half-built client. A failure leaves the managed path disabled.
    let managed: Option<Arc<dyn IdentityProvider>> = match CognitoClient::discover(&config.cognito).await {
        Ok(client) => {
            tracing::info!("OIDC client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::error!(error = ?e, "failed to initialize OIDC client");
            None
        }
    };

    let state = AppState::new(config.clone(), managed)?;
    if state.linkedin.is_some() {
        tracing::info!("LinkedIn sign-in enabled");
    }

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(removed = n, "purged expired sessions"),
                Err(e) => tracing::warn!(error = ?e, "session sweep failed"),
            }
        }
    });

    let app = build_router(state);

    let addr = config.server.bind_addr.clone();
    tracing::info!(%addr, public_url = %config.server.public_url, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    use handlers::{api, auth, pages};

    Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login))
        .route("/dashboard", get(pages::dashboard))
        .route("/login/google", get(auth::start_google))
        .route("/auth/google", get(auth::start_google))
        .route("/auth/linkedin", get(auth::start_linkedin))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/linkedin/callback", get(auth::linkedin_callback))
        .route("/logout", get(auth::logout))
        .route("/api/user", get(api::user))
        .route("/api/auth/urls", get(api::auth_urls))
        .route("/api/health", get(api::health))
        .route("/health", get(api::health))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
}
