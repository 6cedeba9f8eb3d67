use std::fmt;

use base64::Engine as _;
use rand::RngCore;
use serde::Deserialize;

pub const LINKEDIN_AUTH_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
pub const LINKEDIN_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
pub const LINKEDIN_USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";

#[derive(Clone)]
pub struct ServerCfg {
    pub bind_addr: String,
    pub public_url: String,
    /// Base64-encoded 32 or 64 byte key used to encrypt the session cookie
    pub cookie_key_base64: String,
    pub secure_cookies: bool,
}

#[derive(Clone)]
pub struct CognitoCfg {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Hosted UI domain, e.g. `my-pool.auth.eu-west-1.amazoncognito.com`
    pub domain: Option<String>,
    pub logout_uri: String,
}

#[derive(Clone)]
pub struct LinkedInCfg {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerCfg,
    pub cognito: CognitoCfg,
    pub linkedin: Option<LinkedInCfg>,
}

// Secrets stay out of the startup log line.
impl fmt::Debug for ServerCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCfg")
            .field("bind_addr", &self.bind_addr)
            .field("public_url", &self.public_url)
            .field("cookie_key_base64", &"<redacted>")
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

impl fmt::Debug for CognitoCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CognitoCfg")
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("domain", &self.domain)
            .field("logout_uri", &self.logout_uri)
            .finish()
    }
}

impl fmt::Debug for LinkedInCfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedInCfg")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Flat view of the process environment. The `config` crate lowercases
/// variable names, so `COGNITO_CLIENT_ID` arrives as `cognito_client_id`.
#[derive(Debug, Default, Deserialize)]
struct RawEnv {
    port: Option<u16>,
    bind_host: Option<String>,
    public_url: Option<String>,
    session_secret: Option<String>,
    cookie_secure: Option<String>,
    aws_region: Option<String>,
    cognito_user_pool_id: Option<String>,
    cognito_issuer: Option<String>,
    cognito_client_id: Option<String>,
    cognito_client_secret: Option<String>,
    redirect_uri: Option<String>,
    cognito_domain: Option<String>,
    logout_uri: Option<String>,
    linkedin_client_id: Option<String>,
    linkedin_client_secret: Option<String>,
    linkedin_callback_url: Option<String>,
    linkedin_auth_url: Option<String>,
    linkedin_token_url: Option<String>,
    linkedin_userinfo_url: Option<String>,
    http_timeout_secs: Option<u64>,
}

fn default_port() -> u16 { 3000 }
fn default_timeout_secs() -> u64 { 10 }

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let raw: RawEnv = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEnv) -> anyhow::Result<Self> {
        let port = raw.port.unwrap_or_else(default_port);
        let host = non_empty(raw.bind_host).unwrap_or_else(|| "0.0.0.0".to_string());
        let public_url = non_empty(raw.public_url)
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let cookie_key_base64 = match non_empty(raw.session_secret) {
            Some(v) => v,
            None => {
                // Generate a dev key (64 bytes) and keep it in-memory only
                let mut key = [0u8; 64];
                rand::rngs::OsRng.fill_bytes(&mut key);
                tracing::warn!(
                    "SESSION_SECRET not provided; generated a temporary key. Sessions will be invalidated on restart."
                );
                base64::engine::general_purpose::STANDARD.encode(key)
            }
        };

        let server = ServerCfg {
            bind_addr: format!("{host}:{port}"),
            public_url: public_url.clone(),
            cookie_key_base64,
            secure_cookies: is_truthy(raw.cookie_secure.as_deref()),
        };

        let issuer = match non_empty(raw.cognito_issuer) {
            Some(i) => i,
            None => cognito_issuer(
                raw.aws_region.as_deref().unwrap_or_default(),
                raw.cognito_user_pool_id.as_deref().unwrap_or_default(),
            ),
        };
        let cognito = CognitoCfg {
            issuer,
            client_id: raw.cognito_client_id.unwrap_or_default(),
            client_secret: raw.cognito_client_secret.unwrap_or_default(),
            redirect_uri: non_empty(raw.redirect_uri)
                .unwrap_or_else(|| format!("{public_url}/auth/callback")),
            domain: non_empty(raw.cognito_domain),
            logout_uri: non_empty(raw.logout_uri).unwrap_or_else(|| public_url.clone()),
        };

        let linkedin = match (non_empty(raw.linkedin_client_id), non_empty(raw.linkedin_client_secret)) {
            (Some(client_id), Some(client_secret)) => Some(LinkedInCfg {
                client_id,
                client_secret,
                callback_url: non_empty(raw.linkedin_callback_url)
                    .unwrap_or_else(|| format!("{public_url}/auth/linkedin/callback")),
                auth_url: non_empty(raw.linkedin_auth_url).unwrap_or_else(|| LINKEDIN_AUTH_URL.to_string()),
                token_url: non_empty(raw.linkedin_token_url).unwrap_or_else(|| LINKEDIN_TOKEN_URL.to_string()),
                userinfo_url: non_empty(raw.linkedin_userinfo_url)
                    .unwrap_or_else(|| LINKEDIN_USERINFO_URL.to_string()),
                timeout_secs: raw.http_timeout_secs.unwrap_or_else(default_timeout_secs),
            }),
            (None, None) => None,
            _ => anyhow::bail!("LINKEDIN_CLIENT_ID and LINKEDIN_CLIENT_SECRET must be set together"),
        };

        Ok(AppConfig { server, cognito, linkedin })
    }
}

pub fn cognito_issuer(region: &str, user_pool_id: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/{user_pool_id}")
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn is_truthy(v: Option<&str>) -> bool {
    matches!(v.map(str::to_ascii_lowercase).as_deref(), Some("1" | "true" | "yes"))
}

pub fn decode_cookie_key(b64: &str) -> anyhow::Result<[u8; 64]> {
    // tower-cookies expects 64 bytes key for Private (32 for signing + 32 for encryption)
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid SESSION_SECRET: {}", e))?;
    let mut out = [0u8; 64];
    match bytes.len() {
        32 => {
            out[..32].copy_from_slice(&bytes);
            out[32..].copy_from_slice(&bytes);
        }
        64 => out.copy_from_slice(&bytes),
        n => anyhow::bail!("SESSION_SECRET must decode to 32 or 64 bytes, got {}", n),
    }
    Ok(out)
}
