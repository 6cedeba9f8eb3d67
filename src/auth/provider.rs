use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sign-in providers this app offers.
///
/// `Google` is federated through the managed user pool; `LinkedIn` talks to
/// LinkedIn's OAuth2 endpoints directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    LinkedIn,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::LinkedIn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::LinkedIn => "linkedin",
        }
    }

    /// Whether the provider is reached through the managed OIDC client.
    pub fn is_managed(&self) -> bool {
        matches!(self, Provider::Google)
    }

    /// `identity_provider` hint understood by the user pool's authorize endpoint.
    pub fn identity_provider_hint(&self) -> Option<&'static str> {
        match self {
            Provider::Google => Some("Google"),
            Provider::LinkedIn => None,
        }
    }

    /// Opaque tag put on `/login?error=` when a callback fails.
    pub fn failure_tag(&self) -> &'static str {
        match self {
            Provider::Google => "auth_failed",
            Provider::LinkedIn => "linkedin_auth_failed",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "linkedin" => Ok(Provider::LinkedIn),
            other => Err(anyhow::anyhow!("unknown provider '{}'", other)),
        }
    }
}

/// Normalized profile stored in the session, whichever path produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
    pub provider: String,
}

impl UserInfo {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.subject)
    }
}
