// Configuration: where the API lives and who we are talking to it as.
// Values come from the environment first; the UI prompts for anything that
// is missing and remembers the last account/repository pair (never the
// token) in the user's home directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub const ENV_API_URL: &str = "GITHUB_API_URL";
pub const ENV_ACCOUNT: &str = "GITHUB_USER";
pub const ENV_REPOSITORY: &str = "GITHUB_REPO";
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";

const PROFILE_FILE: &str = ".ghrepo_profile.json";

/// Account, repository and access token. Fixed for the lifetime of a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account: String,
    pub repository: String,
    pub token: String,
}

impl Credentials {
    pub fn new(
        account: impl Into<String>,
        repository: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Credentials {
            account: account.into(),
            repository: repository.into(),
            token: token.into(),
        }
    }

    /// `account/repository`, as shown to the user.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.account, self.repository)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("repository", &self.repository)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub credentials: Credentials,
}

/// Partially known settings gathered from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub api_url: Option<String>,
    pub account: Option<String>,
    pub repository: Option<String>,
    pub token: Option<String>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        EnvSettings {
            api_url: get(ENV_API_URL),
            account: get(ENV_ACCOUNT),
            repository: get(ENV_REPOSITORY),
            token: get(ENV_TOKEN),
        }
    }

    pub fn api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Complete settings when every credential field is known.
    pub fn complete(&self) -> Option<Settings> {
        Some(Settings {
            api_url: self.api_url(),
            credentials: Credentials::new(
                self.account.clone()?,
                self.repository.clone()?,
                self.token.clone()?,
            ),
        })
    }
}

/// The account/repository pair used last time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub account: String,
    pub repository: String,
}

fn profile_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(PROFILE_FILE)
}

/// Load the remembered profile. A missing or unreadable file yields `None`.
pub fn load_profile() -> Option<Profile> {
    let data = std::fs::read_to_string(profile_path()).ok()?;
    match serde_json::from_str(&data) {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::debug!("ignoring malformed profile: {}", e);
            None
        }
    }
}

pub fn persist_profile(credentials: &Credentials) -> Result<()> {
    let profile = Profile {
        account: credentials.account.clone(),
        repository: credentials.repository.clone(),
    };
    let path = profile_path();
    let data = serde_json::to_string_pretty(&profile).context("Serializing profile")?;
    std::fs::write(&path, data)
        .with_context(|| format!("Failed to write profile to {}", path.display()))?;
    Ok(())
}
