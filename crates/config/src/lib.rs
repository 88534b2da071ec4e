//! Service configuration.
//!
//! A single TOML file with full serde defaults: a missing file or a missing
//! key never stops startup, only explicit nonsense does. OAuth client
//! registrations are configuration, not code, so they can be rotated without
//! touching the auth flow.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// One OAuth client registration at the identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Identity-provider endpoints and client registrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// OAuth token endpoint (all grant types).
    pub token_url: String,

    /// Device-authorization endpoint.
    pub device_authorization_url: String,

    /// Exchange-code endpoint (Bearer GET).
    pub exchange_url: String,

    /// Base URL for account-scoped calls; the device-credential mint POSTs to
    /// `{account_base_url}/{account_id}/deviceAuth`.
    pub account_base_url: String,

    /// Browser URL shown to the user; `{user_code}` and `{client_id}` are
    /// substituted.
    pub activation_url: String,

    /// Scope string sent on the device-authorization request. Some
    /// registrations require it present, others reject it; the auth flow
    /// tries both forms.
    pub device_scope: String,

    /// Registrations tried in order for the device flow. Different
    /// registrations carry different grant permissions, so one being
    /// rejected is expected, not fatal.
    pub device_registrations: Vec<ClientRegistration>,

    /// Registration the game-session logins use. Exchange-code and
    /// authorization-code grants run against this one because its scopes
    /// differ from the device-flow registrations.
    pub game_registration: ClientRegistration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token_url: String::new(),
            device_authorization_url: String::new(),
            exchange_url: String::new(),
            account_base_url: String::new(),
            activation_url: String::new(),
            device_scope: "basic_profile friends_list openid presence".into(),
            device_registrations: Vec::new(),
            game_registration: ClientRegistration::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat command prefix.
    pub command_marker: char,

    /// Display names allowed to use administrative verbs.
    pub admins: Vec<String>,

    /// Where roster mutations (ban/unban) are persisted. None keeps the
    /// roster in memory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster_path: Option<PathBuf>,

    /// Friend-count ceiling above which a session is excluded from
    /// friend-request routing.
    pub friend_ceiling: usize,

    /// Delay between sequential session launches. A cooperative rate limit
    /// against the identity provider's abuse detection.
    pub launch_gap_ms: u64,

    /// How long a sent whisper id is remembered for echo suppression.
    pub echo_window_ms: u64,

    pub database_url: String,

    pub provider: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_marker: '!',
            admins: Vec::new(),
            roster_path: None,
            friend_ceiling: 900,
            launch_gap_ms: 3_000,
            echo_window_ms: 5_000,
            database_url: "sqlite://lobbykit.db".into(),
            provider: ProviderConfig::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
