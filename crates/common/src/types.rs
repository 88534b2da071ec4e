use serde::{Deserialize, Serialize};

/// Durable device credential triple minted by the identity provider.
///
/// Re-authenticates an account without a password or a fresh OAuth round-trip.
/// The `secret` must never reach logs; `Debug` redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAuth {
    pub device_id: String,
    pub account_id: String,
    pub secret: String,
}

impl std::fmt::Debug for DeviceAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAuth")
            .field("device_id", &self.device_id)
            .field("account_id", &self.account_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// One pool-operated game account: a stable identifier plus the device
/// credential used to open its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredential {
    /// Stable unique key for the account (the login email in practice).
    pub identifier: String,

    /// In-game display name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    pub device_auth: DeviceAuth,
}

impl AccountCredential {
    /// Name used in log lines: the display name when known, else the identifier.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }
}

/// Persisted association between an end user and the game account they linked
/// through the auth flow. Distinct from the pool's own accounts: these
/// credentials act on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLink {
    pub user_id: String,
    pub display_name: String,
    pub device_auth: DeviceAuth,
    /// Preferred reply language, BCP 47-ish short code. Defaults to "en".
    pub language: String,
}

/// How a chat message reached a session, and therefore how the reply leaves.
///
/// Parsing is identical on both transports; only delivery and echo handling
/// differ (whisper event sources can redeliver our own outgoing messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatTransport {
    /// Lobby/party broadcast chat.
    Party,
    /// Direct message to the session's account.
    Whisper,
}
