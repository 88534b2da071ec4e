use std::{str::FromStr, sync::Arc};

use {async_trait::async_trait, tokio::sync::broadcast};

use lobbykit_common::AccountCredential;

use crate::{error::ClientError, events::SessionEvent};

/// A member of the session's current party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyMember {
    pub account_id: String,
    pub display_name: String,
}

/// An account on the session's friends list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friend {
    pub account_id: String,
    pub display_name: String,
}

/// Party visibility levels recognized by the game service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyPrivacy {
    Public,
    Friends,
    Private,
}

impl PartyPrivacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Friends => "Friends",
            Self::Private => "Private",
        }
    }
}

impl FromStr for PartyPrivacy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "friends" => Ok(Self::Friends),
            "private" => Ok(Self::Private),
            _ => Err(()),
        }
    }
}

/// Operations on the party the session currently belongs to.
///
/// A `PartySession` handle is only obtainable while the session is in a
/// party; callers re-fetch it through [`SessionClient::party`] rather than
/// caching it across party changes.
#[async_trait]
pub trait PartySession: Send + Sync {
    fn members(&self) -> Vec<PartyMember>;

    async fn leave(&self) -> Result<(), ClientError>;
    async fn kick(&self, account_id: &str) -> Result<(), ClientError>;
    async fn promote(&self, account_id: &str) -> Result<(), ClientError>;
    async fn set_privacy(&self, privacy: PartyPrivacy) -> Result<(), ClientError>;
    async fn set_ready(&self, ready: bool) -> Result<(), ClientError>;

    async fn set_outfit(&self, cosmetic_id: &str) -> Result<(), ClientError>;
    async fn set_backpack(&self, cosmetic_id: &str) -> Result<(), ClientError>;
    async fn clear_backpack(&self) -> Result<(), ClientError>;
    async fn set_pickaxe(&self, cosmetic_id: &str) -> Result<(), ClientError>;
    async fn set_emote(&self, cosmetic_id: &str) -> Result<(), ClientError>;
    async fn clear_emote(&self) -> Result<(), ClientError>;
    async fn set_level(&self, level: u32) -> Result<(), ClientError>;
}

/// Operations on the session's friends list.
#[async_trait]
pub trait FriendSession: Send + Sync {
    fn friends(&self) -> Vec<Friend>;

    fn friend_count(&self) -> usize {
        self.friends().len()
    }

    /// Send a friend request by display name.
    async fn add(&self, display_name: &str) -> Result<(), ClientError>;

    /// Remove an existing friend by account id.
    async fn remove(&self, account_id: &str) -> Result<(), ClientError>;

    /// Accept a pending inbound friend request.
    async fn accept_request(&self, account_id: &str) -> Result<(), ClientError>;
}

/// One live, authenticated connection to the game service.
#[async_trait]
pub trait SessionClient: Send + Sync {
    fn account_id(&self) -> String;
    fn display_name(&self) -> String;

    async fn login(&self) -> Result<(), ClientError>;
    async fn logout(&self) -> Result<(), ClientError>;

    /// The current party, if the session is in one.
    fn party(&self) -> Option<Arc<dyn PartySession>>;

    fn social(&self) -> Arc<dyn FriendSession>;

    /// Subscribe to this session's inbound event stream.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    async fn send_party_chat(&self, body: &str) -> Result<(), ClientError>;

    /// Send a direct message; returns the outgoing message id so the caller
    /// can recognize it if the event source echoes it back.
    async fn send_whisper(&self, to_account_id: &str, body: &str) -> Result<String, ClientError>;
}

/// Opens session clients from stored credentials.
///
/// The returned client is constructed but not yet logged in; the pool wires
/// event handlers before calling [`SessionClient::login`].
#[async_trait]
pub trait ClientConnector: Send + Sync {
    async fn open(
        &self,
        credential: &AccountCredential,
    ) -> Result<Arc<dyn SessionClient>, ClientError>;
}
