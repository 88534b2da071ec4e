//! In-memory session fakes shared by tests across the workspace.
//!
//! The fakes record every operation they are asked to perform so tests can
//! assert on behavior without a live game connection. Failure injection is
//! a per-handle flag: when set, every operation reports a rejected request.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use {async_trait::async_trait, tokio::sync::broadcast};

use lobbykit_common::AccountCredential;

use crate::{
    error::ClientError,
    events::SessionEvent,
    session::{
        ClientConnector, Friend, FriendSession, PartyMember, PartyPrivacy, PartySession,
        SessionClient,
    },
};

fn injected() -> ClientError {
    ClientError::Rejected("injected failure".into())
}

/// Fake party handle. Records operations as `"op"` or `"op:arg"` strings.
pub struct FakeParty {
    pub members: Mutex<Vec<PartyMember>>,
    pub ops: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeParty {
    pub fn new(members: Vec<PartyMember>) -> Arc<Self> {
        Arc::new(Self {
            members: Mutex::new(members),
            ops: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn recorded_ops(&self) -> Vec<String> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, op: String) -> Result<(), ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).push(op);
        Ok(())
    }
}

#[async_trait]
impl PartySession for FakeParty {
    fn members(&self) -> Vec<PartyMember> {
        self.members
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn leave(&self) -> Result<(), ClientError> {
        self.record("leave".into())
    }

    async fn kick(&self, account_id: &str) -> Result<(), ClientError> {
        self.record(format!("kick:{account_id}"))
    }

    async fn promote(&self, account_id: &str) -> Result<(), ClientError> {
        self.record(format!("promote:{account_id}"))
    }

    async fn set_privacy(&self, privacy: PartyPrivacy) -> Result<(), ClientError> {
        self.record(format!("privacy:{}", privacy.as_str()))
    }

    async fn set_ready(&self, ready: bool) -> Result<(), ClientError> {
        self.record(format!("ready:{ready}"))
    }

    async fn set_outfit(&self, cosmetic_id: &str) -> Result<(), ClientError> {
        self.record(format!("outfit:{cosmetic_id}"))
    }

    async fn set_backpack(&self, cosmetic_id: &str) -> Result<(), ClientError> {
        self.record(format!("backpack:{cosmetic_id}"))
    }

    async fn clear_backpack(&self) -> Result<(), ClientError> {
        self.record("clear_backpack".into())
    }

    async fn set_pickaxe(&self, cosmetic_id: &str) -> Result<(), ClientError> {
        self.record(format!("pickaxe:{cosmetic_id}"))
    }

    async fn set_emote(&self, cosmetic_id: &str) -> Result<(), ClientError> {
        self.record(format!("emote:{cosmetic_id}"))
    }

    async fn clear_emote(&self) -> Result<(), ClientError> {
        self.record("clear_emote".into())
    }

    async fn set_level(&self, level: u32) -> Result<(), ClientError> {
        self.record(format!("level:{level}"))
    }
}

/// Fake friends-list handle.
pub struct FakeFriends {
    pub friends: Mutex<Vec<Friend>>,
    pub added: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
    pub accepted: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeFriends {
    pub fn new(friends: Vec<Friend>) -> Arc<Self> {
        Arc::new(Self {
            friends: Mutex::new(friends),
            added: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            accepted: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    /// Fill the list with `count` synthetic friends.
    pub fn with_count(count: usize) -> Arc<Self> {
        Self::new(
            (0..count)
                .map(|i| Friend {
                    account_id: format!("f-{i}"),
                    display_name: format!("Friend{i}"),
                })
                .collect(),
        )
    }

    fn check(&self) -> Result<(), ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(injected())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FriendSession for FakeFriends {
    fn friends(&self) -> Vec<Friend> {
        self.friends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn add(&self, display_name: &str) -> Result<(), ClientError> {
        self.check()?;
        self.added
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(display_name.to_string());
        Ok(())
    }

    async fn remove(&self, account_id: &str) -> Result<(), ClientError> {
        self.check()?;
        self.removed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(account_id.to_string());
        self.friends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|f| f.account_id != account_id);
        Ok(())
    }

    async fn accept_request(&self, account_id: &str) -> Result<(), ClientError> {
        self.check()?;
        self.accepted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(account_id.to_string());
        Ok(())
    }
}

/// Fake session client with injectable party, friends, and events.
pub struct FakeSession {
    account_id: String,
    display_name: String,
    party: Mutex<Option<Arc<FakeParty>>>,
    friends: Mutex<Arc<FakeFriends>>,
    events: broadcast::Sender<SessionEvent>,
    pub fail_login: AtomicBool,
    pub fail_send: AtomicBool,
    pub logged_in: AtomicBool,
    pub logged_out: AtomicBool,
    pub party_chat_sent: Mutex<Vec<String>>,
    /// (to_account_id, body, message_id) per sent whisper.
    pub whispers_sent: Mutex<Vec<(String, String, String)>>,
    whisper_seq: AtomicU64,
}

impl FakeSession {
    pub fn new(account_id: impl Into<String>, display_name: impl Into<String>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
            party: Mutex::new(None),
            friends: Mutex::new(FakeFriends::new(Vec::new())),
            events,
            fail_login: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            logged_in: AtomicBool::new(false),
            logged_out: AtomicBool::new(false),
            party_chat_sent: Mutex::new(Vec::new()),
            whispers_sent: Mutex::new(Vec::new()),
            whisper_seq: AtomicU64::new(0),
        })
    }

    pub fn set_party(&self, party: Option<Arc<FakeParty>>) {
        *self.party.lock().unwrap_or_else(|e| e.into_inner()) = party;
    }

    pub fn set_friends(&self, friends: Arc<FakeFriends>) {
        *self.friends.lock().unwrap_or_else(|e| e.into_inner()) = friends;
    }

    pub fn fake_friends(&self) -> Arc<FakeFriends> {
        self.friends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn fake_party(&self) -> Option<Arc<FakeParty>> {
        self.party
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Inject an inbound event, as the wire would.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn sent_whispers(&self) -> Vec<(String, String, String)> {
        self.whispers_sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn sent_party_chat(&self) -> Vec<String> {
        self.party_chat_sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SessionClient for FakeSession {
    fn account_id(&self) -> String {
        self.account_id.clone()
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }

    async fn login(&self) -> Result<(), ClientError> {
        if self.fail_login.load(Ordering::SeqCst) {
            return Err(ClientError::Login("invalid device credential".into()));
        }
        self.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.logged_out.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn party(&self) -> Option<Arc<dyn PartySession>> {
        self.fake_party().map(|p| p as Arc<dyn PartySession>)
    }

    fn social(&self) -> Arc<dyn FriendSession> {
        self.fake_friends() as Arc<dyn FriendSession>
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn send_party_chat(&self, body: &str) -> Result<(), ClientError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("send blocked".into()));
        }
        self.party_chat_sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(body.to_string());
        Ok(())
    }

    async fn send_whisper(&self, to_account_id: &str, body: &str) -> Result<String, ClientError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("send blocked".into()));
        }
        let id = format!(
            "{}-m{}",
            self.account_id,
            self.whisper_seq.fetch_add(1, Ordering::SeqCst)
        );
        self.whispers_sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((to_account_id.to_string(), body.to_string(), id.clone()));
        Ok(id)
    }
}

/// Connector that hands out prepared [`FakeSession`]s by credential identifier.
pub struct FakeConnector {
    prepared: Mutex<HashMap<String, Arc<FakeSession>>>,
    pub fail_open: Mutex<HashSet<String>>,
    pub opened: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            prepared: Mutex::new(HashMap::new()),
            fail_open: Mutex::new(HashSet::new()),
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn prepare(&self, identifier: impl Into<String>, session: Arc<FakeSession>) {
        self.prepared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(identifier.into(), session);
    }

    pub fn fail_open_for(&self, identifier: impl Into<String>) {
        self.fail_open
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(identifier.into());
    }

    pub fn open_count(&self, identifier: &str) -> usize {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|i| i.as_str() == identifier)
            .count()
    }
}

#[async_trait]
impl ClientConnector for FakeConnector {
    async fn open(
        &self,
        credential: &AccountCredential,
    ) -> Result<Arc<dyn SessionClient>, ClientError> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(credential.identifier.clone());

        if self
            .fail_open
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&credential.identifier)
        {
            return Err(ClientError::Transport("connect refused".into()));
        }

        let session = self
            .prepared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&credential.identifier)
            .cloned()
            .unwrap_or_else(|| {
                FakeSession::new(
                    credential.device_auth.account_id.clone(),
                    credential.label().to_string(),
                )
            });
        Ok(session as Arc<dyn SessionClient>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_party_records_ops_in_order() {
        let party = FakeParty::new(Vec::new());
        party.leave().await.unwrap_or_default();
        party.kick("a-2").await.unwrap_or_default();
        assert_eq!(party.recorded_ops(), vec!["leave", "kick:a-2"]);
    }

    #[tokio::test]
    async fn fake_party_failure_injection_rejects_everything() {
        let party = FakeParty::new(Vec::new());
        party.fail.store(true, Ordering::SeqCst);
        assert!(party.leave().await.is_err());
        assert!(party.recorded_ops().is_empty());
    }

    #[tokio::test]
    async fn fake_session_whisper_ids_are_unique() {
        let session = FakeSession::new("a-1", "Bot");
        let first = session.send_whisper("a-2", "hi").await.unwrap_or_default();
        let second = session.send_whisper("a-2", "ho").await.unwrap_or_default();
        assert_ne!(first, second);
        assert_eq!(session.sent_whispers().len(), 2);
    }

    #[tokio::test]
    async fn events_reach_subscribers() {
        let session = FakeSession::new("a-1", "Bot");
        let mut rx = session.subscribe();
        session.emit(SessionEvent::Disconnected {
            reason: "test".into(),
        });
        let event = rx.recv().await.ok();
        assert!(matches!(event, Some(SessionEvent::Disconnected { .. })));
    }
}
