use std::sync::{Arc, Mutex};

use {tokio_util::sync::CancellationToken, tracing::debug};

use {lobbykit_client::SessionClient, lobbykit_common::AccountCredential};

/// Connection lifecycle of one session. Transitions are one-way:
/// `Connecting → Connected → Disconnected` (or straight to `Disconnected`).
/// A disconnected session leaves the pool; reconnecting means a new launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// One live pool-operated account session.
pub struct Session {
    credential: AccountCredential,
    client: Arc<dyn SessionClient>,
    state: Mutex<ConnectionState>,
    cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(credential: AccountCredential, client: Arc<dyn SessionClient>) -> Arc<Self> {
        Arc::new(Self {
            credential,
            client,
            state: Mutex::new(ConnectionState::Connecting),
            cancel: CancellationToken::new(),
        })
    }

    pub fn identifier(&self) -> &str {
        &self.credential.identifier
    }

    /// Human-readable account name, used for log lines and named-action
    /// lookup.
    pub fn display_name(&self) -> &str {
        self.credential.label()
    }

    pub fn credential(&self) -> &AccountCredential {
        &self.credential
    }

    pub fn client(&self) -> &Arc<dyn SessionClient> {
        &self.client
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn friend_count(&self) -> usize {
        self.client.social().friend_count()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Advance the lifecycle. Backward transitions are refused: once a
    /// session disconnects it never comes back under the same handle.
    pub(crate) fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let allowed = matches!(
            (*state, next),
            (ConnectionState::Connecting, ConnectionState::Connected)
                | (ConnectionState::Connecting, ConnectionState::Disconnected)
                | (ConnectionState::Connected, ConnectionState::Disconnected)
        );
        if allowed {
            *state = next;
        } else if *state != next {
            debug!(
                session = %self.display_name(),
                from = ?*state,
                to = ?next,
                "refusing backward connection-state transition"
            );
        }
    }
}
