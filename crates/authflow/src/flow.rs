use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use {
    lobbykit_common::UserLink,
    lobbykit_config::ClientRegistration,
    lobbykit_store::{CredentialStore, StoreError},
};

use crate::provider::{IdentityProvider, ProviderError, TokenGrant};

/// What to show the user after a successful initiate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFlowPrompt {
    pub user_code: String,
    pub activation_url: String,
    pub expires_in: Duration,
    /// Minimum wait between polls. The caller owns the retry cadence.
    pub poll_interval: Duration,
}

/// Outcome of starting the device flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiateOutcome {
    Prompt(DeviceFlowPrompt),
    /// Every known registration refused the device grant; the caller should
    /// walk the user through the manual authorization-code path instead.
    ManualFallback,
}

/// Outcome of one poll round-trip.
///
/// `Pending`, `Expired`, and `Denied` are ordinary results, not errors.
/// `Error` covers transport and protocol trouble; the stored flow session
/// survives it so the next poll can retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Pending,
    Expired,
    Denied,
    Success(String),
    Error(String),
}

/// Transient per-user device-flow state. Replaced wholesale by a fresh
/// initiate, discarded on any terminal poll outcome.
#[derive(Clone)]
struct FlowSession {
    registration: ClientRegistration,
    device_code: String,
    expires_at: Instant,
    poll_interval: Duration,
}

/// The device-authorization state machine, one pending flow per user.
pub struct AuthFlow {
    provider: IdentityProvider,
    store: Arc<dyn CredentialStore>,
    sessions: Mutex<HashMap<String, FlowSession>>,
}

impl AuthFlow {
    pub fn new(provider: IdentityProvider, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            provider,
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a device flow is currently pending for `user_id`.
    pub fn pending(&self, user_id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(user_id)
    }

    fn session_snapshot(&self, user_id: &str) -> Option<FlowSession> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
    }

    fn discard(&self, user_id: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(user_id);
    }

    /// Start a device flow for `user_id`, trying each configured registration
    /// in order, with and without the scope body. A registration refusing the
    /// grant is expected; only exhausting the whole list falls back.
    pub async fn initiate(&self, user_id: &str) -> InitiateOutcome {
        for registration in self.provider.device_registrations().to_vec() {
            for with_scope in [true, false] {
                match self
                    .provider
                    .request_device_authorization(&registration, with_scope)
                    .await
                {
                    Ok(authorization) => {
                        let expires_in = Duration::from_secs(authorization.expires_in);
                        let poll_interval = Duration::from_secs(authorization.interval);

                        self.sessions
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .insert(user_id.to_string(), FlowSession {
                                registration: registration.clone(),
                                device_code: authorization.device_code,
                                expires_at: Instant::now() + expires_in,
                                poll_interval,
                            });

                        info!(
                            user_id,
                            client_id = %registration.client_id,
                            with_scope,
                            "device flow initiated"
                        );
                        return InitiateOutcome::Prompt(DeviceFlowPrompt {
                            activation_url: self
                                .provider
                                .activation_url(&authorization.user_code, &registration.client_id),
                            user_code: authorization.user_code,
                            expires_in,
                            poll_interval,
                        });
                    },
                    Err(e) => {
                        debug!(
                            user_id,
                            client_id = %registration.client_id,
                            with_scope,
                            "device authorization refused: {e}"
                        );
                    },
                }
            }
        }

        warn!(user_id, "device flow refused by every registration");
        InitiateOutcome::ManualFallback
    }

    /// One poll round-trip for `user_id`'s pending flow.
    ///
    /// Local expiry is enforced before anything touches the network; the
    /// provider is not trusted to always report it. With no pending flow the
    /// answer is `Expired`: terminal outcomes discard the session, so
    /// "nothing pending" and "code ran out" look the same to the caller.
    pub async fn poll(&self, user_id: &str) -> PollOutcome {
        let Some(session) = self.session_snapshot(user_id) else {
            return PollOutcome::Expired;
        };

        if Instant::now() >= session.expires_at {
            self.discard(user_id);
            return PollOutcome::Expired;
        }

        match self
            .provider
            .poll_device_token(&session.registration, &session.device_code)
            .await
        {
            Ok(grant) => match self.materialize(user_id, grant).await {
                Ok(display_name) => {
                    self.discard(user_id);
                    PollOutcome::Success(display_name)
                },
                // The grant succeeded but credential materialization did
                // not; keep the session so the next poll retries.
                Err(e) => PollOutcome::Error(format!("{e:#}")),
            },
            Err(ProviderError::AuthorizationPending) => PollOutcome::Pending,
            Err(ProviderError::CodeExpired) => {
                self.discard(user_id);
                PollOutcome::Expired
            },
            Err(ProviderError::AccessDenied) => {
                self.discard(user_id);
                PollOutcome::Denied
            },
            Err(e) => PollOutcome::Error(e.to_string()),
        }
    }

    /// Manual fallback: redeem a user-supplied one-time authorization code
    /// under the game registration and persist the link.
    pub async fn manual_login(&self, user_id: &str, authorization_code: &str) -> PollOutcome {
        match self
            .provider
            .token_from_authorization_code(authorization_code.trim())
            .await
        {
            Ok(grant) => match self.persist_link(user_id, grant).await {
                Ok(display_name) => PollOutcome::Success(display_name),
                Err(e) => PollOutcome::Error(format!("{e:#}")),
            },
            Err(e) => PollOutcome::Error(e.to_string()),
        }
    }

    /// Device-flow success tail: the granted token is scoped to the
    /// device-flow registration, so hop through an exchange code into the
    /// game registration before minting credentials.
    async fn materialize(&self, user_id: &str, grant: TokenGrant) -> anyhow::Result<String> {
        let code = self.provider.exchange_code(&grant.access_token).await?;
        let game_grant = self.provider.token_from_exchange_code(&code).await?;
        self.persist_link(user_id, game_grant).await
    }

    /// Mint (or re-mint) durable device credentials and persist the link.
    async fn persist_link(&self, user_id: &str, grant: TokenGrant) -> anyhow::Result<String> {
        let account_id = grant
            .account_id
            .ok_or_else(|| anyhow::anyhow!("token grant carries no account id"))?;
        let display_name = grant.display_name.unwrap_or_else(|| "Unknown".to_string());

        let device_auth = self
            .provider
            .mint_device_auth(&grant.access_token, &account_id)
            .await?;

        let language = self.store.language(user_id).await?;
        self.store
            .upsert_user_link(&UserLink {
                user_id: user_id.to_string(),
                display_name: display_name.clone(),
                device_auth,
                language,
            })
            .await?;

        info!(user_id, %display_name, "user link persisted");
        Ok(display_name)
    }

    /// Forget the user's link and any pending flow.
    pub async fn logout(&self, user_id: &str) -> Result<(), StoreError> {
        self.discard(user_id);
        self.store.delete_user_link(user_id).await
    }

    pub async fn set_language(&self, user_id: &str, language: &str) -> Result<(), StoreError> {
        self.store.set_language(user_id, language).await
    }

    pub async fn language(&self, user_id: &str) -> Result<String, StoreError> {
        self.store.language(user_id).await
    }
}
