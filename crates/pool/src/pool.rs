use std::{sync::Arc, time::Duration};

use {
    serde::{Deserialize, Serialize},
    tokio::sync::broadcast,
    tracing::{debug, info, warn},
};

use {
    lobbykit_actions::{PartyService, SocialService},
    lobbykit_client::{ClientConnector, SessionEvent},
    lobbykit_commands::{CommandRouter, EchoFilter, InboundMessage},
    lobbykit_common::{AccountCredential, ActionError, ChatTransport},
};

use crate::{
    registry::Registry,
    session::{ConnectionState, Session},
};

/// Outcome of routing a friend request through the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendRouteOutcome {
    /// Sent from the named session.
    Success { session: String },
    /// Sessions exist but every one is at or above the friend ceiling.
    AllFull,
    /// Zero connected sessions.
    NoSessions,
    /// The selected session's request itself failed.
    Failed { detail: String },
}

/// Actions the trusted internal caller can run against a named session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedAction {
    Leave,
    Kick,
    Promote,
    Privacy,
    Add,
}

impl std::str::FromStr for NamedAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "leave" => Ok(Self::Leave),
            "kick" => Ok(Self::Kick),
            "promote" => Ok(Self::Promote),
            "privacy" => Ok(Self::Privacy),
            "add" => Ok(Self::Add),
            _ => Err(()),
        }
    }
}

/// Owns every live session and routes work to them.
pub struct SessionPool {
    connector: Arc<dyn ClientConnector>,
    router: Arc<CommandRouter>,
    party: PartyService,
    social: SocialService,
    sessions: Registry<String, Arc<Session>>,
    echo_filters: Registry<String, Arc<EchoFilter>>,
    friend_ceiling: usize,
    echo_window: Duration,
}

impl SessionPool {
    pub fn new(
        connector: Arc<dyn ClientConnector>,
        router: Arc<CommandRouter>,
        friend_ceiling: usize,
        echo_window: Duration,
    ) -> Self {
        Self {
            connector,
            router,
            party: PartyService::new(),
            social: SocialService::new(),
            sessions: Registry::new(),
            echo_filters: Registry::new(),
            friend_ceiling,
            echo_window,
        }
    }

    /// Open, wire, and log in a session for `credential`.
    ///
    /// Launching an identifier that already has a session is a no-op, not an
    /// error. On any failure the session ends up unregistered; retrying is
    /// the caller's decision.
    pub async fn launch(&self, credential: AccountCredential) -> Result<(), ActionError> {
        let identifier = credential.identifier.clone();
        let label = credential.label().to_string();

        if self.sessions.get(identifier.as_str()).is_some() {
            debug!(session = %label, "session already running");
            return Ok(());
        }

        info!(session = %label, "launching session");
        let client = match self.connector.open(&credential).await {
            Ok(client) => client,
            Err(e) => {
                warn!(session = %label, "failed to open session: {e}");
                return Err(ActionError::remote(e));
            },
        };

        let session = Session::new(credential, Arc::clone(&client));
        if !self.sessions.try_put(identifier.clone(), Arc::clone(&session)) {
            debug!(session = %label, "lost launch race, keeping existing session");
            return Ok(());
        }
        let echo = Arc::new(EchoFilter::new(self.echo_window));
        self.echo_filters.put(identifier.clone(), Arc::clone(&echo));

        // Handlers attach before login so nothing that happens between
        // connect and ready is missed.
        let events = client.subscribe();
        tokio::spawn(run_session_events(
            Arc::clone(&session),
            events,
            Arc::clone(&self.router),
            echo,
            self.sessions.clone(),
            self.echo_filters.clone(),
        ));

        match client.login().await {
            Ok(()) => {
                if session.cancel_token().is_cancelled() {
                    // Stopped while the login was in flight; do not resurrect.
                    info!(session = %label, "session stopped during launch");
                    let _ = client.logout().await;
                    return Ok(());
                }
                session.set_state(ConnectionState::Connected);
                info!(session = %label, "session connected");
                Ok(())
            },
            Err(e) => {
                warn!(session = %label, "login failed: {e}");
                session.cancel_token().cancel();
                self.discard(&identifier);
                Err(ActionError::remote(e))
            },
        }
    }

    /// Launch a batch strictly sequentially with a fixed gap between
    /// launches. The gap is a cooperative rate limit against the identity
    /// provider's abuse detection; do not parallelize this. Individual
    /// failures are logged and skipped, never abort the batch.
    pub async fn launch_all(&self, credentials: Vec<AccountCredential>, gap: Duration) {
        let total = credentials.len();
        info!(total, "launching session batch");

        let mut launched = 0usize;
        for (i, credential) in credentials.into_iter().enumerate() {
            if self.launch(credential).await.is_ok() {
                launched += 1;
            }
            if i + 1 < total {
                tokio::time::sleep(gap).await;
            }
        }
        info!(launched, total, "session batch finished");
    }

    /// Log out and forget a session, including all per-session derived state.
    pub async fn stop(&self, identifier: &str) -> Result<(), ActionError> {
        let Some(session) = self.sessions.remove(identifier) else {
            return Err(ActionError::not_found(identifier, "session"));
        };
        self.echo_filters.remove(identifier);
        session.cancel_token().cancel();
        session.set_state(ConnectionState::Disconnected);

        if let Err(e) = session.client().logout().await {
            warn!(session = %session.display_name(), "logout failed: {e}");
        }
        info!(session = %session.display_name(), "session stopped");
        Ok(())
    }

    pub async fn stop_all(&self) {
        for session in self.sessions.values() {
            let identifier = session.identifier().to_string();
            if let Err(e) = self.stop(&identifier).await {
                debug!(session = %identifier, "stop_all: {e}");
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, identifier: &str) -> Option<Arc<Session>> {
        self.sessions.get(identifier)
    }

    /// The connected session with the fewest friends, among those strictly
    /// below the ceiling. Ties break on identifier so the choice is
    /// deterministic.
    pub fn select_for_friend_request(&self) -> Result<Arc<Session>, ActionError> {
        let connected: Vec<Arc<Session>> = self
            .sessions
            .values()
            .into_iter()
            .filter(|s| s.is_connected())
            .collect();
        if connected.is_empty() {
            return Err(ActionError::NoSessionsAvailable);
        }

        let mut candidates: Vec<(usize, Arc<Session>)> = connected
            .into_iter()
            .map(|s| (s.friend_count(), s))
            .filter(|(count, _)| *count < self.friend_ceiling)
            .collect();
        candidates.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.identifier().cmp(b.1.identifier()))
        });

        candidates
            .into_iter()
            .next()
            .map(|(_, session)| session)
            .ok_or(ActionError::CapacityExhausted)
    }

    /// Route a friend request to the best session.
    pub async fn add_friend_on_best_session(&self, target: &str) -> FriendRouteOutcome {
        let session = match self.select_for_friend_request() {
            Ok(session) => session,
            Err(ActionError::NoSessionsAvailable) => {
                warn!(friend = target, "no sessions available for friend request");
                return FriendRouteOutcome::NoSessions;
            },
            Err(ActionError::CapacityExhausted) => {
                warn!(friend = target, "all sessions at friend capacity");
                return FriendRouteOutcome::AllFull;
            },
            Err(e) => {
                return FriendRouteOutcome::Failed {
                    detail: e.to_string(),
                };
            },
        };

        match self
            .social
            .add_friend(session.client().as_ref(), target)
            .await
        {
            Ok(_) => {
                info!(session = %session.display_name(), friend = target, "friend request routed");
                FriendRouteOutcome::Success {
                    session: session.display_name().to_string(),
                }
            },
            Err(e) => {
                warn!(session = %session.display_name(), friend = target, "friend request failed: {e}");
                FriendRouteOutcome::Failed {
                    detail: e.to_string(),
                }
            },
        }
    }

    /// Remove `target` as a friend on every connected session that has them.
    /// The pool does not track which session holds which friendship, so this
    /// is a sweep, not a routed call. Returns whether at least one removal
    /// succeeded.
    pub async fn remove_friend(&self, target: &str) -> bool {
        let mut removed = false;
        for session in self
            .sessions
            .values()
            .into_iter()
            .filter(|s| s.is_connected())
        {
            match self
                .social
                .remove_friend(session.client().as_ref(), target)
                .await
            {
                Ok(name) => {
                    info!(session = %session.display_name(), friend = %name, "friend removed");
                    removed = true;
                },
                Err(ActionError::NotFound { .. }) => {},
                Err(e) => {
                    warn!(session = %session.display_name(), friend = target, "friend removal failed: {e}");
                },
            }
        }
        removed
    }

    /// Run an action against a session picked by its account name.
    ///
    /// Driven by the trusted internal caller, so failures are logged, never
    /// reported conversationally.
    pub async fn execute_named_action(&self, session_name: &str, action: NamedAction, payload: &str) {
        let Some(session) = self
            .sessions
            .values()
            .into_iter()
            .find(|s| s.display_name() == session_name)
        else {
            warn!(session = session_name, ?action, "named action: session not found");
            return;
        };
        if !session.is_connected() {
            warn!(session = session_name, ?action, "named action: session not connected");
            return;
        }

        let client = session.client().as_ref();
        let result = match action {
            NamedAction::Leave => self.party.leave(client).await.map(|()| "left party".to_string()),
            NamedAction::Kick => self
                .party
                .kick(client, payload)
                .await
                .map(|name| format!("kicked {name}")),
            NamedAction::Promote => self
                .party
                .promote(client, payload)
                .await
                .map(|name| format!("promoted {name}")),
            NamedAction::Privacy => self
                .party
                .set_privacy(client, payload)
                .await
                .map(|privacy| format!("privacy set to {}", privacy.as_str())),
            NamedAction::Add => self
                .social
                .add_friend(client, payload)
                .await
                .map(|target| format!("friend request sent to {target}")),
        };

        match result {
            Ok(outcome) => info!(session = session_name, ?action, %outcome, "named action done"),
            Err(e) => warn!(session = session_name, ?action, "named action failed: {e}"),
        }
    }

    fn discard(&self, identifier: &str) {
        self.sessions.remove(identifier);
        self.echo_filters.remove(identifier);
    }

    #[cfg(test)]
    fn echo_filter_count(&self) -> usize {
        self.echo_filters.len()
    }
}

/// Per-session event loop: the fixed handler set attached at launch.
async fn run_session_events(
    session: Arc<Session>,
    mut events: broadcast::Receiver<SessionEvent>,
    router: Arc<CommandRouter>,
    echo: Arc<EchoFilter>,
    sessions: Registry<String, Arc<Session>>,
    echo_filters: Registry<String, Arc<EchoFilter>>,
) {
    let cancel = session.cancel_token().clone();
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(session = %session.display_name(), skipped, "event stream lagged");
                    continue;
                },
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        match event {
            SessionEvent::FriendRequest {
                account_id,
                display_name,
            } => {
                match session.client().social().accept_request(&account_id).await {
                    Ok(()) => {
                        info!(session = %session.display_name(), from = %display_name, "friend request accepted");
                    },
                    Err(e) => {
                        warn!(session = %session.display_name(), from = %display_name, "friend request accept failed: {e}");
                    },
                }
            },
            SessionEvent::PartyMemberJoined { member } => {
                if member.account_id == session.client().account_id() {
                    continue;
                }
                if let Err(e) = session.client().social().add(&member.display_name).await {
                    debug!(session = %session.display_name(), member = %member.display_name, "friend request to joining member failed: {e}");
                }
            },
            SessionEvent::PartyChat { author, body } => {
                router
                    .handle(session.client().as_ref(), &echo, InboundMessage {
                        transport: ChatTransport::Party,
                        author_id: &author.account_id,
                        author_name: &author.display_name,
                        body: &body,
                        message_id: None,
                    })
                    .await;
            },
            SessionEvent::Whisper {
                author,
                body,
                message_id,
            } => {
                router
                    .handle(session.client().as_ref(), &echo, InboundMessage {
                        transport: ChatTransport::Whisper,
                        author_id: &author.account_id,
                        author_name: &author.display_name,
                        body: &body,
                        message_id: Some(&message_id),
                    })
                    .await;
            },
            SessionEvent::Disconnected { reason } => {
                warn!(session = %session.display_name(), %reason, "session disconnected");
                session.set_state(ConnectionState::Disconnected);
                sessions.remove(session.identifier());
                echo_filters.remove(session.identifier());
                session.cancel_token().cancel();
                break;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use {
        lobbykit_actions::{CosmeticService, NullCatalog},
        lobbykit_client::{
            Friend, PartyMember,
            testing::{FakeConnector, FakeFriends, FakeSession},
        },
        lobbykit_commands::AdminRoster,
        lobbykit_common::DeviceAuth,
    };

    fn credential(identifier: &str, name: &str) -> AccountCredential {
        AccountCredential {
            identifier: identifier.to_string(),
            display_name: Some(name.to_string()),
            device_auth: DeviceAuth {
                device_id: "d".into(),
                account_id: format!("acct-{identifier}"),
                secret: "s".into(),
            },
        }
    }

    fn router() -> Arc<CommandRouter> {
        Arc::new(CommandRouter::new(
            '!',
            Arc::new(AdminRoster::new(vec!["Overseer".into()])),
            CosmeticService::new(Arc::new(NullCatalog)),
        ))
    }

    fn pool(connector: Arc<FakeConnector>) -> SessionPool {
        SessionPool::new(connector, router(), 900, Duration::from_secs(5))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn launch_is_idempotent_per_identifier() {
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());

        pool.launch(credential("a@x", "BotA")).await.unwrap_or_default();
        pool.launch(credential("a@x", "BotA")).await.unwrap_or_default();

        assert_eq!(pool.session_count(), 1);
        assert_eq!(connector.open_count("a@x"), 1, "second launch must not reopen");
    }

    #[tokio::test]
    async fn failed_login_leaves_nothing_registered() {
        let connector = FakeConnector::new();
        let session = FakeSession::new("acct-a@x", "BotA");
        session
            .fail_login
            .store(true, std::sync::atomic::Ordering::SeqCst);
        connector.prepare("a@x", session);

        let pool = pool(connector);
        let result = pool.launch(credential("a@x", "BotA")).await;

        assert!(matches!(result, Err(ActionError::RemoteOperation { .. })));
        assert_eq!(pool.session_count(), 0);
        assert_eq!(pool.echo_filter_count(), 0);
    }

    #[tokio::test]
    async fn failed_open_leaves_nothing_registered() {
        let connector = FakeConnector::new();
        connector.fail_open_for("a@x");

        let pool = pool(connector);
        assert!(pool.launch(credential("a@x", "BotA")).await.is_err());
        assert_eq!(pool.session_count(), 0);
    }

    #[tokio::test]
    async fn stop_clears_every_per_session_registry() {
        let connector = FakeConnector::new();
        let session = FakeSession::new("acct-a@x", "BotA");
        connector.prepare("a@x", session.clone());

        let pool = pool(connector);
        pool.launch(credential("a@x", "BotA")).await.unwrap_or_default();
        assert_eq!(pool.session_count(), 1);
        assert_eq!(pool.echo_filter_count(), 1);

        pool.stop("a@x").await.unwrap_or_default();
        assert_eq!(pool.session_count(), 0);
        assert_eq!(pool.echo_filter_count(), 0);
        assert!(session.logged_out.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stop_of_unknown_identifier_is_not_found() {
        let pool = pool(FakeConnector::new());
        let err = pool.stop("ghost@x").await;
        assert_eq!(err, Err(ActionError::not_found("ghost@x", "session")));
    }

    #[tokio::test]
    async fn launch_all_continues_past_failures() {
        let connector = FakeConnector::new();
        connector.fail_open_for("b@x");
        let pool = pool(connector.clone());

        pool.launch_all(
            vec![
                credential("a@x", "BotA"),
                credential("b@x", "BotB"),
                credential("c@x", "BotC"),
            ],
            Duration::ZERO,
        )
        .await;

        assert_eq!(pool.session_count(), 2);
        assert_eq!(connector.open_count("c@x"), 1, "batch must reach the tail");
    }

    async fn launch_with_friend_count(
        pool: &SessionPool,
        connector: &FakeConnector,
        identifier: &str,
        name: &str,
        friends: usize,
    ) -> Arc<FakeSession> {
        let session = FakeSession::new(format!("acct-{identifier}"), name);
        session.set_friends(FakeFriends::with_count(friends));
        connector.prepare(identifier, session.clone());
        pool.launch(credential(identifier, name)).await.unwrap_or_default();
        session
    }

    #[tokio::test]
    async fn selection_picks_fewest_friends_under_ceiling() {
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());

        launch_with_friend_count(&pool, &connector, "a@x", "BotA", 10).await;
        launch_with_friend_count(&pool, &connector, "b@x", "BotB", 905).await;
        launch_with_friend_count(&pool, &connector, "c@x", "BotC", 900).await;

        let best = pool.select_for_friend_request().ok();
        assert_eq!(best.map(|s| s.identifier().to_string()), Some("a@x".into()));
    }

    #[tokio::test]
    async fn selection_at_ceiling_is_excluded() {
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());

        launch_with_friend_count(&pool, &connector, "a@x", "BotA", 900).await;
        launch_with_friend_count(&pool, &connector, "b@x", "BotB", 905).await;

        assert_eq!(
            pool.select_for_friend_request().err(),
            Some(ActionError::CapacityExhausted)
        );
    }

    #[tokio::test]
    async fn selection_with_no_sessions_is_distinct_from_all_full() {
        let pool = pool(FakeConnector::new());
        assert_eq!(
            pool.select_for_friend_request().err(),
            Some(ActionError::NoSessionsAvailable)
        );
    }

    #[tokio::test]
    async fn selection_tie_breaks_on_identifier() {
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());

        launch_with_friend_count(&pool, &connector, "b@x", "BotB", 5).await;
        launch_with_friend_count(&pool, &connector, "a@x", "BotA", 5).await;

        for _ in 0..3 {
            let best = pool.select_for_friend_request().ok();
            assert_eq!(
                best.map(|s| s.identifier().to_string()),
                Some("a@x".into()),
                "tie-break must be deterministic"
            );
        }
    }

    #[tokio::test]
    async fn add_friend_routes_to_best_session() {
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());

        let light = launch_with_friend_count(&pool, &connector, "a@x", "BotA", 10).await;
        let heavy = launch_with_friend_count(&pool, &connector, "b@x", "BotB", 400).await;

        let outcome = pool.add_friend_on_best_session("NewPlayer").await;
        assert_eq!(outcome, FriendRouteOutcome::Success {
            session: "BotA".into()
        });

        let added = light.fake_friends();
        assert_eq!(
            added.added.lock().unwrap_or_else(|e| e.into_inner()).as_slice(),
            ["NewPlayer"]
        );
        assert!(
            heavy
                .fake_friends()
                .added
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_empty()
        );
    }

    #[tokio::test]
    async fn add_friend_reports_all_full_and_no_sessions_distinctly() {
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());
        assert_eq!(
            pool.add_friend_on_best_session("P").await,
            FriendRouteOutcome::NoSessions
        );

        launch_with_friend_count(&pool, &connector, "a@x", "BotA", 900).await;
        launch_with_friend_count(&pool, &connector, "b@x", "BotB", 950).await;
        launch_with_friend_count(&pool, &connector, "c@x", "BotC", 901).await;
        assert_eq!(
            pool.add_friend_on_best_session("P").await,
            FriendRouteOutcome::AllFull
        );
    }

    #[tokio::test]
    async fn add_friend_request_failure_is_an_error_not_capacity() {
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());

        let session = launch_with_friend_count(&pool, &connector, "a@x", "BotA", 10).await;
        session
            .fake_friends()
            .fail
            .store(true, std::sync::atomic::Ordering::SeqCst);

        let outcome = pool.add_friend_on_best_session("P").await;
        assert!(matches!(outcome, FriendRouteOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn remove_friend_sweeps_every_connected_session() {
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());

        let one = launch_with_friend_count(&pool, &connector, "a@x", "BotA", 0).await;
        let two = launch_with_friend_count(&pool, &connector, "b@x", "BotB", 0).await;
        for session in [&one, &two] {
            session.set_friends(FakeFriends::new(vec![Friend {
                account_id: "f-target".into(),
                display_name: "Target".into(),
            }]));
        }

        assert!(pool.remove_friend("target").await);
        for session in [&one, &two] {
            assert_eq!(
                session
                    .fake_friends()
                    .removed
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .as_slice(),
                ["f-target"]
            );
        }

        assert!(!pool.remove_friend("target").await, "already removed everywhere");
    }

    #[tokio::test]
    async fn named_action_dispatches_by_display_name() {
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());

        let session = launch_with_friend_count(&pool, &connector, "a@x", "BotA", 0).await;
        let party = lobbykit_client::testing::FakeParty::new(vec![PartyMember {
            account_id: "a-2".into(),
            display_name: "PlayerTwo".into(),
        }]);
        session.set_party(Some(party.clone()));

        pool.execute_named_action("BotA", NamedAction::Kick, "PlayerTwo").await;
        assert_eq!(party.recorded_ops(), vec!["kick:a-2"]);

        // Unknown session: logged, never panics.
        pool.execute_named_action("Ghost", NamedAction::Leave, "").await;
    }

    #[tokio::test]
    async fn named_action_parses_from_str() {
        assert_eq!("kick".parse::<NamedAction>(), Ok(NamedAction::Kick));
        assert_eq!("PRIVACY".parse::<NamedAction>(), Ok(NamedAction::Privacy));
        assert!("reboot".parse::<NamedAction>().is_err());
    }

    #[tokio::test]
    async fn inbound_friend_request_is_auto_accepted() {
        let connector = FakeConnector::new();
        let session = FakeSession::new("acct-a@x", "BotA");
        connector.prepare("a@x", session.clone());

        let pool = pool(connector);
        pool.launch(credential("a@x", "BotA")).await.unwrap_or_default();

        session.emit(SessionEvent::FriendRequest {
            account_id: "a-9".into(),
            display_name: "NewFriend".into(),
        });
        settle().await;

        assert_eq!(
            session
                .fake_friends()
                .accepted
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_slice(),
            ["a-9"]
        );
    }

    #[tokio::test]
    async fn joining_member_gets_a_friend_request_but_not_self() {
        let connector = FakeConnector::new();
        let session = FakeSession::new("acct-a@x", "BotA");
        connector.prepare("a@x", session.clone());

        let pool = pool(connector);
        pool.launch(credential("a@x", "BotA")).await.unwrap_or_default();

        session.emit(SessionEvent::PartyMemberJoined {
            member: PartyMember {
                account_id: "acct-a@x".into(),
                display_name: "BotA".into(),
            },
        });
        session.emit(SessionEvent::PartyMemberJoined {
            member: PartyMember {
                account_id: "a-9".into(),
                display_name: "Joiner".into(),
            },
        });
        settle().await;

        assert_eq!(
            session
                .fake_friends()
                .added
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_slice(),
            ["Joiner"]
        );
    }

    #[tokio::test]
    async fn party_chat_command_is_answered_on_party_chat() {
        let connector = FakeConnector::new();
        let session = FakeSession::new("acct-a@x", "BotA");
        connector.prepare("a@x", session.clone());

        let pool = pool(connector);
        pool.launch(credential("a@x", "BotA")).await.unwrap_or_default();

        session.emit(SessionEvent::PartyChat {
            author: PartyMember {
                account_id: "a-2".into(),
                display_name: "PlayerTwo".into(),
            },
            body: "!ping".into(),
        });
        settle().await;

        assert_eq!(session.sent_party_chat(), vec!["Pong!"]);
    }

    #[tokio::test]
    async fn disconnect_event_removes_session_from_pool() {
        let connector = FakeConnector::new();
        let session = FakeSession::new("acct-a@x", "BotA");
        connector.prepare("a@x", session.clone());

        let pool = pool(connector);
        pool.launch(credential("a@x", "BotA")).await.unwrap_or_default();
        assert_eq!(pool.session_count(), 1);

        session.emit(SessionEvent::Disconnected {
            reason: "socket closed".into(),
        });
        settle().await;

        assert_eq!(pool.session_count(), 0);
        assert_eq!(pool.echo_filter_count(), 0);
        assert_eq!(
            pool.select_for_friend_request().err(),
            Some(ActionError::NoSessionsAvailable)
        );
    }

    #[tokio::test]
    async fn end_to_end_capacity_scenario() {
        // Three sessions at 10/905/900: selection picks the 10. Pushing all
        // three to the ceiling flips routing to AllFull.
        let connector = FakeConnector::new();
        let pool = pool(connector.clone());

        let light = launch_with_friend_count(&pool, &connector, "a@x", "BotA", 10).await;
        launch_with_friend_count(&pool, &connector, "b@x", "BotB", 905).await;
        launch_with_friend_count(&pool, &connector, "c@x", "BotC", 900).await;

        let outcome = pool.add_friend_on_best_session("P").await;
        assert_eq!(outcome, FriendRouteOutcome::Success {
            session: "BotA".into()
        });

        light.set_friends(FakeFriends::with_count(900));
        assert_eq!(
            pool.add_friend_on_best_session("P").await,
            FriendRouteOutcome::AllFull
        );
    }
}
