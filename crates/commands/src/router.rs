use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    lobbykit_actions::{BackpackChange, CosmeticService, PartyService, SocialService},
    lobbykit_client::SessionClient,
    lobbykit_common::{ActionError, ChatTransport},
};

use crate::{
    dedup::EchoFilter,
    render::{HELP_TEXT, render_error},
    roster::AdminRoster,
    verbs::Verb,
};

/// One inbound chat message, as handed over by the session event loop.
#[derive(Debug, Clone, Copy)]
pub struct InboundMessage<'a> {
    pub transport: ChatTransport,
    pub author_id: &'a str,
    pub author_name: &'a str,
    pub body: &'a str,
    /// Wire id of the message; present on whispers, used for echo filtering.
    pub message_id: Option<&'a str>,
}

/// Parses chat text into typed actions and renders the outcome back into at
/// most one reply.
///
/// Authorization policy: a failed admin check drops the command silently,
/// byte-for-byte identical to an unknown verb. Non-admins learn nothing from
/// trying.
pub struct CommandRouter {
    marker: char,
    roster: Arc<AdminRoster>,
    party: PartyService,
    social: SocialService,
    cosmetics: CosmeticService,
}

impl CommandRouter {
    pub fn new(marker: char, roster: Arc<AdminRoster>, cosmetics: CosmeticService) -> Self {
        Self {
            marker,
            roster,
            party: PartyService::new(),
            social: SocialService::new(),
            cosmetics,
        }
    }

    /// Full inbound pipeline: echo filter, ban screen, execute, reply.
    ///
    /// Reply delivery failures are logged and swallowed; they must never take
    /// the session's event loop down with them.
    pub async fn handle(
        &self,
        client: &dyn SessionClient,
        echo: &EchoFilter,
        msg: InboundMessage<'_>,
    ) {
        if msg.transport == ChatTransport::Whisper
            && let Some(id) = msg.message_id
            && echo.is_echo(id)
        {
            debug!(message_id = id, "ignoring echoed whisper");
            return;
        }

        if self.roster.is_banned(msg.author_name) {
            debug!(author = msg.author_name, "dropping message from banned author");
            return;
        }

        let Some(reply) = self.execute(client, msg.author_name, msg.body).await else {
            return;
        };

        match msg.transport {
            ChatTransport::Party => {
                if let Err(e) = client.send_party_chat(&reply).await {
                    warn!(session = %client.display_name(), "failed to send party reply: {e}");
                }
            },
            ChatTransport::Whisper => match client.send_whisper(msg.author_id, &reply).await {
                Ok(id) => echo.note(id),
                Err(e) => {
                    warn!(session = %client.display_name(), "failed to send whisper reply: {e}");
                },
            },
        }
    }

    /// Parse, authorize, dispatch, render. `None` means no reply: not a
    /// command, an unknown verb, or a failed admin check.
    pub async fn execute(
        &self,
        client: &dyn SessionClient,
        author_name: &str,
        body: &str,
    ) -> Option<String> {
        let rest = body.strip_prefix(self.marker)?;
        let mut tokens = rest.split_whitespace();
        let verb_token = tokens.next()?.to_lowercase();
        let verb = Verb::parse(&verb_token)?;
        let query = tokens.collect::<Vec<_>>().join(" ");

        if verb.requires_admin() && !self.roster.is_admin(author_name) {
            debug!(author = author_name, verb = %verb_token, "admin check failed, dropping");
            return None;
        }

        info!(
            session = %client.display_name(),
            verb = %verb_token,
            query = %query,
            author = author_name,
            "command received"
        );

        let result = self.dispatch(client, verb, &query).await;
        Some(match result {
            Ok(reply) => reply,
            Err(err) => render_error(&err),
        })
    }

    async fn dispatch(
        &self,
        client: &dyn SessionClient,
        verb: Verb,
        query: &str,
    ) -> Result<String, ActionError> {
        match verb {
            Verb::Outfit => self
                .cosmetics
                .set_outfit(client, query)
                .await
                .map(|label| format!("Outfit applied: {label}")),
            Verb::Backpack => {
                self.cosmetics
                    .set_backpack(client, query)
                    .await
                    .map(|change| match change {
                        BackpackChange::Applied(label) => format!("Backpack applied: {label}"),
                        BackpackChange::Removed => "Backpack removed.".to_string(),
                    })
            },
            Verb::Pickaxe => self
                .cosmetics
                .set_pickaxe(client, query)
                .await
                .map(|label| format!("Pickaxe applied: {label}")),
            Verb::Emote => self
                .cosmetics
                .set_emote(client, query)
                .await
                .map(|label| format!("Emote started: {label}")),
            Verb::StopEmote => self
                .cosmetics
                .clear_emote(client)
                .await
                .map(|()| "Emote stopped.".to_string()),
            Verb::Level => self
                .cosmetics
                .set_level(client, query)
                .await
                .map(|level| format!("Level set to {level}.")),
            Verb::Ready => self
                .party
                .set_ready(client, true)
                .await
                .map(|()| "Ready!".to_string()),
            Verb::Unready => self
                .party
                .set_ready(client, false)
                .await
                .map(|()| "Not ready.".to_string()),
            Verb::Leave => self
                .party
                .leave(client)
                .await
                .map(|()| "Left the party.".to_string()),
            Verb::Kick => self
                .party
                .kick(client, query)
                .await
                .map(|name| format!("{name} was kicked.")),
            Verb::Promote => self
                .party
                .promote(client, query)
                .await
                .map(|name| format!("{name} is now party leader.")),
            Verb::Privacy => self
                .party
                .set_privacy(client, query)
                .await
                .map(|privacy| format!("Party privacy set to {}.", privacy.as_str())),
            Verb::AddFriend => self
                .social
                .add_friend(client, query)
                .await
                .map(|target| format!("Friend request sent to {target}.")),
            Verb::Ban => {
                let target = query.trim();
                if target.is_empty() {
                    return Err(ActionError::missing("name", "!ban <name>"));
                }
                if self.roster.ban(target) {
                    Ok(format!("{target} is now banned."))
                } else {
                    Ok(format!("{target} is already banned."))
                }
            },
            Verb::Unban => {
                let target = query.trim();
                if target.is_empty() {
                    return Err(ActionError::missing("name", "!unban <name>"));
                }
                if self.roster.unban(target) {
                    Ok(format!("{target} is no longer banned."))
                } else {
                    Ok(format!("{target} was not banned."))
                }
            },
            Verb::Ping => Ok("Pong!".to_string()),
            Verb::Help => Ok(HELP_TEXT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use {
        lobbykit_actions::NullCatalog,
        lobbykit_client::{
            PartyMember,
            testing::{FakeParty, FakeSession},
        },
    };

    fn router_with_admins(admins: Vec<String>) -> CommandRouter {
        CommandRouter::new(
            '!',
            Arc::new(AdminRoster::new(admins)),
            CosmeticService::new(Arc::new(NullCatalog)),
        )
    }

    fn router() -> CommandRouter {
        router_with_admins(vec!["Overseer".into()])
    }

    fn session_with_party() -> (Arc<FakeSession>, Arc<FakeParty>) {
        let session = FakeSession::new("a-bot", "LobbyBot");
        let party = FakeParty::new(vec![
            PartyMember {
                account_id: "a-bot".into(),
                display_name: "LobbyBot".into(),
            },
            PartyMember {
                account_id: "a-2".into(),
                display_name: "PlayerTwo".into(),
            },
        ]);
        session.set_party(Some(party.clone()));
        (session, party)
    }

    #[tokio::test]
    async fn non_marker_input_produces_no_reply_and_no_side_effects() {
        let (session, party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "PlayerTwo", "hello there")
            .await;
        assert_eq!(reply, None);
        assert!(party.recorded_ops().is_empty());
    }

    #[tokio::test]
    async fn unknown_verb_is_silently_ignored() {
        let (session, _party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "PlayerTwo", "!nonsense abc")
            .await;
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn unknown_skin_renders_not_found_for_outfit() {
        let (session, _party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "PlayerTwo", "!skin none")
            .await;
        assert_eq!(reply, Some("No outfit found for \"none\".".into()));
    }

    #[tokio::test]
    async fn verbs_are_case_insensitive() {
        let (session, party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "PlayerTwo", "!SKIN drift")
            .await;
        assert_eq!(reply, Some("Outfit applied: drift".into()));
        assert_eq!(party.recorded_ops(), vec!["outfit:CID_165_Athena_Commando_M"]);
    }

    #[tokio::test]
    async fn admin_verb_from_non_admin_never_reaches_the_service() {
        let (session, party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "PlayerTwo", "!kick PlayerTwo")
            .await;
        assert_eq!(reply, None, "denial must look exactly like an unknown verb");
        assert!(party.recorded_ops().is_empty());
    }

    #[tokio::test]
    async fn admin_verb_from_admin_executes() {
        let (session, party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "Overseer", "!kick two")
            .await;
        assert_eq!(reply, Some("PlayerTwo was kicked.".into()));
        assert_eq!(party.recorded_ops(), vec!["kick:a-2"]);
    }

    #[tokio::test]
    async fn multi_word_argument_is_joined() {
        let (session, party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "PlayerTwo", "!skin renegade   raider")
            .await;
        assert_eq!(reply, Some("Outfit applied: renegade raider".into()));
        assert_eq!(party.recorded_ops(), vec!["outfit:CID_028_Athena_Commando_F"]);
    }

    #[tokio::test]
    async fn privacy_invalid_value_renders_invalid_argument() {
        let (session, _party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "Overseer", "!privacy open")
            .await;
        assert_eq!(reply, Some("\"open\" is not a value I recognize.".into()));
    }

    #[tokio::test]
    async fn ping_works_for_everyone() {
        let (session, _party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "PlayerTwo", "!ping")
            .await;
        assert_eq!(reply, Some("Pong!".into()));
    }

    #[tokio::test]
    async fn bare_marker_is_ignored() {
        let (session, _party) = session_with_party();
        assert_eq!(router().execute(session.as_ref(), "P", "!").await, None);
        assert_eq!(router().execute(session.as_ref(), "P", "! ").await, None);
    }

    #[tokio::test]
    async fn ban_then_message_from_banned_author_is_dropped() {
        let (session, _party) = session_with_party();
        let router = router();
        let echo = EchoFilter::default();

        let reply = router
            .execute(session.as_ref(), "Overseer", "!ban Griefer")
            .await;
        assert_eq!(reply, Some("Griefer is now banned.".into()));

        router
            .handle(session.as_ref(), &echo, InboundMessage {
                transport: ChatTransport::Party,
                author_id: "a-9",
                author_name: "Griefer",
                body: "!ping",
                message_id: None,
            })
            .await;
        assert!(session.sent_party_chat().is_empty());
    }

    #[tokio::test]
    async fn party_reply_goes_out_on_party_chat() {
        let (session, _party) = session_with_party();
        let echo = EchoFilter::default();
        router()
            .handle(session.as_ref(), &echo, InboundMessage {
                transport: ChatTransport::Party,
                author_id: "a-2",
                author_name: "PlayerTwo",
                body: "!ping",
                message_id: None,
            })
            .await;
        assert_eq!(session.sent_party_chat(), vec!["Pong!"]);
    }

    #[tokio::test]
    async fn whisper_reply_is_remembered_for_echo_suppression() {
        let (session, _party) = session_with_party();
        let echo = EchoFilter::default();
        let router = router();

        router
            .handle(session.as_ref(), &echo, InboundMessage {
                transport: ChatTransport::Whisper,
                author_id: "a-2",
                author_name: "PlayerTwo",
                body: "!ping",
                message_id: Some("in-1"),
            })
            .await;

        let sent = session.sent_whispers();
        assert_eq!(sent.len(), 1);
        let (to, reply, sent_id) = &sent[0];
        assert_eq!(to, "a-2");
        assert_eq!(reply, "Pong!");

        // The echoed copy of our own reply must be ignored.
        router
            .handle(session.as_ref(), &echo, InboundMessage {
                transport: ChatTransport::Whisper,
                author_id: "a-2",
                author_name: "PlayerTwo",
                body: reply,
                message_id: Some(sent_id),
            })
            .await;
        assert_eq!(session.sent_whispers().len(), 1, "echo must not be processed");
    }

    #[tokio::test]
    async fn reply_delivery_failure_is_swallowed() {
        let (session, _party) = session_with_party();
        session
            .fail_send
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let echo = EchoFilter::default();

        // Must not panic or propagate.
        router()
            .handle(session.as_ref(), &echo, InboundMessage {
                transport: ChatTransport::Whisper,
                author_id: "a-2",
                author_name: "PlayerTwo",
                body: "!ping",
                message_id: Some("in-1"),
            })
            .await;
        assert!(session.sent_whispers().is_empty());
        assert!(echo.is_empty(), "failed sends leave no echo entry");
    }

    #[tokio::test]
    async fn help_lists_every_public_verb() {
        let (session, _party) = session_with_party();
        let reply = router()
            .execute(session.as_ref(), "PlayerTwo", "!help")
            .await
            .unwrap_or_default();
        for verb in ["!skin", "!backpack", "!pickaxe", "!emote", "!ready", "!ping"] {
            assert!(reply.contains(verb), "help is missing {verb}");
        }
    }
}
