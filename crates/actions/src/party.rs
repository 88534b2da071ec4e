use std::sync::Arc;

use tracing::debug;

use {
    lobbykit_client::{PartyMember, PartyPrivacy, PartySession, SessionClient},
    lobbykit_common::ActionError,
};

/// Party/lobby operations for one session.
#[derive(Default)]
pub struct PartyService;

impl PartyService {
    pub fn new() -> Self {
        Self
    }

    fn party(client: &dyn SessionClient) -> Result<Arc<dyn PartySession>, ActionError> {
        client.party().ok_or(ActionError::NoParty)
    }

    /// Case-insensitive substring match over the current members.
    fn find_member(
        party: &dyn PartySession,
        query: &str,
    ) -> Result<PartyMember, ActionError> {
        let needle = query.to_lowercase();
        party
            .members()
            .into_iter()
            .find(|m| m.display_name.to_lowercase().contains(&needle))
            .ok_or_else(|| ActionError::not_found(query, "member"))
    }

    pub async fn leave(&self, client: &dyn SessionClient) -> Result<(), ActionError> {
        let party = Self::party(client)?;
        party.leave().await.map_err(ActionError::remote)?;
        debug!(session = %client.display_name(), "left party");
        Ok(())
    }

    /// Kick a member by (partial) display name; returns the kicked member's
    /// full display name.
    pub async fn kick(
        &self,
        client: &dyn SessionClient,
        query: &str,
    ) -> Result<String, ActionError> {
        if query.trim().is_empty() {
            return Err(ActionError::missing("name", "!kick <name>"));
        }
        let party = Self::party(client)?;
        let member = Self::find_member(party.as_ref(), query)?;
        if member.account_id == client.account_id() {
            return Err(ActionError::SelfAction {
                action: "kick".into(),
            });
        }
        party
            .kick(&member.account_id)
            .await
            .map_err(ActionError::remote)?;
        Ok(member.display_name)
    }

    /// Promote a member to party leader; returns their full display name.
    pub async fn promote(
        &self,
        client: &dyn SessionClient,
        query: &str,
    ) -> Result<String, ActionError> {
        if query.trim().is_empty() {
            return Err(ActionError::missing("name", "!promote <name>"));
        }
        let party = Self::party(client)?;
        let member = Self::find_member(party.as_ref(), query)?;
        party
            .promote(&member.account_id)
            .await
            .map_err(ActionError::remote)?;
        Ok(member.display_name)
    }

    /// Set party privacy from user text; returns the applied level.
    pub async fn set_privacy(
        &self,
        client: &dyn SessionClient,
        value: &str,
    ) -> Result<PartyPrivacy, ActionError> {
        if value.trim().is_empty() {
            return Err(ActionError::missing(
                "level",
                "!privacy <public|friends|private>",
            ));
        }
        let party = Self::party(client)?;
        let privacy: PartyPrivacy = value
            .trim()
            .parse()
            .map_err(|()| ActionError::invalid(value.trim()))?;
        party
            .set_privacy(privacy)
            .await
            .map_err(ActionError::remote)?;
        Ok(privacy)
    }

    pub async fn set_ready(
        &self,
        client: &dyn SessionClient,
        ready: bool,
    ) -> Result<(), ActionError> {
        let party = Self::party(client)?;
        party.set_ready(ready).await.map_err(ActionError::remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobbykit_client::testing::{FakeParty, FakeSession};

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
    async fn leave_requires_party() {
        let session = FakeSession::new("a-bot", "LobbyBot");
        let err = PartyService::new().leave(session.as_ref()).await;
        assert_eq!(err, Err(ActionError::NoParty));
    }

    #[tokio::test]
    async fn kick_matches_member_by_substring() {
        let (session, party) = session_with_party();
        let name = PartyService::new()
            .kick(session.as_ref(), "playertwo")
            .await
            .unwrap_or_default();
        assert_eq!(name, "PlayerTwo");
        assert_eq!(party.recorded_ops(), vec!["kick:a-2"]);
    }

    #[tokio::test]
    async fn kick_partial_match() {
        let (session, _party) = session_with_party();
        let name = PartyService::new()
            .kick(session.as_ref(), "two")
            .await
            .unwrap_or_default();
        assert_eq!(name, "PlayerTwo");
    }

    #[tokio::test]
    async fn kick_self_is_rejected() {
        let (session, party) = session_with_party();
        let err = PartyService::new().kick(session.as_ref(), "LobbyBot").await;
        assert_eq!(
            err,
            Err(ActionError::SelfAction {
                action: "kick".into()
            })
        );
        assert!(party.recorded_ops().is_empty());
    }

    #[tokio::test]
    async fn kick_unknown_member_is_not_found() {
        let (session, _party) = session_with_party();
        let err = PartyService::new().kick(session.as_ref(), "Nobody").await;
        assert_eq!(err, Err(ActionError::not_found("Nobody", "member")));
    }

    #[tokio::test]
    async fn kick_without_query_reports_usage() {
        let (session, _party) = session_with_party();
        let err = PartyService::new().kick(session.as_ref(), "  ").await;
        assert!(matches!(err, Err(ActionError::MissingParameter { .. })));
    }

    #[tokio::test]
    async fn privacy_parses_and_applies() {
        let (session, party) = session_with_party();
        let applied = PartyService::new()
            .set_privacy(session.as_ref(), "friends")
            .await;
        assert_eq!(applied, Ok(PartyPrivacy::Friends));
        assert_eq!(party.recorded_ops(), vec!["privacy:Friends"]);
    }

    #[tokio::test]
    async fn privacy_rejects_unknown_level() {
        let (session, _party) = session_with_party();
        let err = PartyService::new()
            .set_privacy(session.as_ref(), "open")
            .await;
        assert_eq!(err, Err(ActionError::invalid("open")));
    }

    #[tokio::test]
    async fn remote_failure_maps_to_remote_operation() {
        let (session, party) = session_with_party();
        party.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = PartyService::new().leave(session.as_ref()).await;
        assert!(matches!(err, Err(ActionError::RemoteOperation { .. })));
    }

    #[tokio::test]
    async fn ready_toggles_through_party() {
        let (session, party) = session_with_party();
        PartyService::new()
            .set_ready(session.as_ref(), true)
            .await
            .unwrap_or_default();
        PartyService::new()
            .set_ready(session.as_ref(), false)
            .await
            .unwrap_or_default();
        assert_eq!(party.recorded_ops(), vec!["ready:true", "ready:false"]);
    }
}
