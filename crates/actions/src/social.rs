use tracing::debug;

use {lobbykit_client::SessionClient, lobbykit_common::ActionError};

/// Friends-list operations for one session.
#[derive(Default)]
pub struct SocialService;

impl SocialService {
    pub fn new() -> Self {
        Self
    }

    /// Send a friend request by display name; returns the target name.
    pub async fn add_friend(
        &self,
        client: &dyn SessionClient,
        query: &str,
    ) -> Result<String, ActionError> {
        let target = query.trim();
        if target.is_empty() {
            return Err(ActionError::missing("name", "!add <name>"));
        }
        client
            .social()
            .add(target)
            .await
            .map_err(ActionError::remote)?;
        debug!(session = %client.display_name(), friend = target, "friend request sent");
        Ok(target.to_string())
    }

    /// Remove an existing friend by exact (case-insensitive) display name;
    /// returns the removed friend's display name.
    pub async fn remove_friend(
        &self,
        client: &dyn SessionClient,
        query: &str,
    ) -> Result<String, ActionError> {
        let target = query.trim();
        if target.is_empty() {
            return Err(ActionError::missing("name", "!remove <name>"));
        }
        let social = client.social();
        let friend = social
            .friends()
            .into_iter()
            .find(|f| f.display_name.eq_ignore_ascii_case(target))
            .ok_or_else(|| ActionError::not_found(target, "friend"))?;
        social
            .remove(&friend.account_id)
            .await
            .map_err(ActionError::remote)?;
        Ok(friend.display_name)
    }
}
