use std::sync::Arc;

use tracing::debug;

use {
    lobbykit_client::{PartySession, SessionClient},
    lobbykit_common::ActionError,
};

use crate::catalog::{self, CosmeticCatalog, CosmeticKind};

/// Keywords that clear the backpack instead of naming one.
const BACKPACK_CLEAR_KEYWORDS: &[&str] = &["none", "empty", "off", "clear"];

/// Outcome of a backpack command: applied a named cosmetic or cleared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackpackChange {
    Applied(String),
    Removed,
}

/// Cosmetic operations for one session: outfit, backpack, pickaxe, emote,
/// displayed level.
pub struct CosmeticService {
    catalog: Arc<dyn CosmeticCatalog>,
}

impl CosmeticService {
    pub fn new(catalog: Arc<dyn CosmeticCatalog>) -> Self {
        Self { catalog }
    }

    fn party(client: &dyn SessionClient) -> Result<Arc<dyn PartySession>, ActionError> {
        client.party().ok_or(ActionError::NoParty)
    }

    /// Alias table first, then the catalog; returns (cosmetic id, label to
    /// show the user).
    async fn resolve(
        &self,
        query: &str,
        kind: CosmeticKind,
    ) -> Result<(String, String), ActionError> {
        if let Some(id) = catalog::alias(query, kind) {
            return Ok((id.to_string(), query.trim().to_string()));
        }
        match self.catalog.search(query, kind).await {
            Ok(Some(item)) => Ok((item.id, item.name)),
            Ok(None) => Err(ActionError::not_found(query, kind.as_str())),
            Err(e) => Err(ActionError::remote(e)),
        }
    }

    pub async fn set_outfit(
        &self,
        client: &dyn SessionClient,
        query: &str,
    ) -> Result<String, ActionError> {
        if query.trim().is_empty() {
            return Err(ActionError::missing("name", "!skin <name>"));
        }
        let party = Self::party(client)?;
        let (id, label) = self.resolve(query, CosmeticKind::Outfit).await?;
        party.set_outfit(&id).await.map_err(ActionError::remote)?;
        debug!(session = %client.display_name(), cosmetic = %id, "outfit applied");
        Ok(label)
    }

    pub async fn set_backpack(
        &self,
        client: &dyn SessionClient,
        query: &str,
    ) -> Result<BackpackChange, ActionError> {
        if query.trim().is_empty() {
            return Err(ActionError::missing("name", "!backpack <name|none>"));
        }
        let party = Self::party(client)?;

        if BACKPACK_CLEAR_KEYWORDS.contains(&query.trim().to_lowercase().as_str()) {
            party.clear_backpack().await.map_err(ActionError::remote)?;
            return Ok(BackpackChange::Removed);
        }

        let (id, label) = self.resolve(query, CosmeticKind::Backpack).await?;
        party.set_backpack(&id).await.map_err(ActionError::remote)?;
        Ok(BackpackChange::Applied(label))
    }

    pub async fn set_pickaxe(
        &self,
        client: &dyn SessionClient,
        query: &str,
    ) -> Result<String, ActionError> {
        if query.trim().is_empty() {
            return Err(ActionError::missing("name", "!pickaxe <name>"));
        }
        let party = Self::party(client)?;
        let (id, label) = self.resolve(query, CosmeticKind::Pickaxe).await?;
        party.set_pickaxe(&id).await.map_err(ActionError::remote)?;
        Ok(label)
    }

    pub async fn set_emote(
        &self,
        client: &dyn SessionClient,
        query: &str,
    ) -> Result<String, ActionError> {
        if query.trim().is_empty() {
            return Err(ActionError::missing("name", "!emote <name>"));
        }
        let party = Self::party(client)?;
        let (id, label) = self.resolve(query, CosmeticKind::Emote).await?;
        party.set_emote(&id).await.map_err(ActionError::remote)?;
        Ok(label)
    }

    pub async fn clear_emote(&self, client: &dyn SessionClient) -> Result<(), ActionError> {
        let party = Self::party(client)?;
        party.clear_emote().await.map_err(ActionError::remote)
    }

    /// Set the displayed season level from user text.
    pub async fn set_level(
        &self,
        client: &dyn SessionClient,
        query: &str,
    ) -> Result<u32, ActionError> {
        if query.trim().is_empty() {
            return Err(ActionError::missing("level", "!level <number>"));
        }
        let level: u32 = query
            .trim()
            .parse()
            .ok()
            .filter(|l| *l >= 1)
            .ok_or_else(|| ActionError::invalid(query.trim()))?;
        let party = Self::party(client)?;
        party.set_level(level).await.map_err(ActionError::remote)?;
        Ok(level)
    }
}
