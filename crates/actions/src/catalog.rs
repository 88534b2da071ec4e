//! Cosmetic name resolution.
//!
//! Lookup ladder: exact alias table first, then the external catalog search
//! service constrained by cosmetic type. The alias table covers the names
//! people actually type; everything else is the catalog's problem.

use std::collections::HashMap;

use {async_trait::async_trait, once_cell::sync::Lazy};

/// Cosmetic categories the game service recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CosmeticKind {
    Outfit,
    Backpack,
    Pickaxe,
    Emote,
}

impl CosmeticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outfit => "outfit",
            Self::Backpack => "backpack",
            Self::Pickaxe => "pickaxe",
            Self::Emote => "emote",
        }
    }
}

impl std::fmt::Display for CosmeticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved cosmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmeticItem {
    pub id: String,
    pub name: String,
    pub kind: CosmeticKind,
}

/// External catalog search, constrained by cosmetic type.
///
/// Implementations live outside this crate (REST lookups are not core);
/// `Ok(None)` means the catalog genuinely has no match, errors mean the
/// lookup itself failed.
#[async_trait]
pub trait CosmeticCatalog: Send + Sync {
    async fn search(&self, query: &str, kind: CosmeticKind) -> anyhow::Result<Option<CosmeticItem>>;
}

/// Catalog that never finds anything. Default wiring until a real search
/// backend is configured; alias-table hits still work.
pub struct NullCatalog;

#[async_trait]
impl CosmeticCatalog for NullCatalog {
    async fn search(
        &self,
        _query: &str,
        _kind: CosmeticKind,
    ) -> anyhow::Result<Option<CosmeticItem>> {
        Ok(None)
    }
}

static OUTFIT_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("renegade", "CID_028_Athena_Commando_F"),
        ("renegade raider", "CID_028_Athena_Commando_F"),
        ("ghoul", "CID_029_Athena_Commando_F_Halloween"),
        ("ghoul trooper", "CID_029_Athena_Commando_F_Halloween"),
        ("skull", "CID_030_Athena_Commando_M_Halloween"),
        ("skull trooper", "CID_030_Athena_Commando_M_Halloween"),
        ("aerial", "CID_175_Athena_Commando_F_PurpleSkull"),
        ("galaxy", "CID_175_Athena_Commando_M_Celestial"),
        ("drift", "CID_165_Athena_Commando_M"),
        ("calamity", "CID_164_Athena_Commando_F"),
        ("lynx", "CID_315_Athena_Commando_F_StreetRacer"),
        ("omega", "CID_139_Athena_Commando_M_Celestial"),
        ("ragnarok", "CID_114_Athena_Commando_M_RagsToRiches"),
        ("default", "CID_001_Athena_Commando_F_Default"),
    ])
});

static BACKPACK_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("wings", "BID_044_Halloween"),
        ("dragon", "BID_005_TealDragon"),
        ("ghost", "BID_029_Halloween"),
        ("raven", "BID_030_RavenWings"),
        ("drift", "BID_141_DriftNeoLightning"),
    ])
});

static PICKAXE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("reaper", "Pickaxe_ID_018_Halloween"),
        ("scythe", "Pickaxe_ID_018_Halloween"),
        ("rainbow", "Pickaxe_ID_017_Rainbow"),
        ("raider", "Pickaxe_ID_027_Silver"),
        ("default", "DefaultPickaxe"),
    ])
});

static EMOTE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("floss", "EID_Floss"),
        ("take the l", "EID_TakeTheL"),
        ("wave", "EID_Wave"),
        ("dance", "EID_DanceMoves"),
        ("default", "EID_DanceMoves"),
    ])
});

/// Exact (case-insensitive) alias lookup.
pub fn alias(query: &str, kind: CosmeticKind) -> Option<&'static str> {
    let table = match kind {
        CosmeticKind::Outfit => &OUTFIT_ALIASES,
        CosmeticKind::Backpack => &BACKPACK_ALIASES,
        CosmeticKind::Pickaxe => &PICKAXE_ALIASES,
        CosmeticKind::Emote => &EMOTE_ALIASES,
    };
    table.get(query.to_lowercase().trim()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_lookup_is_case_insensitive() {
        assert_eq!(
            alias("Renegade Raider", CosmeticKind::Outfit),
            Some("CID_028_Athena_Commando_F")
        );
        assert_eq!(
            alias("  SKULL  ", CosmeticKind::Outfit),
            Some("CID_030_Athena_Commando_M_Halloween")
        );
    }

    #[test]
    fn alias_is_kind_scoped() {
        // "drift" exists as both an outfit and a backpack.
        assert_eq!(
            alias("drift", CosmeticKind::Outfit),
            Some("CID_165_Athena_Commando_M")
        );
        assert_eq!(
            alias("drift", CosmeticKind::Backpack),
            Some("BID_141_DriftNeoLightning")
        );
        assert_eq!(alias("drift", CosmeticKind::Pickaxe), None);
    }

    #[test]
    fn unknown_alias_is_none() {
        assert_eq!(alias("no such thing", CosmeticKind::Emote), None);
    }

    #[tokio::test]
    async fn null_catalog_finds_nothing() {
        let found = NullCatalog
            .search("anything", CosmeticKind::Outfit)
            .await
            .unwrap_or_default();
        assert!(found.is_none());
    }
}
