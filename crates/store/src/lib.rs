//! Durable credential and preference storage.
//!
//! A deliberately narrow surface: get/upsert/delete for pool account
//! credentials and end-user links, plus the language preference. Nothing else
//! in the system talks SQL.

pub mod sqlite;

use {async_trait::async_trait, lobbykit_common::{AccountCredential, UserLink}};

pub use sqlite::SqliteStore;

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Key-value style access to durable credentials.
///
/// Account credentials (pool-operated bots) and user links (end users who
/// completed the auth flow) live in separate tables and are never touched by
/// the same component: the pool reads accounts, the auth flow writes links.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn account(&self, identifier: &str) -> Result<Option<AccountCredential>>;
    async fn upsert_account(&self, credential: &AccountCredential) -> Result<()>;
    async fn delete_account(&self, identifier: &str) -> Result<()>;
    /// All stored pool accounts, ordered by identifier for stable launches.
    async fn accounts(&self) -> Result<Vec<AccountCredential>>;

    async fn user_link(&self, user_id: &str) -> Result<Option<UserLink>>;
    async fn upsert_user_link(&self, link: &UserLink) -> Result<()>;
    async fn delete_user_link(&self, user_id: &str) -> Result<()>;

    /// Set the preferred language, creating a bare row when the user has no
    /// link yet.
    async fn set_language(&self, user_id: &str, language: &str) -> Result<()>;
    /// Preferred language, `"en"` when unset or unknown.
    async fn language(&self, user_id: &str) -> Result<String>;
}
