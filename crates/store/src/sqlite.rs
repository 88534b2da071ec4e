use std::str::FromStr;

use {
    async_trait::async_trait,
    sqlx::{
        Row,
        sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    },
    tracing::info,
};

use lobbykit_common::{AccountCredential, DeviceAuth, UserLink};

use crate::{CredentialStore, DEFAULT_LANGUAGE, Result};

/// SQLite-backed credential store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating the file and schema when missing) a store at `url`,
    /// e.g. `sqlite://lobbykit.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // An in-memory database lives and dies with its connection, so the
        // pool must never rotate connections there.
        let memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if memory { 1 } else { 4 });
        if memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        info!(url, "credential store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS accounts (
                identifier   TEXT PRIMARY KEY,
                display_name TEXT,
                device_id    TEXT NOT NULL,
                account_id   TEXT NOT NULL,
                secret       TEXT NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_links (
                user_id      TEXT PRIMARY KEY,
                display_name TEXT,
                device_id    TEXT,
                account_id   TEXT,
                secret       TEXT,
                language     TEXT NOT NULL DEFAULT 'en',
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn account_from_row(row: &SqliteRow) -> std::result::Result<AccountCredential, sqlx::Error> {
    Ok(AccountCredential {
        identifier: row.try_get("identifier")?,
        display_name: row.try_get("display_name")?,
        device_auth: DeviceAuth {
            device_id: row.try_get("device_id")?,
            account_id: row.try_get("account_id")?,
            secret: row.try_get("secret")?,
        },
    })
}

/// A user row only counts as a link once credentials are present; bare rows
/// exist when a language preference was set before login.
fn link_from_row(row: &SqliteRow) -> std::result::Result<Option<UserLink>, sqlx::Error> {
    let device_id: Option<String> = row.try_get("device_id")?;
    let account_id: Option<String> = row.try_get("account_id")?;
    let secret: Option<String> = row.try_get("secret")?;

    let (Some(device_id), Some(account_id), Some(secret)) = (device_id, account_id, secret) else {
        return Ok(None);
    };

    Ok(Some(UserLink {
        user_id: row.try_get("user_id")?,
        display_name: row
            .try_get::<Option<String>, _>("display_name")?
            .unwrap_or_default(),
        device_auth: DeviceAuth {
            device_id,
            account_id,
            secret,
        },
        language: row.try_get("language")?,
    }))
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn account(&self, identifier: &str) -> Result<Option<AccountCredential>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE identifier = ?")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn upsert_account(&self, credential: &AccountCredential) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts (identifier, display_name, device_id, account_id, secret)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(identifier) DO UPDATE SET
                display_name = excluded.display_name,
                device_id    = excluded.device_id,
                account_id   = excluded.account_id,
                secret       = excluded.secret",
        )
        .bind(&credential.identifier)
        .bind(&credential.display_name)
        .bind(&credential.device_auth.device_id)
        .bind(&credential.device_auth.account_id)
        .bind(&credential.device_auth.secret)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_account(&self, identifier: &str) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE identifier = ?")
            .bind(identifier)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<AccountCredential>> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY identifier")
            .fetch_all(&self.pool)
            .await?;
        let mut accounts = Vec::with_capacity(rows.len());
        for row in &rows {
            accounts.push(account_from_row(row)?);
        }
        Ok(accounts)
    }

    async fn user_link(&self, user_id: &str) -> Result<Option<UserLink>> {
        let row = sqlx::query("SELECT * FROM user_links WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(link_from_row(&row)?),
            None => Ok(None),
        }
    }

    /// Upsert the link's identity fields. The language column is left alone
    /// on conflict so a preference set before login survives it.
    async fn upsert_user_link(&self, link: &UserLink) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_links (user_id, display_name, device_id, account_id, secret, language)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                device_id    = excluded.device_id,
                account_id   = excluded.account_id,
                secret       = excluded.secret",
        )
        .bind(&link.user_id)
        .bind(&link.display_name)
        .bind(&link.device_auth.device_id)
        .bind(&link.device_auth.account_id)
        .bind(&link.device_auth.secret)
        .bind(&link.language)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_user_link(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM user_links WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_language(&self, user_id: &str, language: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_links (user_id, language) VALUES (?, ?)
             ON CONFLICT(user_id) DO UPDATE SET language = excluded.language",
        )
        .bind(user_id)
        .bind(language)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn language(&self, user_id: &str) -> Result<String> {
        let row = sqlx::query("SELECT language FROM user_links WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row.try_get("language")?),
            None => Ok(DEFAULT_LANGUAGE.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn credential(identifier: &str) -> AccountCredential {
        AccountCredential {
            identifier: identifier.to_string(),
            display_name: Some(format!("bot-{identifier}")),
            device_auth: DeviceAuth {
                device_id: "dev".into(),
                account_id: format!("acct-{identifier}"),
                secret: "s3cret".into(),
            },
        }
    }

    #[tokio::test]
    async fn account_round_trip() {
        let store = store().await;
        let cred = credential("a@example.com");
        store.upsert_account(&cred).await.unwrap();

        let loaded = store.account("a@example.com").await.unwrap().unwrap();
        assert_eq!(loaded, cred);
        assert!(store.account("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_account() {
        let store = store().await;
        let mut cred = credential("a@example.com");
        store.upsert_account(&cred).await.unwrap();

        cred.device_auth.secret = "rotated".into();
        store.upsert_account(&cred).await.unwrap();

        let loaded = store.account("a@example.com").await.unwrap().unwrap();
        assert_eq!(loaded.device_auth.secret, "rotated");
        assert_eq!(store.accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accounts_listed_in_identifier_order() {
        let store = store().await;
        for id in ["c@x", "a@x", "b@x"] {
            store.upsert_account(&credential(id)).await.unwrap();
        }
        let ids: Vec<String> = store
            .accounts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.identifier)
            .collect();
        assert_eq!(ids, vec!["a@x", "b@x", "c@x"]);
    }

    #[tokio::test]
    async fn delete_account_removes_row() {
        let store = store().await;
        store.upsert_account(&credential("a@x")).await.unwrap();
        store.delete_account("a@x").await.unwrap();
        assert!(store.account("a@x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_link_round_trip() {
        let store = store().await;
        let link = UserLink {
            user_id: "user-1".into(),
            display_name: "Player".into(),
            device_auth: DeviceAuth {
                device_id: "d".into(),
                account_id: "a".into(),
                secret: "s".into(),
            },
            language: "en".into(),
        };
        store.upsert_user_link(&link).await.unwrap();
        assert_eq!(store.user_link("user-1").await.unwrap().unwrap(), link);

        store.delete_user_link("user-1").await.unwrap();
        assert!(store.user_link("user-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn language_defaults_to_en() {
        let store = store().await;
        assert_eq!(store.language("nobody").await.unwrap(), "en");
    }

    #[tokio::test]
    async fn language_set_before_login_survives_link_upsert() {
        let store = store().await;
        store.set_language("user-1", "fr").await.unwrap();

        // A bare preference row is not a link yet.
        assert!(store.user_link("user-1").await.unwrap().is_none());

        let link = UserLink {
            user_id: "user-1".into(),
            display_name: "Player".into(),
            device_auth: DeviceAuth {
                device_id: "d".into(),
                account_id: "a".into(),
                secret: "s".into(),
            },
            language: "en".into(),
        };
        store.upsert_user_link(&link).await.unwrap();

        assert_eq!(store.language("user-1").await.unwrap(), "fr");
        let loaded = store.user_link("user-1").await.unwrap().unwrap();
        assert_eq!(loaded.language, "fr");
    }
}
