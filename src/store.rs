use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, Result};

use crate::models::AuthTokens;

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Durable home of the credential pair, a small settings table in the
/// user's data directory.
pub struct CredentialStore {
    conn: Mutex<Connection>,
}

impl CredentialStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).ok();
        let db_path = data_dir.join("qna-console.db");
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// The stored pair, present only when both halves are.
    pub fn tokens(&self) -> Result<Option<AuthTokens>> {
        let access = self.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.get(REFRESH_TOKEN_KEY)?;
        Ok(match (access, refresh) {
            (Some(access), Some(refresh)) => Some(AuthTokens { access, refresh }),
            _ => None,
        })
    }

    pub fn save_tokens(&self, tokens: &AuthTokens) -> Result<()> {
        self.set(ACCESS_TOKEN_KEY, &tokens.access)?;
        self.set(REFRESH_TOKEN_KEY, &tokens.refresh)
    }

    pub fn clear_tokens(&self) -> Result<()> {
        self.delete(ACCESS_TOKEN_KEY)?;
        self.delete(REFRESH_TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn tokens_round_trip() {
        let (_dir, store) = store();
        assert!(store.tokens().unwrap().is_none());

        let tokens = AuthTokens {
            access: "acc".into(),
            refresh: "ref".into(),
        };
        store.save_tokens(&tokens).unwrap();
        assert_eq!(store.tokens().unwrap(), Some(tokens));

        store.clear_tokens().unwrap();
        assert!(store.tokens().unwrap().is_none());
    }

    #[test]
    fn half_a_pair_counts_as_absent() {
        let (_dir, store) = store();
        store.set("access_token", "acc").unwrap();
        assert!(store.tokens().unwrap().is_none());
    }

    #[test]
    fn set_overwrites() {
        let (_dir, store) = store();
        store.set("access_token", "old").unwrap();
        store.set("access_token", "new").unwrap();
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn reopening_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = CredentialStore::new(dir.path()).unwrap();
            store.set("access_token", "acc").unwrap();
        }
        let store = CredentialStore::new(dir.path()).unwrap();
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("acc"));
    }
}
