use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PREFERENCES_KEY: &str = "preferences";
pub const FEEDBACK_LOG_KEY: &str = "feedback_log";
pub const SAVED_KEY: &str = "saved";
pub const RESULTS_KEY: &str = "results";
pub const SOURCES_KEY: &str = "sources";

const UPSERT: &str = "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

/// Key-value store of JSON blobs, backed by SQLite.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let store = Self { conn, path };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobscout") {
            proj_dirs.data_dir().join("jobscout.db")
        } else {
            PathBuf::from("jobscout.db")
        }
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize '{}'", key))?;
        self.conn.execute(UPSERT, params![key, json])?;
        debug!(key, bytes = json.len(), "saved");
        Ok(())
    }

    /// Writes several keys in one transaction: either all land or none do.
    pub fn save_all(&self, entries: &[(&str, serde_json::Value)]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute(UPSERT, params![key, value.to_string()])?;
        }
        tx.commit()?;
        debug!(keys = entries.len(), "saved batch");
        Ok(())
    }

    /// Strict load for read-modify-write paths. A missing key is `Ok(None)`;
    /// a stored value that does not parse is an error, so callers never
    /// overwrite data they could not read.
    pub fn load_existing<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to read '{}'", key))?;
        raw.map(|raw| {
            serde_json::from_str(&raw)
                .with_context(|| format!("Stored '{}' is malformed; refusing to overwrite it", key))
        })
        .transpose()
    }

    /// Best-effort load. Anything missing or unreadable yields `fallback`.
    pub fn load<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let raw: Option<String> = match self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "failed to read stored value, using default");
                return fallback;
            }
        };

        let Some(raw) = raw else {
            debug!(key, "no stored value, using default");
            return fallback;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "stored value is malformed, using default");
                fallback
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: &str, raw: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, raw],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::Preferences;

    #[test]
    fn test_load_missing_key_returns_fallback() {
        let store = Store::open_in_memory().unwrap();
        let value: Vec<String> = store.load("nothing", vec!["default".to_string()]);
        assert_eq!(value, vec!["default".to_string()]);
    }

    #[test]
    fn test_save_then_load_overwrites() {
        let store = Store::open_in_memory().unwrap();
        store.save("count", &1).unwrap();
        store.save("count", &2).unwrap();
        assert_eq!(store.load("count", 0), 2);
    }

    #[test]
    fn test_malformed_value_falls_back_silently() {
        let store = Store::open_in_memory().unwrap();
        store.put_raw(PREFERENCES_KEY, "{not json").unwrap();
        let prefs = store.load(PREFERENCES_KEY, Preferences::default());
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_wrong_shape_falls_back() {
        let store = Store::open_in_memory().unwrap();
        store.save("numbers", &"a string").unwrap();
        let value: Vec<i32> = store.load("numbers", vec![7]);
        assert_eq!(value, vec![7]);
    }

    #[test]
    fn test_load_existing_tells_missing_from_malformed() {
        let store = Store::open_in_memory().unwrap();
        let missing: Option<Vec<i32>> = store.load_existing("numbers").unwrap();
        assert!(missing.is_none());

        store.save("numbers", &vec![1, 2]).unwrap();
        assert_eq!(store.load_existing::<Vec<i32>>("numbers").unwrap(), Some(vec![1, 2]));

        store.put_raw("numbers", "garbage-not-a-list").unwrap();
        assert!(store.load_existing::<Vec<i32>>("numbers").is_err());
    }

    #[test]
    fn test_save_all_writes_every_key() {
        let store = Store::open_in_memory().unwrap();
        store.save("a", &0).unwrap();
        store
            .save_all(&[("a", serde_json::json!(1)), ("b", serde_json::json!(["x"]))])
            .unwrap();
        assert_eq!(store.load("a", 0), 1);
        assert_eq!(store.load("b", Vec::<String>::new()), vec!["x".to_string()]);
    }

    #[test]
    fn test_open_file_persists_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobscout.db");
        {
            let store = Store::open(Some(&path)).unwrap();
            store.save("greeting", "hello").unwrap();
        }
        let store = Store::open(Some(&path)).unwrap();
        assert_eq!(store.load("greeting", String::new()), "hello");
        assert_eq!(store.path(), &path);
    }
}
