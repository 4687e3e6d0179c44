use chrono::Utc;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::challenge::{Challenge, ProgressRecord};
use crate::challenge_store::ChallengeStore;
use crate::error::StoreError;
use crate::ledger::{Ledger, LedgerSnapshot};
use crate::store::SubscriptionId;

pub const CHALLENGES_KEY: &str = "challenges";
pub const LEDGER_KEY: &str = "ledger";

/// String key-value storage backing the catalog progress and the ledger
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// SQLite-backed key-value store
#[derive(Debug)]
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// In-process store, handy for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Seed a store from `catalog` and layer persisted progress on top
pub fn load_challenges<K: KeyValueStore + ?Sized>(
    kv: &K,
    catalog: Vec<Challenge>,
) -> Result<ChallengeStore, StoreError> {
    let mut store = ChallengeStore::new(catalog);
    if let Some(json) = kv.get(CHALLENGES_KEY)? {
        let records: Vec<ProgressRecord> = serde_json::from_str(&json)?;
        store.apply_progress(&records);
    }
    Ok(store)
}

pub fn save_challenges<K: KeyValueStore + ?Sized>(
    kv: &K,
    challenges: &[Challenge],
) -> Result<(), StoreError> {
    let records: Vec<ProgressRecord> = challenges.iter().map(ProgressRecord::from).collect();
    kv.set(CHALLENGES_KEY, &serde_json::to_string(&records)?)
}

pub fn load_ledger<K: KeyValueStore + ?Sized>(kv: &K) -> Result<Ledger, StoreError> {
    match kv.get(LEDGER_KEY)? {
        Some(json) => Ok(Ledger::from_snapshot(serde_json::from_str(&json)?)),
        None => Ok(Ledger::new()),
    }
}

pub fn save_ledger<K: KeyValueStore + ?Sized>(
    kv: &K,
    snapshot: &LedgerSnapshot,
) -> Result<(), StoreError> {
    kv.set(LEDGER_KEY, &serde_json::to_string(snapshot)?)
}

/// Write both stores through to `kv` on every change. Failures are logged and
/// never reach the caller that mutated the store.
pub fn autosave<K: KeyValueStore + 'static>(
    kv: Rc<K>,
    challenges: &mut ChallengeStore,
    ledger: &mut Ledger,
) -> (SubscriptionId, SubscriptionId) {
    let kv_challenges = Rc::clone(&kv);
    let challenges_sub = challenges.subscribe(move |list| {
        if let Err(e) = save_challenges(kv_challenges.as_ref(), list) {
            warn!("failed to persist challenge progress: {e}");
        }
    });
    let ledger_sub = ledger.subscribe(move |snapshot| {
        if let Err(e) = save_ledger(kv.as_ref(), snapshot) {
            warn!("failed to persist ledger: {e}");
        }
    });
    (challenges_sub, ledger_sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::Difficulty;
    use tempfile::tempdir;

    fn catalog() -> Vec<Challenge> {
        vec![
            Challenge::new("a", "Alpha", Difficulty::Easy, 60.0, 10),
            Challenge::new("b", "Beta", Difficulty::Medium, 90.0, 20),
        ]
    }

    #[test]
    fn sqlite_kv_set_get_remove() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
        kv.set("k", "one").unwrap();
        kv.set("k", "two").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("two"));
        kv.remove("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
    }

    #[test]
    fn sqlite_kv_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("encore.db");
        SqliteKv::open(&path).unwrap().set("x", "1").unwrap();
        let reopened = SqliteKv::open(&path).unwrap();
        assert_eq!(reopened.get("x").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn empty_store_loads_fresh_state() {
        let kv = MemoryKv::new();
        let store = load_challenges(&kv, catalog()).unwrap();
        let ledger = load_ledger(&kv).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(ledger.total_points(), 0);
    }

    #[test]
    fn autosave_writes_on_every_mutation() {
        let kv = Rc::new(MemoryKv::new());
        let mut store = ChallengeStore::new(catalog());
        let mut ledger = Ledger::new();
        autosave(Rc::clone(&kv), &mut store, &mut ledger);

        store.set_progress(&"a".into(), 40.0);
        store.set_completed(&"b".into());
        ledger.award(&"b".into(), 20);

        let restored_store = load_challenges(kv.as_ref(), catalog()).unwrap();
        let restored_ledger = load_ledger(kv.as_ref()).unwrap();
        assert_eq!(restored_store.get(&"a".into()).unwrap().progress, 40.0);
        assert!(restored_store.get(&"b".into()).unwrap().completed);
        assert_eq!(restored_ledger.total_points(), 20);
        assert!(restored_ledger.is_completed(&"b".into()));
    }

    #[test]
    fn corrupt_ledger_is_reported() {
        let kv = MemoryKv::new();
        kv.set(LEDGER_KEY, "[1,2").unwrap();
        assert!(matches!(load_ledger(&kv), Err(StoreError::Json(_))));
    }
}
