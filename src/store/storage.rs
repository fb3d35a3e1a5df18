use anyhow::Context;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
#[cfg(test)]
use std::collections::HashMap;

/// Keys of the three persisted collections. Subscribers filter on these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    Students,
    Payments,
    Fees,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 3] = [
        CollectionKey::Students,
        CollectionKey::Payments,
        CollectionKey::Fees,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKey::Students => "students",
            CollectionKey::Payments => "payments",
            CollectionKey::Fees => "fees",
        }
    }

    pub fn parse(name: &str) -> Option<CollectionKey> {
        CollectionKey::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// Key/value persistence for structured values.
///
/// Values are whole collections; callers read, modify and write them back.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;
    fn set(&mut self, key: &str, value: &serde_json::Value) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;

    fn contains(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-process storage for tests. Values are kept as serialized text, like browser local storage.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        match self.entries.get(key) {
            Some(text) => {
                let v = serde_json::from_str(text)
                    .with_context(|| format!("stored value for '{}' is not valid JSON", key))?;
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage backed by the `kv_entries` table of a workspace database.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let text: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv_entries WHERE key = ?", [key], |r| {
                r.get(0)
            })
            .optional()
            .with_context(|| format!("failed to read key '{}'", key))?;
        match text {
            Some(t) => {
                let v = serde_json::from_str(&t)
                    .with_context(|| format!("stored value for '{}' is not valid JSON", key))?;
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO kv_entries(key, value, updated_at) VALUES(?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value.to_string(), now),
            )
            .with_context(|| format!("failed to write key '{}'", key))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?", [key])
            .with_context(|| format!("failed to delete key '{}'", key))?;
        Ok(())
    }
}
