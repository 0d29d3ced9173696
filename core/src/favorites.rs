//! Persisted set of favorite character ids.
//!
//! Every operation is synchronous and idempotent. Write failures are
//! returned to the caller; whether they are swallowed is decided one layer
//! up by the repository's `StorageFailurePolicy`.

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::StorageError;
use crate::types::{CharacterId, FavoriteRecord};

const FAVORITES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS favorite_characters (
  id INTEGER PRIMARY KEY
);
"#;

/// Storage backend for favorite ids.
pub trait FavoritesStore {
    /// Mark `id` as a favorite. Adding an existing id is a no-op that
    /// returns the existing record.
    fn add(&mut self, id: CharacterId) -> Result<FavoriteRecord, StorageError>;

    /// Unmark `id`. Removing an absent id is a no-op.
    fn remove(&mut self, id: CharacterId) -> Result<(), StorageError>;

    fn contains(&self, id: CharacterId) -> Result<bool, StorageError>;

    /// Snapshot of every favorite id, ascending.
    fn all_ids(&self) -> Result<Vec<CharacterId>, StorageError>;
}

/// SQLite-backed store; one row per favorite id.
#[derive(Debug)]
pub struct SqliteFavoritesStore {
    conn: Connection,
}

impl SqliteFavoritesStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(FAVORITES_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl FavoritesStore for SqliteFavoritesStore {
    fn add(&mut self, id: CharacterId) -> Result<FavoriteRecord, StorageError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO favorite_characters (id) VALUES (?1)",
            params![i64::from(id.0)],
        )?;
        Ok(FavoriteRecord { character_id: id })
    }

    fn remove(&mut self, id: CharacterId) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM favorite_characters WHERE id = ?1",
            params![i64::from(id.0)],
        )?;
        Ok(())
    }

    fn contains(&self, id: CharacterId) -> Result<bool, StorageError> {
        let found = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM favorite_characters WHERE id = ?1)",
            params![i64::from(id.0)],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(found)
    }

    fn all_ids(&self) -> Result<Vec<CharacterId>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM favorite_characters ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, u32>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(CharacterId(row?));
        }
        Ok(ids)
    }
}

/// Non-persistent store for ephemeral sessions and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFavoritesStore {
    ids: BTreeSet<CharacterId>,
}

impl InMemoryFavoritesStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<CharacterId> for InMemoryFavoritesStore {
    fn from_iter<I: IntoIterator<Item = CharacterId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl FavoritesStore for InMemoryFavoritesStore {
    fn add(&mut self, id: CharacterId) -> Result<FavoriteRecord, StorageError> {
        self.ids.insert(id);
        Ok(FavoriteRecord { character_id: id })
    }

    fn remove(&mut self, id: CharacterId) -> Result<(), StorageError> {
        self.ids.remove(&id);
        Ok(())
    }

    fn contains(&self, id: CharacterId) -> Result<bool, StorageError> {
        Ok(self.ids.contains(&id))
    }

    fn all_ids(&self) -> Result<Vec<CharacterId>, StorageError> {
        Ok(self.ids.iter().copied().collect())
    }
}
