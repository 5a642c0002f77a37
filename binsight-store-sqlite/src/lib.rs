//! SQLite-backed [`ItemStore`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use tokio::task::{JoinError, spawn_blocking};
use tracing::{debug, info};

use binsight_core::{
    model::{Category, Item, NewItem},
    ports::{ItemStore, PortError},
};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL CHECK (category IN ('Trash', 'Compost', 'Recycling')),
    description TEXT NOT NULL,
    url TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

const ITEM_COLUMNS: &str = "id, category, description, url, created_at";

#[derive(thiserror::Error, Debug)]
/// Errors raised by the SQLite store.
pub enum StoreError {
    /// SQLite reported an error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The blocking worker panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Join(#[from] JoinError),
    /// Another task panicked while holding the connection.
    #[error("Connection lock poisoned")]
    Poisoned,
    /// A stored row could not be mapped back to an item.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for PortError {
    fn from(err: StoreError) -> Self {
        PortError::Storage(err.to_string())
    }
}

/// Item store keeping rows in a single SQLite database.
pub struct SqliteItemStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteItemStore {
    /// Open (or create) a database file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let is_new = !path.exists();
        let conn = Connection::open(path)?;

        if is_new {
            info!(path = %path.display(), "database created");
        } else {
            info!(path = %path.display(), "database opened");
        }

        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Number of stored items.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the query fails.
    pub async fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
            u64::try_from(count).map_err(|err| StoreError::Corrupt(err.to_string()))
        })
        .await
    }

    /// All items stored for an image URL, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the query fails or a row is corrupt.
    pub async fn find_by_url(&self, url: &str) -> Result<Vec<Item>, StoreError> {
        let url = url.to_owned();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM items WHERE url = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![url], RawItem::from_row)?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?.into_item()?);
            }
            Ok(items)
        })
        .await
    }

    async fn with_conn<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        spawn_blocking(move || {
            let guard = conn.lock().map_err(|_poisoned| StoreError::Poisoned)?;
            work(&guard)
        })
        .await?
    }
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    async fn ensure_schema(&self) -> Result<(), PortError> {
        self.with_conn(|conn| {
            conn.execute(SCHEMA, [])?;
            Ok(())
        })
        .await?;
        debug!("item schema ready");
        Ok(())
    }

    async fn insert(&self, item: NewItem) -> Result<Item, PortError> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let stored = self
            .with_conn(move |conn| {
                conn.query_row(
                    &format!(
                        "INSERT INTO items (category, description, url, created_at)
                         VALUES (?1, ?2, ?3, ?4)
                         RETURNING {ITEM_COLUMNS}"
                    ),
                    params![
                        item.category.as_str(),
                        item.description,
                        item.url,
                        created_at
                    ],
                    RawItem::from_row,
                )?
                .into_item()
            })
            .await?;

        debug!(id = stored.id, category = %stored.category, "item inserted");
        Ok(stored)
    }
}

/// Row as stored, before the category and timestamp are parsed.
struct RawItem {
    id: i64,
    category: String,
    description: String,
    url: String,
    created_at: String,
}

impl RawItem {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category: row.get(1)?,
            description: row.get(2)?,
            url: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_item(self) -> Result<Item, StoreError> {
        let category: Category = self
            .category
            .parse()
            .map_err(|err: PortError| StoreError::Corrupt(err.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|err| StoreError::Corrupt(format!("created_at: {err}")))?
            .with_timezone(&Utc);

        Ok(Item {
            id: self.id,
            category,
            description: self.description,
            url: self.url,
            created_at,
        })
    }
}
