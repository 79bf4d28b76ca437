//! SQLite-backed pin store.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{PinChange, PinError, PinStatus, PinStore, PinnedAnime};
use crate::db::Database;

/// Pin store persisted in the `pinned_anime` table.
#[derive(Debug, Clone)]
pub struct SqlitePinStore {
    db: Database,
}

impl SqlitePinStore {
    /// Creates a store over an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn count(&self) -> Result<usize, PinError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pinned_anime")
            .fetch_one(self.db.pool())
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl PinStore for SqlitePinStore {
    #[instrument(skip(self, pin), fields(url = %pin.url))]
    async fn add(&self, pin: PinnedAnime) -> Result<PinChange, PinError> {
        let result = sqlx::query("INSERT OR IGNORE INTO pinned_anime (name, url) VALUES (?, ?)")
            .bind(&pin.name)
            .bind(&pin.url)
            .execute(self.db.pool())
            .await?;

        let status = if result.rows_affected() == 0 {
            PinStatus::Duplicate
        } else {
            PinStatus::Added
        };
        debug!(?status, "pin add");
        Ok(PinChange {
            status,
            item_count: self.count().await?,
        })
    }

    #[instrument(skip(self))]
    async fn remove(&self, url: &str) -> Result<PinChange, PinError> {
        let result = sqlx::query("DELETE FROM pinned_anime WHERE url = ?")
            .bind(url)
            .execute(self.db.pool())
            .await?;

        let status = if result.rows_affected() == 0 {
            PinStatus::NotFound
        } else {
            PinStatus::Removed
        };
        debug!(?status, "pin remove");
        Ok(PinChange {
            status,
            item_count: self.count().await?,
        })
    }

    async fn list(&self) -> Result<Vec<PinnedAnime>, PinError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT name, url FROM pinned_anime ORDER BY id ASC")
                .fetch_all(self.db.pool())
                .await?;
        Ok(rows
            .into_iter()
            .map(|(name, url)| PinnedAnime { name, url })
            .collect())
    }
}
