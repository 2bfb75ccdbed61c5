//! Local SQLite store.
//!
//! The single source of truth for everything the UI reads. Writers commit a
//! transaction first and then announce which tables moved, so live queries
//! never observe a partial multi-row write.

mod cart;
mod live;
mod orders;
mod pool;
mod products;
mod session;

pub use live::{Generations, LiveQuery, Table};
pub use pool::*;

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tokio::sync::watch;

use crate::error::Result;

/// Handle to the local store. Cheap to clone.
#[derive(Clone)]
pub struct LocalStore {
    pool: Pool,
    changes: Arc<watch::Sender<Generations>>,
}

impl LocalStore {
    /// Open (creating if needed) the database at `database_url` and migrate it.
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        run_migrations(&pool).await?;
        tracing::debug!(database_url = %database_url, "Local store ready");
        Ok(Self::from_pool(pool))
    }

    /// A private in-memory store.
    pub async fn in_memory() -> Result<Self> {
        Self::open("sqlite::memory:").await
    }

    /// Wrap an already migrated pool.
    pub fn from_pool(pool: Pool) -> Self {
        let (changes, _) = watch::channel(Generations::default());
        Self {
            pool,
            changes: Arc::new(changes),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Current write generations.
    pub fn generations(&self) -> Generations {
        *self.changes.borrow()
    }

    /// Announce committed writes to `tables`.
    pub(crate) fn touch(&self, tables: &[Table]) {
        self.changes.send_modify(|generations| {
            for table in tables {
                generations.bump(*table);
            }
        });
    }

    pub(crate) fn observe<T, F, Fut>(&self, tables: &'static [Table], query: F) -> LiveQuery<T>
    where
        T: PartialEq + Clone + Send + 'static,
        F: Fn(Pool) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, sqlx::Error>> + Send + 'static,
    {
        live::observe(self.pool.clone(), self.changes.subscribe(), tables, query)
    }

    /// Delete every product, cart line, order and order line in one transaction.
    pub async fn clear_all(&self) -> std::result::Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM order_items").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM orders").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM cart_items").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        tx.commit().await?;

        self.touch(&Table::ALL);
        tracing::info!("Local store wiped");
        Ok(())
    }
}

/// Read a decimal persisted as TEXT.
pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> std::result::Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Encode a list of ids for `IN (SELECT value FROM json_each(?))`.
pub(crate) fn id_list<T: serde::Serialize>(ids: &[T]) -> std::result::Result<String, sqlx::Error> {
    serde_json::to_string(ids).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_and_migrates_in_memory() {
        let store = LocalStore::in_memory().await.unwrap();
        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
             AND name IN ('products', 'cart_items', 'orders', 'order_items', 'session')",
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(tables, 5);
    }

    #[tokio::test]
    async fn touch_moves_only_named_tables() {
        let store = LocalStore::in_memory().await.unwrap();
        store.touch(&[Table::Cart]);
        let generations = store.generations();
        assert_eq!(generations.get(Table::Cart), 1);
        assert_eq!(generations.get(Table::Products), 0);
        assert_eq!(generations.get(Table::Orders), 0);
    }
}
