//! Reactive queries over the local store.
//!
//! Every committed write bumps the generation counter of the tables it
//! touched. A live query remembers the counters of the tables it reads,
//! re-runs when one of them moves, and only yields results that differ from
//! the previous one.

use std::future::Future;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;

use super::Pool;

/// Tables a live query can depend on. Order lines count as `Orders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Products,
    Cart,
    Orders,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Products, Table::Cart, Table::Orders];

    fn index(self) -> usize {
        match self {
            Table::Products => 0,
            Table::Cart => 1,
            Table::Orders => 2,
        }
    }
}

/// Per-table write generations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generations([u64; 3]);

impl Generations {
    pub fn bump(&mut self, table: Table) {
        let slot = &mut self.0[table.index()];
        *slot = slot.wrapping_add(1);
    }

    pub fn get(&self, table: Table) -> u64 {
        self.0[table.index()]
    }

    /// Counters of `tables` only; the rest read as zero.
    fn fingerprint(&self, tables: &[Table]) -> [u64; 3] {
        let mut out = [0; 3];
        for table in tables {
            out[table.index()] = self.0[table.index()];
        }
        out
    }
}

/// A live, re-emitting query result. Ends when the store is dropped.
pub type LiveQuery<T> = BoxStream<'static, Result<T, sqlx::Error>>;

struct Cursor<T, F> {
    pool: Pool,
    changes: watch::Receiver<Generations>,
    query: F,
    seen: Option<[u64; 3]>,
    last: Option<T>,
}

pub(crate) fn observe<T, F, Fut>(
    pool: Pool,
    changes: watch::Receiver<Generations>,
    tables: &'static [Table],
    query: F,
) -> LiveQuery<T>
where
    T: PartialEq + Clone + Send + 'static,
    F: Fn(Pool) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, sqlx::Error>> + Send + 'static,
{
    let cursor = Cursor {
        pool,
        changes,
        query,
        seen: None,
        last: None,
    };

    stream::unfold(cursor, move |mut cursor| async move {
        loop {
            let current = cursor.changes.borrow_and_update().fingerprint(tables);
            if cursor.seen == Some(current) {
                if cursor.changes.changed().await.is_err() {
                    return None;
                }
                continue;
            }
            cursor.seen = Some(current);

            match (cursor.query)(cursor.pool.clone()).await {
                Ok(value) => {
                    if cursor.last.as_ref() == Some(&value) {
                        continue;
                    }
                    cursor.last = Some(value.clone());
                    return Some((Ok(value), cursor));
                }
                Err(e) => return Some((Err(e), cursor)),
            }
        }
    })
    .boxed()
}
