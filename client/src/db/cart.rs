//! Cart table.

use shopsync_engine::{CartItem, CartLine, CartPlan, ProductId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{decimal_column, id_list, LiveQuery, LocalStore, Table};

/// A cart row joined with product display fields.
#[derive(Debug)]
pub struct StoredCartLine(pub CartLine);

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredCartLine {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredCartLine(CartLine {
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            price: decimal_column(row, "price")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            thumbnail: row.try_get("thumbnail")?,
            rating: decimal_column(row, "rating")?,
        }))
    }
}

impl LocalStore {
    /// Add a cart line with quantity 1. Returns `false` if the product was
    /// already in the cart.
    pub async fn insert_cart_item(&self, product_id: ProductId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO cart_items (product_id, quantity) VALUES (?, 1)")
                .bind(product_id)
                .execute(self.pool())
                .await?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            self.touch(&[Table::Cart]);
        }
        Ok(inserted)
    }

    /// Set the quantity of an existing cart line. Returns `false` if there is
    /// no line for the product.
    pub async fn update_cart_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE cart_items SET quantity = ? WHERE product_id = ?")
            .bind(quantity)
            .bind(product_id)
            .execute(self.pool())
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            self.touch(&[Table::Cart]);
        }
        Ok(updated)
    }

    pub async fn delete_cart_item(&self, product_id: ProductId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE product_id = ?")
            .bind(product_id)
            .execute(self.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            self.touch(&[Table::Cart]);
        }
        Ok(deleted)
    }

    pub async fn delete_cart_items(&self, product_ids: &[ProductId]) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM cart_items WHERE product_id IN (SELECT value FROM json_each(?))")
                .bind(id_list(product_ids)?)
                .execute(self.pool())
                .await?;

        self.touch(&[Table::Cart]);
        Ok(result.rows_affected())
    }

    pub async fn delete_all_cart_items(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM cart_items")
            .execute(self.pool())
            .await?;
        self.touch(&[Table::Cart]);
        Ok(())
    }

    /// Raw cart rows ordered by product id.
    pub async fn cart_items(&self) -> Result<Vec<CartItem>, sqlx::Error> {
        let rows: Vec<(ProductId, u32)> =
            sqlx::query_as("SELECT product_id, quantity FROM cart_items ORDER BY product_id")
                .fetch_all(self.pool())
                .await?;
        Ok(rows
            .into_iter()
            .map(|(product_id, quantity)| CartItem {
                product_id,
                quantity,
            })
            .collect())
    }

    /// Upsert every planned line, then delete lines the plan does not keep.
    /// One transaction.
    pub async fn sync_cart(&self, plan: &CartPlan) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        for item in plan.upserts() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (product_id, quantity) VALUES (?, ?)
                ON CONFLICT (product_id) DO UPDATE SET quantity = excluded.quantity
                "#,
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            "DELETE FROM cart_items WHERE product_id NOT IN (SELECT value FROM json_each(?))",
        )
        .bind(id_list(&plan.keep_ids())?)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.touch(&[Table::Cart]);
        Ok(())
    }

    /// Cart lines with product display fields, ordered by product id.
    pub fn observe_cart(&self) -> LiveQuery<Vec<CartLine>> {
        self.observe(&[Table::Products, Table::Cart], |pool| async move {
            let rows = sqlx::query_as::<_, StoredCartLine>(
                r#"
                SELECT c.product_id, c.quantity, p.price, p.title, p.description,
                       p.thumbnail, p.rating
                FROM cart_items c
                JOIN products p ON p.id = c.product_id
                ORDER BY c.product_id
                "#,
            )
            .fetch_all(&pool)
            .await?;
            Ok(rows.into_iter().map(|StoredCartLine(line)| line).collect())
        })
    }

    /// Number of cart lines.
    pub fn observe_cart_count(&self) -> LiveQuery<i64> {
        self.observe(&[Table::Cart], |pool| async move {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items")
                .fetch_one(&pool)
                .await?;
            Ok(count)
        })
    }
}
