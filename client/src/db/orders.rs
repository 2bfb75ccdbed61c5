//! Orders and order lines.

use shopsync_engine::{group_order_lines, NewOrder, Order, OrderItem, OrderLine, OrderView, OrdersPlan};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::{decimal_column, id_list, LiveQuery, LocalStore, Table};

/// An order line row from the database.
#[derive(Debug)]
pub struct StoredOrderItem(pub OrderItem);

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredOrderItem {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredOrderItem(OrderItem {
            id: row.try_get("id")?,
            quantity: row.try_get("quantity")?,
            product_id: row.try_get("product_id")?,
            order_id: row.try_get("order_id")?,
            total_price: decimal_column(row, "total_price")?,
        }))
    }
}

/// One row of the orders read query.
#[derive(Debug)]
pub struct StoredOrderLine(pub OrderLine);

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredOrderLine {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredOrderLine(OrderLine {
            order_id: row.try_get("order_id")?,
            order_time: row.try_get("order_time")?,
            order_status: row.try_get("order_status")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            thumbnail: row.try_get("thumbnail")?,
            total_price: decimal_column(row, "total_price")?,
        }))
    }
}

impl LocalStore {
    /// Write the order header and its lines and remove the ordered products
    /// from the cart, all in one transaction.
    pub async fn create_order(&self, new_order: &NewOrder) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        upsert_order(&mut tx, &new_order.order).await?;
        for item in &new_order.items {
            upsert_order_item(&mut tx, item).await?;
        }
        sqlx::query("DELETE FROM cart_items WHERE product_id IN (SELECT value FROM json_each(?))")
            .bind(id_list(&new_order.cart_product_ids())?)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.touch(&[Table::Orders, Table::Cart]);
        tracing::debug!(
            order_id = %new_order.order.id,
            lines = new_order.items.len(),
            "Order stored"
        );
        Ok(())
    }

    /// Upsert every planned header and line. Never deletes.
    pub async fn sync_orders(&self, plan: &OrdersPlan) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        for order in &plan.orders {
            upsert_order(&mut tx, order).await?;
        }
        for item in &plan.items {
            upsert_order_item(&mut tx, item).await?;
        }
        tx.commit().await?;

        self.touch(&[Table::Orders]);
        Ok(())
    }

    pub async fn delete_all_orders(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM order_items").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM orders").execute(&mut *tx).await?;
        tx.commit().await?;
        self.touch(&[Table::Orders]);
        Ok(())
    }

    /// Order headers, newest first.
    pub async fn orders(&self) -> Result<Vec<Order>, sqlx::Error> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            "SELECT id, order_time, order_status FROM orders ORDER BY order_time DESC, id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, order_time, status)| Order {
                id,
                order_time,
                status,
            })
            .collect())
    }

    pub async fn order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, sqlx::Error> {
        let rows = sqlx::query_as::<_, StoredOrderItem>(
            r#"
            SELECT id, quantity, product_id, order_id, total_price
            FROM order_items WHERE order_id = ? ORDER BY product_id, id
            "#,
        )
        .bind(order_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(|StoredOrderItem(item)| item).collect())
    }

    /// Orders with their lines and product display fields, newest first.
    pub fn observe_orders(&self) -> LiveQuery<Vec<OrderView>> {
        self.observe(&[Table::Products, Table::Orders], |pool| async move {
            let rows = sqlx::query_as::<_, StoredOrderLine>(
                r#"
                SELECT o.id AS order_id, o.order_time, o.order_status,
                       i.product_id, i.quantity, i.total_price,
                       p.title, p.description, p.thumbnail
                FROM orders o
                JOIN order_items i ON i.order_id = o.id
                JOIN products p ON p.id = i.product_id
                ORDER BY o.order_time DESC, o.id, i.product_id, i.id
                "#,
            )
            .fetch_all(&pool)
            .await?;
            Ok(group_order_lines(
                rows.into_iter().map(|StoredOrderLine(line)| line).collect(),
            ))
        })
    }
}

async fn upsert_order(tx: &mut Transaction<'_, Sqlite>, order: &Order) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, order_time, order_status) VALUES (?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            order_time = excluded.order_time,
            order_status = excluded.order_status
        "#,
    )
    .bind(&order.id)
    .bind(order.order_time)
    .bind(&order.status)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_order_item(
    tx: &mut Transaction<'_, Sqlite>,
    item: &OrderItem,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO order_items (id, quantity, product_id, order_id, total_price)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            quantity = excluded.quantity,
            product_id = excluded.product_id,
            order_id = excluded.order_id,
            total_price = excluded.total_price
        "#,
    )
    .bind(&item.id)
    .bind(item.quantity)
    .bind(item.product_id)
    .bind(&item.order_id)
    .bind(item.total_price.to_string())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
