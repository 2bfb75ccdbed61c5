//! Products table: catalog mirror and the local favorite flag.

use shopsync_engine::{FavoritesPlan, Product, ProductId, SearchFilter};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::{decimal_column, id_list, LiveQuery, LocalStore, Pool, Table};

const PRODUCT_COLUMNS: &str =
    "id, title, description, category, price, rating, images, thumbnail, is_favorite";

/// A product row from the database.
#[derive(Debug)]
pub struct StoredProduct(pub Product);

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredProduct {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let images: String = row.try_get("images")?;
        let images = serde_json::from_str(&images).map_err(|e| sqlx::Error::ColumnDecode {
            index: "images".to_string(),
            source: Box::new(e),
        })?;

        Ok(StoredProduct(Product {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            price: decimal_column(row, "price")?,
            rating: decimal_column(row, "rating")?,
            images,
            thumbnail: row.try_get("thumbnail")?,
            is_favorite: row.try_get("is_favorite")?,
        }))
    }
}

fn into_products(rows: Vec<StoredProduct>) -> Vec<Product> {
    rows.into_iter().map(|StoredProduct(p)| p).collect()
}

impl LocalStore {
    /// Bulk insert, ignoring products that already exist.
    pub async fn insert_products(&self, products: &[Product]) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;
        for product in products {
            inserted += insert_product(&mut tx, product).await?;
        }
        tx.commit().await?;

        self.touch(&[Table::Products]);
        tracing::debug!(count = products.len(), inserted, "Inserted products");
        Ok(inserted)
    }

    /// Bulk upsert of catalog fields. The local favorite flag of existing
    /// products is kept.
    pub async fn upsert_catalog(&self, products: &[Product]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        for product in products {
            sqlx::query(
                r#"
                INSERT INTO products (
                    id, title, description, category, price, rating,
                    images, thumbnail, is_favorite
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    category = excluded.category,
                    price = excluded.price,
                    rating = excluded.rating,
                    images = excluded.images,
                    thumbnail = excluded.thumbnail
                "#,
            )
            .bind(product.id)
            .bind(&product.title)
            .bind(&product.description)
            .bind(&product.category)
            .bind(product.price.to_string())
            .bind(product.rating.to_string())
            .bind(images_json(product)?)
            .bind(&product.thumbnail)
            .bind(product.is_favorite)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.touch(&[Table::Products]);
        Ok(())
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, sqlx::Error> {
        fetch_product(self.pool().clone(), id).await
    }

    /// Flip one product's favorite flag. Returns the new value, or `None` if
    /// the product is not stored.
    pub async fn toggle_favorite(&self, id: ProductId) -> Result<Option<bool>, sqlx::Error> {
        let flag: Option<(bool,)> = sqlx::query_as(
            "UPDATE products SET is_favorite = NOT is_favorite WHERE id = ? RETURNING is_favorite",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        if flag.is_some() {
            self.touch(&[Table::Products]);
        }
        Ok(flag.map(|(f,)| f))
    }

    /// Flag exactly the planned favorites and unflag every other product.
    pub async fn sync_favorites(&self, plan: &FavoritesPlan) -> Result<(), sqlx::Error> {
        let ids: Vec<ProductId> = plan.favorite_ids().iter().copied().collect();
        sqlx::query(
            r#"
            UPDATE products SET is_favorite =
                CASE WHEN id IN (SELECT value FROM json_each(?)) THEN 1 ELSE 0 END
            "#,
        )
        .bind(id_list(&ids)?)
        .execute(self.pool())
        .await?;

        self.touch(&[Table::Products]);
        Ok(())
    }

    pub async fn delete_all_products(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM products")
            .execute(self.pool())
            .await?;
        self.touch(&Table::ALL);
        Ok(())
    }

    /// All products, or those whose title or description contains `query`
    /// ignoring ASCII case. Queries shorter than three characters do not filter.
    pub fn observe_products(&self, query: &str) -> LiveQuery<Vec<Product>> {
        let pattern = SearchFilter::parse(query).like_pattern();
        self.observe(&[Table::Products], move |pool| {
            let pattern = pattern.clone();
            async move {
                let sql = match &pattern {
                    None => format!("SELECT {} FROM products ORDER BY id", PRODUCT_COLUMNS),
                    Some(_) => format!(
                        "SELECT {} FROM products \
                         WHERE title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\' \
                         ORDER BY id",
                        PRODUCT_COLUMNS
                    ),
                };
                let mut query = sqlx::query_as::<_, StoredProduct>(&sql);
                if let Some(pattern) = pattern {
                    query = query.bind(pattern);
                }
                Ok(into_products(query.fetch_all(&pool).await?))
            }
        })
    }

    pub fn observe_favorite_products(&self) -> LiveQuery<Vec<Product>> {
        self.observe(&[Table::Products], |pool| async move {
            let rows = sqlx::query_as::<_, StoredProduct>(&format!(
                "SELECT {} FROM products WHERE is_favorite = 1 ORDER BY id",
                PRODUCT_COLUMNS
            ))
            .fetch_all(&pool)
            .await?;
            Ok(into_products(rows))
        })
    }

    pub fn observe_product(&self, id: ProductId) -> LiveQuery<Option<Product>> {
        self.observe(&[Table::Products], move |pool| fetch_product(pool, id))
    }
}

async fn fetch_product(pool: Pool, id: ProductId) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query_as::<_, StoredProduct>(&format!(
        "SELECT {} FROM products WHERE id = ?",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?;
    Ok(row.map(|StoredProduct(p)| p))
}

async fn insert_product(
    tx: &mut Transaction<'_, Sqlite>,
    product: &Product,
) -> Result<u64, sqlx::Error> {
    let sql = format!(
        "INSERT OR IGNORE INTO products ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        PRODUCT_COLUMNS
    );
    let result = sqlx::query(&sql)
        .bind(product.id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price.to_string())
        .bind(product.rating.to_string())
        .bind(images_json(product)?)
        .bind(&product.thumbnail)
        .bind(product.is_favorite)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

fn images_json(product: &Product) -> Result<String, sqlx::Error> {
    serde_json::to_string(&product.images).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}
