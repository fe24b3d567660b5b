//! # Product Repository
//!
//! Database operations for products and their inventory rows.
//!
//! ## Key Operations
//! - CRUD with the paired inventory row kept in lockstep
//! - Stock reads and manual stock adjustments
//!
//! ## Product / Inventory Pairing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products                       inventory                               │
//! │  ┌───────────────────┐          ┌─────────────────────┐                 │
//! │  │ id  sku  price... │ 1 ──── 1 │ product_id quantity │                 │
//! │  └───────────────────┘          └─────────────────────┘                 │
//! │                                                                         │
//! │  create: INSERT product + INSERT inventory   (one transaction)          │
//! │  delete: DELETE inventory + DELETE product   (one transaction)          │
//! │                                                                         │
//! │  A product without an inventory row is unsellable by construction:      │
//! │  checkout prices with an INNER JOIN on inventory.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::{validate_name, validate_price_cents, validate_sku};
use tally_core::{InventoryLevel, Product, ValidationError};

/// Fields accepted when creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub initial_quantity: i64,
}

/// Fields accepted when updating a product. Stock is adjusted separately.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
}

/// A product joined with its current stock level, for listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductWithStock {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub quantity: i64,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product together with its inventory row.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Created product with generated id
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        validate_sku(&new.sku)?;
        validate_name(&new.name)?;
        validate_price_cents(new.price_cents)?;
        if new.initial_quantity < 0 {
            return Err(ValidationError::OutOfRange {
                field: "initial_quantity".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        debug!(sku = %new.sku, "Creating product");

        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: new.sku,
            name: new.name,
            description: new.description,
            price_cents: new.price_cents,
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, sku, name, description, price_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, quantity, last_updated)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&product.id)
        .bind(new.initial_quantity)
        .bind(product.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, price_cents, created_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, price_cents, created_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists all products with their current stock, sorted by name.
    ///
    /// LEFT JOIN so a product whose inventory row was lost still shows
    /// up (with quantity 0) instead of disappearing from the catalog.
    pub async fn list_with_stock(&self) -> DbResult<Vec<ProductWithStock>> {
        let products = sqlx::query_as::<_, ProductWithStock>(
            r#"
            SELECT
                p.id, p.sku, p.name, p.description, p.price_cents, p.created_at,
                COALESCE(i.quantity, 0) AS quantity
            FROM products p
            LEFT JOIN inventory i ON i.product_id = p.id
            ORDER BY p.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's catalog fields.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: &str, update: ProductUpdate) -> DbResult<()> {
        validate_sku(&update.sku)?;
        validate_name(&update.name)?;
        validate_price_cents(update.price_cents)?;

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                description = ?4,
                price_cents = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&update.sku)
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.price_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Deletes a product and its inventory row.
    ///
    /// Sale history keeps referencing the deleted id through
    /// `sale_items.product_id`; only the catalog entry goes away.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM inventory WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Reads a product's current price and stock in one query, the same
    /// join checkout prices carts with.
    pub async fn price_and_stock(&self, product_id: &str) -> DbResult<Option<(i64, i64)>> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.price_cents, i.quantity
            FROM products p
            INNER JOIN inventory i ON i.product_id = p.id
            WHERE p.id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Reads the current inventory level for a product.
    pub async fn inventory_level(&self, product_id: &str) -> DbResult<Option<InventoryLevel>> {
        let level = sqlx::query_as::<_, InventoryLevel>(
            r#"
            SELECT product_id, quantity, last_updated
            FROM inventory
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    /// Sets the stock level to an absolute quantity (stocktake correction).
    pub async fn set_stock(&self, product_id: &str, quantity: i64) -> DbResult<()> {
        if quantity < 0 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        debug!(product_id = %product_id, quantity = %quantity, "Setting stock");

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = ?2, last_updated = ?3
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory", product_id));
        }

        Ok(())
    }

    /// Adjusts stock by a delta (positive for restocking).
    ///
    /// The guard in the WHERE clause refuses any adjustment that would
    /// drive the level negative, same discipline as checkout's decrement.
    pub async fn adjust_stock(&self, product_id: &str, delta: i64) -> DbResult<i64> {
        debug!(product_id = %product_id, delta = %delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity + ?2, last_updated = ?3
            WHERE product_id = ?1 AND quantity + ?2 >= 0
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing row from a refused adjustment.
            let current: Option<i64> =
                sqlx::query_scalar("SELECT quantity FROM inventory WHERE product_id = ?1")
                    .bind(product_id)
                    .fetch_optional(&self.pool)
                    .await?;

            return match current {
                None => Err(DbError::not_found("Inventory", product_id)),
                Some(quantity) => Err(DbError::Internal(format!(
                    "adjustment of {delta} would drive stock below zero (current {quantity})"
                ))),
            };
        }

        let quantity: i64 =
            sqlx::query_scalar("SELECT quantity FROM inventory WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(quantity)
    }

    /// Counts catalog products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn widget(sku: &str, price_cents: i64, initial_quantity: i64) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: format!("{sku} widget"),
            description: Some("test widget".to_string()),
            price_cents,
            initial_quantity,
        }
    }

    #[tokio::test]
    async fn test_create_pairs_product_with_inventory_row() {
        let db = test_db().await;
        let repo = db.products();

        let product = repo.create(widget("WID-1", 1250, 7)).await.unwrap();

        let level = repo.inventory_level(&product.id).await.unwrap().unwrap();
        assert_eq!(level.quantity, 7);

        let listed = repo.list_with_stock().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].product.sku, "WID-1");
        assert_eq!(listed[0].quantity, 7);
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_a_unique_violation() {
        let db = test_db().await;
        let repo = db.products();

        repo.create(widget("WID-1", 1250, 1)).await.unwrap();
        let err = repo.create(widget("WID-1", 900, 1)).await.unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
        // The failed create must not leave an orphan inventory row.
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo.create(widget("WID-1", 1250, 3)).await.unwrap();

        repo.update(
            &product.id,
            ProductUpdate {
                sku: "WID-1".to_string(),
                name: "Renamed widget".to_string(),
                description: None,
                price_cents: 1300,
            },
        )
        .await
        .unwrap();

        let reloaded = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "Renamed widget");
        assert_eq!(reloaded.price_cents, 1300);

        repo.delete(&product.id).await.unwrap();
        assert!(repo.get_by_id(&product.id).await.unwrap().is_none());
        assert!(repo.inventory_level(&product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_product_is_not_found() {
        let db = test_db().await;
        let err = db.products().delete("no-such-id").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_adjust_stock_refuses_to_go_negative() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo.create(widget("WID-1", 1250, 2)).await.unwrap();

        assert_eq!(repo.adjust_stock(&product.id, 5).await.unwrap(), 7);
        assert_eq!(repo.adjust_stock(&product.id, -7).await.unwrap(), 0);
        assert!(repo.adjust_stock(&product.id, -1).await.is_err());
        assert_eq!(
            repo.inventory_level(&product.id).await.unwrap().unwrap().quantity,
            0
        );
    }

    #[tokio::test]
    async fn test_set_stock_overwrites_level() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo.create(widget("WID-1", 1250, 2)).await.unwrap();

        repo.set_stock(&product.id, 40).await.unwrap();
        assert_eq!(
            repo.inventory_level(&product.id).await.unwrap().unwrap().quantity,
            40
        );
        assert!(repo.set_stock(&product.id, -1).await.is_err());
    }
}
