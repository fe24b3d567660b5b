//! # Sale Repository
//!
//! Read-side access to the sales ledger. Writing sales is the checkout
//! engine's job; this repository only reads what checkout committed,
//! plus the aggregate report.
//!
//! ## Report Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales_report(start, end)                                               │
//! │                                                                         │
//! │  sales ──────────► SUM(final_amount_cents), COUNT(*)                    │
//! │  sale_items ─────► top products by units sold (join products for name)  │
//! │                                                                         │
//! │  Revenue is the FINAL amount: what the customer actually paid,          │
//! │  after discounts.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{AppliedDiscount, Sale, SaleItem};

/// A sale with its line items and applied discounts.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub applied_discounts: Vec<AppliedDiscount>,
}

/// One product's row in the report's top-seller list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSales {
    pub product_id: String,
    pub name: Option<String>,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

/// Aggregated sales figures for a date range.
#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sale_count: i64,
    /// Sum of final amounts: revenue after discounts.
    pub total_revenue_cents: i64,
    /// Sum of deductions granted in the range.
    pub total_discounted_cents: i64,
    pub top_products: Vec<ProductSales>,
}

/// How many products the report's top-seller list carries.
const TOP_PRODUCTS_LIMIT: i64 = 10;

/// Repository for reading committed sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale with its items and applied discounts.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, user_id, customer_id, total_amount_cents,
                   final_amount_cents, payment_method, created_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(sale) = sale else {
            return Ok(None);
        };

        // rowid order preserves the insertion order of the cart lines.
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT sale_id, product_id, quantity, price_at_sale_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let applied_discounts = sqlx::query_as::<_, AppliedDiscount>(
            r#"
            SELECT sale_id, discount_id, amount_discounted_cents
            FROM applied_discounts
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SaleDetail {
            sale,
            items,
            applied_discounts,
        }))
    }

    /// Lists sales, most recent first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, user_id, customer_id, total_amount_cents,
                   final_amount_cents, payment_method, created_at
            FROM sales
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists a customer's sales, most recent first.
    pub async fn list_for_customer(&self, customer_id: &str, limit: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, user_id, customer_id, total_amount_cents,
                   final_amount_cents, payment_method, created_at
            FROM sales
            WHERE customer_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Builds the sales report for `[start, end)`.
    pub async fn sales_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<SalesReport> {
        debug!(start = %start, end = %end, "Building sales report");

        let (sale_count, total_revenue_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(final_amount_cents), 0)
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let total_discounted_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ad.amount_discounted_cents), 0)
            FROM applied_discounts ad
            INNER JOIN sales s ON s.id = ad.sale_id
            WHERE s.created_at >= ?1 AND s.created_at < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        // LEFT JOIN on products: a product deleted after the sale still
        // appears, just without a name.
        let top_products = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT
                si.product_id,
                p.name,
                SUM(si.quantity) AS units_sold,
                SUM(si.quantity * si.price_at_sale_cents) AS revenue_cents
            FROM sale_items si
            INNER JOIN sales s ON s.id = si.sale_id
            LEFT JOIN products p ON p.id = si.product_id
            WHERE s.created_at >= ?1 AND s.created_at < ?2
            GROUP BY si.product_id, p.name
            ORDER BY units_sold DESC
            LIMIT ?3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(TOP_PRODUCTS_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(SalesReport {
            start,
            end,
            sale_count,
            total_revenue_cents,
            total_discounted_cents,
            top_products,
        })
    }

    /// Builds the report for the trailing 30 days, the default window
    /// when the caller supplies no range.
    pub async fn sales_report_default(&self) -> DbResult<SalesReport> {
        let end = Utc::now();
        let start = end - Duration::days(30);
        self.sales_report(start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::CheckoutRequest;
    use crate::pool::{Database, DbConfig};
    use crate::repository::discount::NewDiscount;
    use crate::repository::product::NewProduct;
    use tally_core::{CartLine, DiscountType};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_and_sell(db: &Database) -> (String, String) {
        let user = db.users().register("cashier1", "pw", None).await.unwrap();
        let product = db
            .products()
            .create(NewProduct {
                sku: "PROD-A".to_string(),
                name: "Product A".to_string(),
                description: None,
                price_cents: 1000,
                initial_quantity: 50,
            })
            .await
            .unwrap();
        db.discounts()
            .create(NewDiscount {
                code: "SAVE10".to_string(),
                description: None,
                discount_type: DiscountType::Percentage,
                value: 1000,
                is_active: true,
                valid_from: None,
                valid_until: None,
            })
            .await
            .unwrap();
        (user.id, product.id)
    }

    fn cart(user_id: &str, product_id: &str, quantity: i64, codes: Vec<&str>) -> CheckoutRequest {
        CheckoutRequest {
            user_id: user_id.to_string(),
            customer_id: None,
            payment_method: "cash".to_string(),
            lines: vec![CartLine {
                product_id: product_id.to_string(),
                quantity,
            }],
            discount_codes: codes.into_iter().map(|c| c.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_list_returns_most_recent_first() {
        let db = test_db().await;
        let (user, product) = seed_and_sell(&db).await;

        db.checkout()
            .checkout(cart(&user, &product, 1, vec![]))
            .await
            .unwrap();
        let second = db
            .checkout()
            .checkout(cart(&user, &product, 2, vec![]))
            .await
            .unwrap();

        let sales = db.sales().list(10).await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].id, second.sale_id);
    }

    #[tokio::test]
    async fn test_report_aggregates_revenue_and_discounts() {
        let db = test_db().await;
        let (user, product) = seed_and_sell(&db).await;

        // $10 × 2 with 10% off, plus $10 × 1 at full price.
        db.checkout()
            .checkout(cart(&user, &product, 2, vec!["SAVE10"]))
            .await
            .unwrap();
        db.checkout()
            .checkout(cart(&user, &product, 1, vec![]))
            .await
            .unwrap();

        let report = db.sales().sales_report_default().await.unwrap();
        assert_eq!(report.sale_count, 2);
        assert_eq!(report.total_revenue_cents, 1800 + 1000);
        assert_eq!(report.total_discounted_cents, 200);
        assert_eq!(report.top_products.len(), 1);
        assert_eq!(report.top_products[0].units_sold, 3);
        assert_eq!(report.top_products[0].name.as_deref(), Some("Product A"));
    }

    #[tokio::test]
    async fn test_report_window_excludes_sales_outside_range() {
        let db = test_db().await;
        let (user, product) = seed_and_sell(&db).await;

        db.checkout()
            .checkout(cart(&user, &product, 1, vec![]))
            .await
            .unwrap();

        let long_ago = Utc::now() - Duration::days(60);
        let report = db
            .sales()
            .sales_report(long_ago, long_ago + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(report.sale_count, 0);
        assert_eq!(report.total_revenue_cents, 0);
        assert!(report.top_products.is_empty());
    }
}
