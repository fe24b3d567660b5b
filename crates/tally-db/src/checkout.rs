//! # Checkout Engine
//!
//! The one compound operation of the system: convert a cart into a
//! committed sale plus inventory decrements, atomically.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Checkout Transaction                              │
//! │                                                                         │
//! │  validate cart (no side effects)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE ──► price + stock per product ──► ProductNotFound?     │
//! │       │                (price captured ONCE)       InsufficientStock?   │
//! │       ▼                                                                 │
//! │  subtotal ──► resolve discount codes ──► final = max(0, sub − Σ)        │
//! │       │        (unknown/inactive: skip)                                 │
//! │       ▼                                                                 │
//! │  INSERT sale ──► INSERT sale_items ──► INSERT applied_discounts         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  guarded UPDATE inventory (quantity >= requested) ──► raced? re-check   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ──► SaleReceipt                                                 │
//! │                                                                         │
//! │  ANY error before COMMIT drops the transaction → full rollback.         │
//! │  No partial sale is ever observable outside this function.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `sqlx::Transaction` value is the atomic scope: every early return
//! drops it, which rolls back; `commit()` consumes it on the single
//! success path. The transaction begins `IMMEDIATE`, so concurrent
//! checkouts queue on SQLite's write lock and the stock check always
//! reads committed state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Connection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::discount::lookup_discount_tx;
use tally_core::pricing::{self, DiscountOutcome, PricedLine};
use tally_core::validation::validate_cart;
use tally_core::{AppliedDiscount, CartLine, CoreError, Money, SaleReceipt, ValidationError};

// =============================================================================
// Request & Error Types
// =============================================================================

/// Decoded checkout request from the request layer.
///
/// `user_id` is caller-supplied and trusted (no auth enforcement here);
/// the foreign key still requires it to reference a real user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub customer_id: Option<String>,
    pub payment_method: String,
    pub lines: Vec<CartLine>,
    pub discount_codes: Vec<String>,
}

/// Response class the request layer should map an error to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed cart or unknown product (HTTP-equivalent: bad request).
    BadRequest,
    /// Business-rule conflict such as insufficient stock (HTTP-equivalent:
    /// conflict).
    Conflict,
    /// Storage-layer failure (HTTP-equivalent: internal error).
    Internal,
}

/// What checkout can fail with.
///
/// Every variant implies a full rollback: either the transaction never
/// started (validation) or it was dropped uncommitted.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Input error or business-rule conflict; see [`ErrorClass`].
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// Storage-layer failure. Not retried automatically.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] DbError),
}

impl CheckoutError {
    /// Maps the error to the response class the request layer reports.
    pub fn class(&self) -> ErrorClass {
        match self {
            CheckoutError::Rejected(CoreError::InsufficientStock { .. }) => ErrorClass::Conflict,
            CheckoutError::Rejected(_) => ErrorClass::BadRequest,
            CheckoutError::Persistence(_) => ErrorClass::Internal,
        }
    }
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Rejected(CoreError::Validation(err))
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The checkout engine.
///
/// Sole writer of sales, sale_items, applied_discounts, and inventory
/// decrements. Holds no state of its own; all shared state lives in the
/// database, which owns the concurrency discipline (single SQLite writer
/// plus the guarded decrement below).
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    pool: SqlitePool,
}

impl CheckoutEngine {
    /// Creates a new CheckoutEngine.
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutEngine { pool }
    }

    /// Runs a checkout: validate, price, discount, persist, commit.
    ///
    /// On success exactly one sale row, its item and discount rows, and
    /// the inventory decrements are durable. On any error nothing is.
    pub async fn checkout(&self, req: CheckoutRequest) -> Result<SaleReceipt, CheckoutError> {
        debug!(
            user_id = %req.user_id,
            lines = req.lines.len(),
            codes = req.discount_codes.len(),
            "Checkout requested"
        );

        // Input validation happens before the transaction starts: a
        // malformed cart must have zero side effects.
        validate_cart(&req.lines)?;

        // BEGIN IMMEDIATE takes the write lock up front. A deferred
        // transaction would read stock, then hit SQLITE_BUSY upgrading to
        // a write lock when another checkout holds it, surfacing as a
        // storage error instead of InsufficientStock. With an immediate
        // begin, concurrent checkouts serialize here (waiting out the
        // busy timeout) and the loser's stock check reads the winner's
        // committed decrement.
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        let mut tx = conn
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(DbError::from)?;

        // Price and stock per distinct product, captured once. The same
        // captured price feeds the subtotal and the persisted snapshot.
        let requested = pricing::requested_per_product(&req.lines);
        let mut catalog: Vec<(String, Money)> = Vec::with_capacity(requested.len());

        for (product_id, total_requested) in &requested {
            let row: Option<(i64, i64)> = sqlx::query_as(
                r#"
                SELECT p.price_cents, i.quantity
                FROM products p
                INNER JOIN inventory i ON i.product_id = p.id
                WHERE p.id = ?1
                "#,
            )
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?;

            let (price_cents, available) = match row {
                Some(row) => row,
                None => return Err(CoreError::ProductNotFound(product_id.clone()).into()),
            };

            // Stock is checked against the cumulative quantity this cart
            // requests for the product, not per line.
            if available < *total_requested {
                return Err(CoreError::InsufficientStock {
                    product_id: product_id.clone(),
                    available,
                    requested: *total_requested,
                }
                .into());
            }

            catalog.push((product_id.clone(), Money::from_cents(price_cents)));
        }

        // Every line's product was priced above; a miss here means the
        // cart and the catalog walk disagree, which must fail the
        // checkout rather than price the line at zero.
        let mut priced: Vec<PricedLine> = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let unit_price = catalog
                .iter()
                .find(|(id, _)| id == &line.product_id)
                .map(|(_, price)| *price)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            priced.push(PricedLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price,
            });
        }

        let subtotal = pricing::subtotal(&priced);

        // Resolve discount codes in the order supplied. Unknown and
        // inactive codes are skipped, never an error.
        let mut total_deduction = Money::zero();
        let mut applied: Vec<(String, Money)> = Vec::new();

        for code in &req.discount_codes {
            let lookup = lookup_discount_tx(&mut tx, code).await?;
            match pricing::resolve_discount(code, lookup, subtotal) {
                DiscountOutcome::Applied {
                    discount_id,
                    amount,
                } => {
                    total_deduction += amount;
                    applied.push((discount_id, amount));
                }
                DiscountOutcome::SkippedInactive { code } => {
                    debug!(code = %code, "Skipping inactive discount code");
                }
                DiscountOutcome::SkippedUnknown { code } => {
                    debug!(code = %code, "Skipping unknown discount code");
                }
            }
        }

        let final_amount = pricing::final_amount(subtotal, total_deduction);

        // Persist the sale and its children.
        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, user_id, customer_id,
                total_amount_cents, final_amount_cents,
                payment_method, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&sale_id)
        .bind(&req.user_id)
        .bind(&req.customer_id)
        .bind(subtotal.cents())
        .bind(final_amount.cents())
        .bind(&req.payment_method)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        for line in &priced {
            sqlx::query(
                r#"
                INSERT INTO sale_items (sale_id, product_id, quantity, price_at_sale_cents)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&sale_id)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;
        }

        let mut applied_discounts = Vec::with_capacity(applied.len());
        for (discount_id, amount) in applied {
            sqlx::query(
                r#"
                INSERT INTO applied_discounts (sale_id, discount_id, amount_discounted_cents)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(&sale_id)
            .bind(&discount_id)
            .bind(amount.cents())
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

            applied_discounts.push(AppliedDiscount {
                sale_id: sale_id.clone(),
                discount_id,
                amount_discounted_cents: amount.cents(),
            });
        }

        // Guarded decrement: the WHERE clause re-validates stock at the
        // moment of the write, so a concurrent checkout that consumed the
        // stock between our check and this decrement fails here instead of
        // driving the level negative.
        for (product_id, total_requested) in &requested {
            let result = sqlx::query(
                r#"
                UPDATE inventory
                SET quantity = quantity - ?2, last_updated = ?3
                WHERE product_id = ?1 AND quantity >= ?2
                "#,
            )
            .bind(product_id)
            .bind(total_requested)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

            if result.rows_affected() == 0 {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT quantity FROM inventory WHERE product_id = ?1")
                        .bind(product_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(DbError::from)?;

                return Err(CoreError::InsufficientStock {
                    product_id: product_id.clone(),
                    available: available.unwrap_or(0),
                    requested: *total_requested,
                }
                .into());
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %sale_id,
            subtotal = %subtotal,
            final_amount = %final_amount,
            discounts = applied_discounts.len(),
            "Checkout committed"
        );

        Ok(SaleReceipt {
            sale_id,
            total_amount_cents: subtotal.cents(),
            final_amount_cents: final_amount.cents(),
            applied_discounts,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
