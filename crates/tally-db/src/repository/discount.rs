//! # Discount Repository
//!
//! Database operations for discount codes.
//!
//! Lookup by code is the hot path: checkout resolves each supplied code
//! inside its own transaction, so the lookup has a transaction-scoped
//! variant alongside the pool-backed repository methods.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::validate_name;
use tally_core::{Discount, DiscountLookup, DiscountType, ValidationError};

/// Fields accepted when creating a discount.
///
/// `value` is basis points for percentage discounts (1000 = 10%) and
/// cents for fixed amounts.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDiscount {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub value: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub valid_from: Option<chrono::DateTime<Utc>>,
    pub valid_until: Option<chrono::DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

const SELECT_COLUMNS: &str = "id, code, description, discount_type, value, \
     is_active, valid_from, valid_until, created_at";

/// Looks up a discount by code inside an open transaction.
///
/// Returns the tagged outcome rather than an `Option`: checkout treats
/// inactive and unknown codes differently only in what it logs, but the
/// distinction must survive to that point.
pub(crate) async fn lookup_discount_tx(
    tx: &mut Transaction<'_, Sqlite>,
    code: &str,
) -> DbResult<DiscountLookup> {
    let discount = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {SELECT_COLUMNS} FROM discounts WHERE code = ?1"
    ))
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(match discount {
        Some(d) if d.is_active => DiscountLookup::Active(d),
        Some(d) => DiscountLookup::Inactive(d),
        None => DiscountLookup::NotFound,
    })
}

/// Repository for discount database operations.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Creates a discount.
    ///
    /// ## Returns
    /// * `Ok(Discount)` - Created discount with generated id
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn create(&self, new: NewDiscount) -> DbResult<Discount> {
        validate_name(&new.code)?;
        if new.value <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "value".to_string(),
            }
            .into());
        }
        // A percentage over 100% can only ever clamp to a free sale;
        // reject it at the door instead.
        if new.discount_type == DiscountType::Percentage && new.value > 10_000 {
            return Err(ValidationError::OutOfRange {
                field: "value".to_string(),
                min: 1,
                max: 10_000,
            }
            .into());
        }

        debug!(code = %new.code, "Creating discount");

        let discount = Discount {
            id: Uuid::new_v4().to_string(),
            code: new.code,
            description: new.description,
            discount_type: new.discount_type,
            value: new.value,
            is_active: new.is_active,
            valid_from: new.valid_from,
            valid_until: new.valid_until,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, code, description, discount_type, value,
                is_active, valid_from, valid_until, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.code)
        .bind(&discount.description)
        .bind(discount.discount_type)
        .bind(discount.value)
        .bind(discount.is_active)
        .bind(discount.valid_from)
        .bind(discount.valid_until)
        .bind(discount.created_at)
        .execute(&self.pool)
        .await?;

        Ok(discount)
    }

    /// Gets a discount by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Discount>> {
        let discount = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {SELECT_COLUMNS} FROM discounts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(discount)
    }

    /// Looks up a discount by code, tagged with its activation state.
    pub async fn find_by_code(&self, code: &str) -> DbResult<DiscountLookup> {
        let mut tx = self.pool.begin().await?;
        let lookup = lookup_discount_tx(&mut tx, code).await?;
        tx.commit().await?;
        Ok(lookup)
    }

    /// Lists all discounts, newest first.
    pub async fn list(&self) -> DbResult<Vec<Discount>> {
        let discounts = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {SELECT_COLUMNS} FROM discounts ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(discounts)
    }

    /// Enables or disables a discount code.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<()> {
        debug!(id = %id, is_active = %is_active, "Toggling discount");

        let result = sqlx::query("UPDATE discounts SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", id));
        }

        Ok(())
    }

    /// Deletes a discount.
    ///
    /// Fails with a foreign key violation if committed sales applied it;
    /// disable with [`set_active`](Self::set_active) instead.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting discount");

        let result = sqlx::query("DELETE FROM discounts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn percent_off(code: &str, bps: i64) -> NewDiscount {
        NewDiscount {
            code: code.to_string(),
            description: None,
            discount_type: DiscountType::Percentage,
            value: bps,
            is_active: true,
            valid_from: None,
            valid_until: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_code_tags_activation_state() {
        let db = test_db().await;
        let repo = db.discounts();

        let active = repo.create(percent_off("SAVE10", 1000)).await.unwrap();
        let disabled = repo.create(percent_off("OLD", 500)).await.unwrap();
        repo.set_active(&disabled.id, false).await.unwrap();

        assert!(matches!(
            repo.find_by_code("SAVE10").await.unwrap(),
            DiscountLookup::Active(d) if d.id == active.id
        ));
        assert!(matches!(
            repo.find_by_code("OLD").await.unwrap(),
            DiscountLookup::Inactive(_)
        ));
        assert!(matches!(
            repo.find_by_code("NOPE").await.unwrap(),
            DiscountLookup::NotFound
        ));
    }

    #[tokio::test]
    async fn test_duplicate_code_is_a_unique_violation() {
        let db = test_db().await;
        let repo = db.discounts();

        repo.create(percent_off("SAVE10", 1000)).await.unwrap();
        let err = repo.create(percent_off("SAVE10", 500)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_percentage_over_100_is_rejected() {
        let db = test_db().await;
        let err = db
            .discounts()
            .create(percent_off("TOOMUCH", 10_001))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_discount_type_round_trips_through_sqlite() {
        let db = test_db().await;
        let repo = db.discounts();

        let fixed = repo
            .create(NewDiscount {
                code: "FLAT5".to_string(),
                description: Some("$5 off".to_string()),
                discount_type: DiscountType::FixedAmount,
                value: 500,
                is_active: true,
                valid_from: None,
                valid_until: None,
            })
            .await
            .unwrap();

        let reloaded = repo.get_by_id(&fixed.id).await.unwrap().unwrap();
        assert_eq!(reloaded.discount_type, DiscountType::FixedAmount);
        assert_eq!(reloaded.value, 500);
    }
}
