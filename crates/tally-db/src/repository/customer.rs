//! # Customer Repository
//!
//! Database operations for the customer directory. Customers are
//! optional at checkout; a sale with no customer is an anonymous walk-in.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::validate_name;
use tally_core::Customer;

/// Fields accepted when creating or updating a customer.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer.
    ///
    /// ## Returns
    /// * `Ok(Customer)` - Created customer with generated id
    /// * `Err(DbError::UniqueViolation)` - Phone number or email taken
    pub async fn create(&self, input: CustomerInput) -> DbResult<Customer> {
        validate_name(&input.name)?;

        debug!(name = %input.name, "Creating customer");

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            phone_number: input.phone_number,
            email: input.email,
            address: input.address,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone_number, email, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone_number)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone_number, email, address, created_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists all customers, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone_number, email, address, created_at
            FROM customers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Updates a customer's contact details.
    pub async fn update(&self, id: &str, input: CustomerInput) -> DbResult<()> {
        validate_name(&input.name)?;

        debug!(id = %id, "Updating customer");

        let result = sqlx::query(
            r#"
            UPDATE customers SET name = ?2, phone_number = ?3, email = ?4, address = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.phone_number)
        .bind(&input.email)
        .bind(&input.address)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Deletes a customer.
    ///
    /// Past sales keep their `customer_id` foreign key, so deleting a
    /// customer with sale history fails with a foreign key violation
    /// rather than orphaning the ledger.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
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

    fn input(name: &str) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            phone_number: None,
            email: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_customer_crud() {
        let db = test_db().await;
        let repo = db.customers();

        let customer = repo
            .create(CustomerInput {
                name: "Ada Lovelace".to_string(),
                phone_number: Some("555-0100".to_string()),
                email: Some("ada@example.com".to_string()),
                address: None,
            })
            .await
            .unwrap();

        let loaded = repo.get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Ada Lovelace");
        assert_eq!(loaded.phone_number.as_deref(), Some("555-0100"));

        repo.update(
            &customer.id,
            CustomerInput {
                name: "Ada Lovelace".to_string(),
                phone_number: Some("555-0100".to_string()),
                email: Some("ada@example.com".to_string()),
                address: Some("12 Analytical St".to_string()),
            },
        )
        .await
        .unwrap();

        let loaded = repo.get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(loaded.address.as_deref(), Some("12 Analytical St"));

        assert_eq!(repo.list().await.unwrap().len(), 1);

        repo.delete(&customer.id).await.unwrap();
        assert!(repo.get_by_id(&customer.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_phone_number_is_a_unique_violation() {
        let db = test_db().await;
        let repo = db.customers();

        let mut first = input("Ada");
        first.phone_number = Some("555-0100".to_string());
        repo.create(first).await.unwrap();

        let mut second = input("Grace");
        second.phone_number = Some("555-0100".to_string());
        let err = repo.create(second).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let db = test_db().await;
        let err = db.customers().create(input("   ")).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }
}
