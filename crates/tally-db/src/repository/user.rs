//! # User Repository
//!
//! Registration and lookup for the users that front checkout requests.
//!
//! Passwords are hashed with Argon2 on the way in and never leave this
//! module in plain form; `User.password_hash` is additionally skipped
//! during serialization so listings cannot leak it.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::{validate_password, validate_username};
use tally_core::{User, DEFAULT_USER_ROLE};

/// Fields accepted when registering a user.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a user, hashing the password before storage.
    ///
    /// ## Returns
    /// * `Ok(User)` - Registered user (hash included in the struct but
    ///   skipped on serialization)
    /// * `Err(DbError::UniqueViolation)` - Username taken
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Option<&str>,
    ) -> DbResult<User> {
        validate_username(username)?;
        validate_password(password)?;

        debug!(username = %username, "Registering user");

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.trim().to_string(),
            password_hash: hash_password(password)?,
            role: role.unwrap_or(DEFAULT_USER_ROLE).to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by username, for credential checks.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Lists all users, sorted by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Verifies a username/password pair.
    ///
    /// Returns `Ok(Some(User))` on a match, `Ok(None)` for a wrong
    /// password or unknown username; the two are indistinguishable to
    /// the caller on purpose.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> DbResult<Option<User>> {
        let Some(user) = self.get_by_username(username).await? else {
            return Ok(None);
        };

        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Deletes a user.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }
}

/// Hash a password for storage.
fn hash_password(password: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a password against its stored hash.
fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_register_defaults_role_and_hashes_password() {
        let db = test_db().await;
        let repo = db.users();

        let user = repo.register("alice", "hunter2", None).await.unwrap();

        assert_eq!(user.role, DEFAULT_USER_ROLE);
        assert_ne!(user.password_hash, "hunter2");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_a_unique_violation() {
        let db = test_db().await;
        let repo = db.users();

        repo.register("alice", "hunter2", None).await.unwrap();
        let err = repo.register("alice", "other", None).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let db = test_db().await;
        let repo = db.users();
        repo.register("alice", "hunter2", Some("manager"))
            .await
            .unwrap();

        let verified = repo
            .verify_credentials("alice", "hunter2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(verified.role, "manager");

        assert!(repo
            .verify_credentials("alice", "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .verify_credentials("bob", "hunter2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_empty_password_is_rejected() {
        let db = test_db().await;
        let err = db.users().register("alice", "", None).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }
}
