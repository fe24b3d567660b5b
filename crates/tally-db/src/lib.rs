//! # tally-db: Database Layer for Tally POS
//!
//! SQLite data access for the Tally POS backend, and the home of the one
//! operation with real invariants: the atomic checkout.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  Request layer (external): decoded checkout / CRUD calls                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐  │   │
//! │  │   │   Database   │   │ Repositories  │   │  CheckoutEngine  │  │   │
//! │  │   │  (pool.rs)   │◄──│ product, sale │   │  one transaction │  │   │
//! │  │   │  SqlitePool  │   │ discount, ... │   │  commit-or-roll  │  │   │
//! │  │   └──────────────┘   └───────────────┘   └──────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode, foreign keys on)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`checkout`] - The atomic checkout engine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//! use tally_db::checkout::CheckoutRequest;
//!
//! let db = Database::new(DbConfig::new("path/to/pos.db")).await?;
//!
//! let receipt = db
//!     .checkout()
//!     .checkout(CheckoutRequest {
//!         user_id,
//!         customer_id: None,
//!         payment_method: "cash".into(),
//!         lines,
//!         discount_codes: vec!["SAVE10".into()],
//!     })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutEngine, CheckoutError, CheckoutRequest, ErrorClass};
pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::discount::DiscountRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::user::UserRepository;
