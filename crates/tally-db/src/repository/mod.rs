//! # Repositories
//!
//! One repository per aggregate, each a thin `Clone`-able handle over
//! the shared pool. Multi-statement writes open their own transaction;
//! single-statement reads go straight to the pool.
//!
//! The checkout engine is deliberately NOT a repository: it is the only
//! place that writes sales, and it lives in [`crate::checkout`].

pub mod customer;
pub mod discount;
pub mod product;
pub mod sale;
pub mod user;

pub use customer::CustomerRepository;
pub use discount::DiscountRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;
pub use user::UserRepository;
