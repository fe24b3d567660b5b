//! # Domain Types
//!
//! Core domain types for the Tally POS backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐            │
//! │  │   Product    │   │     Sale     │   │     Discount     │            │
//! │  │ ──────────── │   │ ──────────── │   │ ──────────────── │            │
//! │  │ id (UUID)    │   │ id (UUID)    │   │ id (UUID)        │            │
//! │  │ sku (unique) │   │ user_id      │   │ code (unique)    │            │
//! │  │ price_cents  │   │ total/final  │   │ type + value     │            │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘            │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐            │
//! │  │InventoryLevel│   │   SaleItem   │   │ AppliedDiscount  │            │
//! │  │ per product  │   │  snapshot    │   │    snapshot      │            │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (sku, code, username) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// User
// =============================================================================

/// A backend user (cashier, manager).
///
/// The password hash is never serialized; the request layer only ever sees
/// id, username, role, and created_at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer a sale can optionally be attributed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product & Inventory
// =============================================================================

/// A product available for sale.
///
/// The price is authoritative at the moment a checkout looks it up; a
/// completed sale line copies the price rather than referencing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown on receipts.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Price in cents (smallest currency unit). Never negative.
    pub price_cents: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Current stock level for one product.
///
/// Invariant: `quantity` never goes negative; it is decremented only
/// inside a committed checkout transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryLevel {
    pub product_id: String,
    pub quantity: i64,
    pub last_updated: DateTime<Utc>,
}

// =============================================================================
// Discount
// =============================================================================

/// How a discount's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a fraction of the pre-discount subtotal, in basis points
    /// (1000 = 10%).
    Percentage,
    /// `value` is an absolute deduction in cents.
    FixedAmount,
}

/// A discount definition resolvable by code at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Discount {
    pub id: String,
    /// Caller-supplied token matched exactly at checkout.
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Basis points for percentage discounts, cents for fixed amounts.
    pub value: i64,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Result of resolving a discount code.
///
/// Unknown and inactive codes are *not* errors during checkout - the engine
/// skips them. Keeping the three outcomes distinct makes that leniency
/// policy explicit and testable instead of collapsing everything into
/// "continue".
#[derive(Debug, Clone)]
pub enum DiscountLookup {
    /// Code matched an active discount.
    Active(Discount),
    /// Code matched a discount that is currently disabled.
    Inactive(Discount),
    /// No discount with this code exists.
    NotFound,
}

// =============================================================================
// Cart Input
// =============================================================================

/// One requested line of a checkout cart (ephemeral input).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    /// Requested quantity. Must be positive.
    pub quantity: i64,
}

// =============================================================================
// Sale & Children
// =============================================================================

/// A committed sale. Append-only: created exactly once inside the checkout
/// transaction and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub user_id: String,
    pub customer_id: Option<String>,
    /// Pre-discount subtotal: Σ (unit price × quantity).
    pub total_amount_cents: i64,
    /// Post-discount amount actually charged, floored at zero.
    pub final_amount_cents: i64,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_cents(self.final_amount_cents)
    }
}

/// A line item in a committed sale.
///
/// Uses the snapshot pattern: `price_at_sale_cents` is the unit price at
/// the moment of sale and is never recomputed, so later price changes do
/// not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price_at_sale_cents: i64,
}

impl SaleItem {
    /// Returns the snapshotted unit price as Money.
    #[inline]
    pub fn price_at_sale(&self) -> Money {
        Money::from_cents(self.price_at_sale_cents)
    }

    /// Line total at the snapshotted price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price_at_sale().multiply_quantity(self.quantity)
    }
}

/// A discount applied to a committed sale.
///
/// `amount_discounted_cents` snapshots the currency amount actually
/// deducted, not the discount's abstract value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AppliedDiscount {
    pub sale_id: String,
    pub discount_id: String,
    pub amount_discounted_cents: i64,
}

// =============================================================================
// Receipt
// =============================================================================

/// What a successful checkout returns to the request layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub sale_id: String,
    /// Pre-discount subtotal in cents.
    pub total_amount_cents: i64,
    /// Amount actually charged in cents.
    pub final_amount_cents: i64,
    pub applied_discounts: Vec<AppliedDiscount>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_sale_item_line_total() {
        let item = SaleItem {
            sale_id: "s".to_string(),
            product_id: "p".to_string(),
            quantity: 3,
            price_at_sale_cents: 299,
        };
        assert_eq!(item.line_total().cents(), 897);
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            password_hash: "secret-hash".to_string(),
            role: "cashier".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn test_discount_type_serde_names() {
        assert_eq!(
            serde_json::to_string(&DiscountType::Percentage).unwrap(),
            "\"percentage\""
        );
        assert_eq!(
            serde_json::to_string(&DiscountType::FixedAmount).unwrap(),
            "\"fixed_amount\""
        );
    }
}
