//! # Pricing Module
//!
//! Pure checkout math: line pricing, subtotals, discount resolution, and
//! the zero-clamped final amount.
//!
//! ## Checkout Pricing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Pricing Pipeline                           │
//! │                                                                         │
//! │  CartLine[]  ──(catalog lookup in tally-db)──►  PricedLine[]            │
//! │       │                                              │                  │
//! │       ▼                                              ▼                  │
//! │  requested_per_product()                        subtotal()              │
//! │  (merged stock check)                                │                  │
//! │                                                      ▼                  │
//! │  DiscountLookup[]  ──► resolve_discount() ──► DiscountOutcome[]         │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                          final_amount() = max(0, subtotal − Σ amounts)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is deterministic: the checkout engine performs the
//! lookups, these functions decide the numbers, and the audit trail
//! (SaleItem, AppliedDiscount) snapshots the results.

use crate::money::Money;
use crate::types::{CartLine, Discount, DiscountLookup, DiscountType};

// =============================================================================
// Priced Lines
// =============================================================================

/// A cart line with its unit price captured from the catalog.
///
/// The price is looked up exactly once per line, inside the checkout
/// transaction, and reused for both the subtotal and the persisted
/// `price_at_sale` snapshot. Re-fetching it later could race a price
/// change mid-transaction.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl PricedLine {
    /// Line total: unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Pre-discount subtotal: Σ line totals, in input order.
pub fn subtotal(lines: &[PricedLine]) -> Money {
    lines
        .iter()
        .fold(Money::zero(), |acc, line| acc + line.line_total())
}

/// Merges requested quantities per product id, preserving first-seen order.
///
/// Stock must be validated against the *cumulative* quantity a cart
/// requests for a product. Checking each line against the pre-decrement
/// level would approve a cart of {A×3, A×3} with stock 4.
pub fn requested_per_product(lines: &[CartLine]) -> Vec<(String, i64)> {
    let mut totals: Vec<(String, i64)> = Vec::new();
    for line in lines {
        match totals.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, qty)) => *qty += line.quantity,
            None => totals.push((line.product_id.clone(), line.quantity)),
        }
    }
    totals
}

// =============================================================================
// Discount Resolution
// =============================================================================

/// Outcome of resolving one discount code against the subtotal.
///
/// Skips are deliberate policy, not errors: the original tolerant-input
/// behavior is that unknown and inactive codes are ignored. Each outcome
/// names why, so the policy stays visible in logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountOutcome {
    /// The code matched an active discount; `amount` is the currency
    /// deduction against the subtotal.
    Applied { discount_id: String, amount: Money },
    /// The code matched a discount that is disabled.
    SkippedInactive { code: String },
    /// No discount with this code exists.
    SkippedUnknown { code: String },
}

/// Computes the currency deduction an active discount takes off a subtotal.
///
/// Percentage values are basis points of the subtotal; fixed amounts are
/// flat cents regardless of subtotal.
pub fn deduction(subtotal: Money, discount: &Discount) -> Money {
    match discount.discount_type {
        DiscountType::Percentage => subtotal.percentage_of(discount.value as u32),
        DiscountType::FixedAmount => Money::from_cents(discount.value),
    }
}

/// Resolves one discount code lookup into an outcome.
///
/// Resolution of a code is independent of every other code: the deduction
/// is always computed against the pre-discount subtotal, and a skipped
/// code never affects processing of the next.
pub fn resolve_discount(code: &str, lookup: DiscountLookup, subtotal: Money) -> DiscountOutcome {
    match lookup {
        DiscountLookup::Active(discount) => DiscountOutcome::Applied {
            amount: deduction(subtotal, &discount),
            discount_id: discount.id,
        },
        DiscountLookup::Inactive(_) => DiscountOutcome::SkippedInactive {
            code: code.to_string(),
        },
        DiscountLookup::NotFound => DiscountOutcome::SkippedUnknown {
            code: code.to_string(),
        },
    }
}

// =============================================================================
// Final Amount
// =============================================================================

/// Post-discount amount actually charged: subtotal − total deduction,
/// clamped at zero. Overlapping discounts can exceed the subtotal; the
/// sale then charges nothing rather than a negative amount.
#[inline]
pub fn final_amount(subtotal: Money, total_deduction: Money) -> Money {
    (subtotal - total_deduction).clamp_non_negative()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn discount(discount_type: DiscountType, value: i64) -> Discount {
        Discount {
            id: "d-1".to_string(),
            code: "SAVE10".to_string(),
            description: None,
            discount_type,
            value,
            is_active: true,
            valid_from: None,
            valid_until: None,
            created_at: Utc::now(),
        }
    }

    fn line(product_id: &str, quantity: i64, unit_cents: i64) -> PricedLine {
        PricedLine {
            product_id: product_id.to_string(),
            quantity,
            unit_price: Money::from_cents(unit_cents),
        }
    }

    #[test]
    fn test_subtotal_sums_line_totals_in_order() {
        let lines = vec![line("a", 2, 1000), line("b", 1, 500)];
        assert_eq!(subtotal(&lines).cents(), 2500);
    }

    #[test]
    fn test_subtotal_empty_cart_is_zero() {
        assert_eq!(subtotal(&[]).cents(), 0);
    }

    #[test]
    fn test_requested_per_product_merges_duplicate_lines() {
        let lines = vec![
            CartLine {
                product_id: "a".to_string(),
                quantity: 3,
            },
            CartLine {
                product_id: "b".to_string(),
                quantity: 1,
            },
            CartLine {
                product_id: "a".to_string(),
                quantity: 3,
            },
        ];
        let totals = requested_per_product(&lines);
        assert_eq!(totals, vec![("a".to_string(), 6), ("b".to_string(), 1)]);
    }

    #[test]
    fn test_percentage_deduction() {
        // $20.00 at 10% (1000 bps) = $2.00
        let d = discount(DiscountType::Percentage, 1000);
        assert_eq!(deduction(Money::from_cents(2000), &d).cents(), 200);
    }

    #[test]
    fn test_fixed_amount_deduction_ignores_subtotal() {
        let d = discount(DiscountType::FixedAmount, 500);
        assert_eq!(deduction(Money::from_cents(2000), &d).cents(), 500);
        assert_eq!(deduction(Money::from_cents(100), &d).cents(), 500);
    }

    #[test]
    fn test_resolve_active_discount() {
        let d = discount(DiscountType::Percentage, 1000);
        let outcome = resolve_discount("SAVE10", DiscountLookup::Active(d), Money::from_cents(2000));
        assert_eq!(
            outcome,
            DiscountOutcome::Applied {
                discount_id: "d-1".to_string(),
                amount: Money::from_cents(200),
            }
        );
    }

    #[test]
    fn test_resolve_inactive_and_unknown_are_skips() {
        let mut d = discount(DiscountType::Percentage, 1000);
        d.is_active = false;
        let subtotal = Money::from_cents(2000);

        assert_eq!(
            resolve_discount("SAVE10", DiscountLookup::Inactive(d), subtotal),
            DiscountOutcome::SkippedInactive {
                code: "SAVE10".to_string()
            }
        );
        assert_eq!(
            resolve_discount("NOPE", DiscountLookup::NotFound, subtotal),
            DiscountOutcome::SkippedUnknown {
                code: "NOPE".to_string()
            }
        );
    }

    #[test]
    fn test_skipped_code_does_not_affect_later_codes() {
        // Resolution is per-code against the same subtotal, so a skip in
        // the middle changes nothing for its neighbors.
        let subtotal = Money::from_cents(2000);
        let active = discount(DiscountType::Percentage, 1000);

        let first = resolve_discount("NOPE", DiscountLookup::NotFound, subtotal);
        let second = resolve_discount("SAVE10", DiscountLookup::Active(active.clone()), subtotal);
        assert!(matches!(first, DiscountOutcome::SkippedUnknown { .. }));
        assert_eq!(
            second,
            DiscountOutcome::Applied {
                discount_id: "d-1".to_string(),
                amount: Money::from_cents(200),
            }
        );

        // Same cart, same codes → same outcome (determinism).
        let again = resolve_discount("SAVE10", DiscountLookup::Active(active), subtotal);
        assert_eq!(second, again);
    }

    #[test]
    fn test_final_amount_clamps_to_zero() {
        // Subtotal $20.00, deductions $15.00 + $10.00 → clamps to 0
        let total = final_amount(Money::from_cents(2000), Money::from_cents(2500));
        assert_eq!(total.cents(), 0);
    }

    #[test]
    fn test_final_amount_normal_case() {
        let total = final_amount(Money::from_cents(2000), Money::from_cents(200));
        assert_eq!(total.cents(), 1800);
    }
}
