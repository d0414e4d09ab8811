//! Checkout
//!
//! Independent recomputation of checkout totals from what the checkout runtime reports.

use rust_decimal::Decimal;
use rusty_money::{Money, iso};
use serde::{Deserialize, Serialize};

pub mod monitor;

pub use monitor::{
    AutoApplyWindow, BreakdownLine, MonitorConfig, MonitorOutput, MonitorState,
    ReconciliationMonitor, Render, Severity,
};

/// Largest difference between expected and reported totals treated as rounding.
pub const TOTAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Currency assumed when the checkout does not report one.
pub const DEFAULT_CHECKOUT_CURRENCY: &str = "AED";

/// Title shown for allocations the checkout does not name.
pub const UNTITLED_ALLOCATION: &str = "Automatic Discount";

fn default_currency_code() -> String {
    DEFAULT_CHECKOUT_CURRENCY.to_string()
}

/// How much of one discount the checkout applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountAllocation {
    /// Discount title, when the checkout reports one.
    #[serde(default)]
    pub title: Option<String>,

    /// Amount taken off.
    pub discounted_amount: Decimal,

    /// What the discount targeted, when reported.
    #[serde(default)]
    pub target_type: Option<String>,
}

impl DiscountAllocation {
    /// Title to show the shopper.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED_ALLOCATION)
    }
}

/// The cart as the checkout runtime reports it.
///
/// Pushed on every cart change and never retained beyond the render that consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSnapshot {
    /// Subtotal before discounts.
    #[serde(default)]
    pub subtotal_amount: Decimal,

    /// Total the shopper will pay.
    #[serde(default)]
    pub total_amount: Decimal,

    /// ISO currency code.
    #[serde(default = "default_currency_code")]
    pub currency_code: String,

    /// Discounts the checkout applied.
    #[serde(default)]
    pub discount_allocations: Vec<DiscountAllocation>,

    /// Codes the shopper entered.
    #[serde(default)]
    pub discount_codes: Vec<String>,
}

impl Default for CheckoutSnapshot {
    fn default() -> Self {
        Self {
            subtotal_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            currency_code: default_currency_code(),
            discount_allocations: Vec::new(),
            discount_codes: Vec::new(),
        }
    }
}

impl CheckoutSnapshot {
    /// Sum of all allocations, `None` if it does not fit in a [`Decimal`].
    pub fn discount_total(&self) -> Option<Decimal> {
        self.discount_allocations
            .iter()
            .try_fold(Decimal::ZERO, |total, allocation| {
                total.checked_add(allocation.discounted_amount)
            })
    }

    /// Whether the applied discounts came from the store rather than an entered code.
    pub fn is_automatic(&self) -> bool {
        self.discount_codes.is_empty()
            || self.discount_allocations.iter().any(|allocation| {
                allocation
                    .target_type
                    .as_deref()
                    .is_some_and(|target| target.eq_ignore_ascii_case("automatic"))
            })
    }

    /// Format `amount` in this snapshot's currency.
    pub fn format_amount(&self, amount: Decimal) -> String {
        format_money(amount, &self.currency_code)
    }
}

/// Outcome of comparing reported and expected totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Totals agree within tolerance.
    Match,

    /// The total is higher than expected, consistent with shipping or tax.
    ShippingTaxAdjusted,

    /// The total is lower than expected: something took off more than it should.
    Mismatch,
}

/// Expected and reported totals side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    /// Sum of allocations.
    pub discount_total: Decimal,

    /// Subtotal minus allocations.
    pub expected_total: Decimal,

    /// Reported total minus expected total.
    pub delta: Decimal,

    /// Classification of `delta`.
    pub verdict: Verdict,
}

impl VerificationResult {
    /// How far the total undercuts the expected total, zero if it does not.
    pub fn shortfall(&self) -> Decimal {
        if self.delta < Decimal::ZERO {
            -self.delta
        } else {
            Decimal::ZERO
        }
    }
}

/// Recompute the expected total for a snapshot and classify the difference.
///
/// Returns `None` when the reported amounts are too large to combine.
pub fn verify(snapshot: &CheckoutSnapshot) -> Option<VerificationResult> {
    let discount_total = snapshot.discount_total()?;
    let expected_total = snapshot.subtotal_amount.checked_sub(discount_total)?;
    let delta = snapshot.total_amount.checked_sub(expected_total)?;

    let verdict = if delta.abs() <= TOTAL_TOLERANCE {
        Verdict::Match
    } else if delta < Decimal::ZERO {
        Verdict::Mismatch
    } else {
        Verdict::ShippingTaxAdjusted
    };

    Some(VerificationResult {
        discount_total,
        expected_total,
        delta,
        verdict,
    })
}

/// Format an amount with the currency's symbol, or as `CODE 0.00` for unknown codes.
pub fn format_money(amount: Decimal, currency_code: &str) -> String {
    match iso::find(currency_code) {
        Some(currency) => Money::from_decimal(amount, currency).to_string(),
        None => format!("{currency_code} {amount:.2}"),
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn snapshots_parse_checkout_field_names() -> TestResult {
        let snapshot: CheckoutSnapshot = serde_json::from_str(
            r#"{
                "subtotalAmount": "100.00",
                "totalAmount": "90.00",
                "currencyCode": "GBP",
                "discountAllocations": [{ "discountedAmount": "10.00" }],
                "discountCodes": []
            }"#,
        )?;

        let allocation = snapshot.discount_allocations.first().ok_or("missing allocation")?;

        assert_eq!(snapshot.discount_total(), Some(Decimal::new(1000, 2)));
        assert_eq!(allocation.display_title(), "Automatic Discount");
        assert!(snapshot.is_automatic());

        Ok(())
    }

    #[test]
    fn missing_currency_defaults() -> TestResult {
        let snapshot: CheckoutSnapshot = serde_json::from_str(r#"{ "subtotalAmount": 5 }"#)?;

        assert_eq!(snapshot.currency_code, "AED");
        assert!(snapshot.discount_allocations.is_empty());

        Ok(())
    }

    #[test]
    fn entered_codes_make_allocations_manual() {
        let snapshot = CheckoutSnapshot {
            discount_allocations: vec![DiscountAllocation {
                title: Some("Spring".to_string()),
                discounted_amount: Decimal::new(5, 0),
                target_type: Some("LINE_ITEM".to_string()),
            }],
            discount_codes: vec!["SAVE101234".to_string()],
            ..CheckoutSnapshot::default()
        };

        assert!(!snapshot.is_automatic());
    }

    #[test]
    fn known_currencies_format_with_symbols() {
        assert_eq!(format_money(Decimal::new(270, 2), "GBP"), "£2.70");
        assert_eq!(format_money(Decimal::new(5, 0), "ZZZ"), "ZZZ 5.00");
    }

    #[test]
    fn oversized_allocations_do_not_sum() {
        let half = Decimal::MAX / Decimal::TWO + Decimal::ONE;

        let snapshot = CheckoutSnapshot {
            subtotal_amount: Decimal::new(100, 0),
            discount_allocations: vec![
                DiscountAllocation {
                    title: None,
                    discounted_amount: half,
                    target_type: None,
                };
                2
            ],
            ..CheckoutSnapshot::default()
        };

        assert_eq!(snapshot.discount_total(), None);
        assert_eq!(verify(&snapshot), None);
    }

    #[test]
    fn expected_totals_out_of_range_are_unverifiable() {
        let snapshot = CheckoutSnapshot {
            subtotal_amount: Decimal::MIN,
            discount_allocations: vec![DiscountAllocation {
                title: None,
                discounted_amount: Decimal::MAX,
                target_type: None,
            }],
            ..CheckoutSnapshot::default()
        };

        assert_eq!(verify(&snapshot), None);
    }

    #[test]
    fn shortfall_is_zero_for_surcharges() -> TestResult {
        let snapshot = CheckoutSnapshot {
            subtotal_amount: Decimal::new(100, 0),
            total_amount: Decimal::new(9250, 2),
            discount_allocations: vec![DiscountAllocation {
                title: None,
                discounted_amount: Decimal::new(10, 0),
                target_type: None,
            }],
            ..CheckoutSnapshot::default()
        };

        let result = verify(&snapshot).ok_or("totals overflowed")?;

        assert_eq!(result.shortfall(), Decimal::ZERO);

        Ok(())
    }
}
