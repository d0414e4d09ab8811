//! Consistency
//!
//! Read-only heuristics over the store's active discounts that flag configurations likely to
//! break checkout arithmetic.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::records::{DiscountId, DiscountRecord, DiscountValue, RecordKind};

/// Percentage points at which a discount is worth checking by hand.
pub const HIGH_PERCENTAGE_POINTS: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Currency reported when the store's currency is unknown.
pub const FALLBACK_CURRENCY: &str = "USD";

/// A configuration likely to produce wrong totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum Issue {
    /// Several automatic discounts are active; the store does not order them deterministically.
    StackingRisk {
        /// Active automatic discounts.
        active_automatic: usize,
    },

    /// Automatic and code discounts are both active.
    MixedModeRisk {
        /// Active automatic discounts.
        active_automatic: usize,

        /// Active code discounts.
        active_code: usize,
    },

    /// A percentage discount large enough that its totals should be checked by hand.
    VerifyCalculation {
        /// Offending discount.
        id: DiscountId,

        /// Its title.
        title: String,

        /// Percentage points.
        percentage: Decimal,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackingRisk { active_automatic } => write!(
                f,
                "{active_automatic} automatic discounts are active and may stack unpredictably"
            ),
            Self::MixedModeRisk {
                active_automatic,
                active_code,
            } => write!(
                f,
                "{active_automatic} automatic and {active_code} code discounts are active; verify stacking behaviour"
            ),
            Self::VerifyCalculation {
                title, percentage, ..
            } => write!(
                f,
                "\"{title}\" takes {}% off; verify checkout totals by hand",
                percentage.normalize()
            ),
        }
    }
}

/// Next step for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Nothing is active.
    CreateTestDiscount,

    /// Issues were found.
    CleanUpConflicts,

    /// Follows a cleanup.
    TestWithSimpleDiscount,

    /// Configuration looks fine.
    ProceedToCheckout,

    /// Always worth doing once discounts are live.
    VerifyAtCheckout,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateTestDiscount => {
                "No active discounts found. Create a test discount to verify checkout calculations."
            }
            Self::CleanUpConflicts => "Issues detected. Clean up conflicting discounts.",
            Self::TestWithSimpleDiscount => "Test checkout with a simple 10% discount first.",
            Self::ProceedToCheckout => "Discount configuration looks good for checkout testing.",
            Self::VerifyAtCheckout => {
                "Verify discount amounts are calculated correctly at checkout."
            }
        })
    }
}

/// An active discount as shown in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveDiscount {
    /// Store id.
    pub id: DiscountId,

    /// Automatic or code.
    pub kind: RecordKind,

    /// Title.
    pub title: String,

    /// Value, when the store reported one we understand.
    pub value: Option<DiscountValue>,
}

/// Outcome of a consistency analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// `true` when no issues were found.
    pub checkout_ready: bool,

    /// Active automatic discounts.
    pub active_automatic: usize,

    /// Active code discounts.
    pub active_code: usize,

    /// Store currency.
    pub currency_code: String,

    /// Every active discount considered.
    pub discounts: Vec<ActiveDiscount>,

    /// Issues, in detection order.
    pub issues: Vec<Issue>,

    /// Recommendations, in the order they should be followed.
    pub recommendations: Vec<Recommendation>,
}

/// Evaluate the store's automatic and code discounts.
///
/// Only `Active` records are considered; pending and expired discounts cannot affect a checkout
/// happening now.
pub fn evaluate(
    automatic: &[DiscountRecord],
    code: &[DiscountRecord],
    currency_code: Option<&str>,
) -> ConsistencyReport {
    let active_automatic: Vec<&DiscountRecord> =
        automatic.iter().filter(|record| record.is_active()).collect();

    let active_code: Vec<&DiscountRecord> =
        code.iter().filter(|record| record.is_active()).collect();

    let mut issues = Vec::new();

    if active_automatic.len() > 1 {
        issues.push(Issue::StackingRisk {
            active_automatic: active_automatic.len(),
        });
    }

    if !active_automatic.is_empty() && !active_code.is_empty() {
        issues.push(Issue::MixedModeRisk {
            active_automatic: active_automatic.len(),
            active_code: active_code.len(),
        });
    }

    for record in active_automatic.iter().chain(&active_code) {
        if let Some(percentage) = record.percentage_points()
            && percentage >= HIGH_PERCENTAGE_POINTS
        {
            issues.push(Issue::VerifyCalculation {
                id: record.id.clone(),
                title: record.title.clone(),
                percentage,
            });
        }
    }

    let recommendations = if active_automatic.is_empty() && active_code.is_empty() {
        vec![Recommendation::CreateTestDiscount]
    } else if issues.is_empty() {
        vec![
            Recommendation::ProceedToCheckout,
            Recommendation::VerifyAtCheckout,
        ]
    } else {
        vec![
            Recommendation::CleanUpConflicts,
            Recommendation::TestWithSimpleDiscount,
        ]
    };

    let discounts = active_automatic
        .iter()
        .chain(&active_code)
        .map(|record| ActiveDiscount {
            id: record.id.clone(),
            kind: record.representation(),
            title: record.title.clone(),
            value: record.value.clone(),
        })
        .collect();

    ConsistencyReport {
        checkout_ready: issues.is_empty(),
        active_automatic: active_automatic.len(),
        active_code: active_code.len(),
        currency_code: currency_code.unwrap_or(FALLBACK_CURRENCY).to_string(),
        discounts,
        issues,
        recommendations,
    }
}
