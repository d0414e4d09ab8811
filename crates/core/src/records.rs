//! Discount Records
//!
//! State held by the external discount store. Records are read, classified and deleted by this
//! crate's consumers but their status is only ever changed by the store itself.

use std::fmt;

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::TypedId;

/// Marker for automatic discount nodes.
#[derive(Debug)]
pub enum AutomaticNode {}

/// Marker for code discount nodes.
#[derive(Debug)]
pub enum CodeNode {}

/// Automatic Discount Id
pub type AutomaticDiscountId = TypedId<AutomaticNode>;

/// Code Discount Id
pub type CodeDiscountId = TypedId<CodeNode>;

/// How a discount reaches the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Applied by the store to every eligible cart.
    Automatic,

    /// Applied only when the shopper enters a code.
    Code,
}

impl RecordKind {
    /// Lowercase label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Id of a discount held by the store, tagged with its representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DiscountId {
    /// An automatic discount node.
    Automatic(AutomaticDiscountId),

    /// A code discount node.
    Code(CodeDiscountId),
}

impl DiscountId {
    /// Representation of the discount this id names.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Automatic(_) => RecordKind::Automatic,
            Self::Code(_) => RecordKind::Code,
        }
    }

    /// Raw store id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Automatic(id) => id.as_str(),
            Self::Code(id) => id.as_str(),
        }
    }
}

impl fmt::Display for DiscountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-reported discount status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountStatus {
    /// Currently applies at checkout.
    Active,

    /// Scheduled for the future.
    Pending,

    /// Past its end date.
    Expired,

    /// Any status the store reports that we do not recognise.
    Unknown,
}

impl DiscountStatus {
    /// Map the store's status string (`ACTIVE`, `SCHEDULED`, `EXPIRED`, ...).
    #[must_use]
    pub fn from_store(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "SCHEDULED" | "PENDING" => Self::Pending,
            "EXPIRED" => Self::Expired,
            _ => Self::Unknown,
        }
    }
}

/// The magnitude of a stored discount, as the store reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountValue {
    /// Fraction of the eligible subtotal, `0.1` for 10%.
    Percentage {
        /// Decimal fraction in `(0, 1]` for well-formed discounts.
        fraction: Decimal,
    },

    /// Fixed amount off the order.
    FixedAmount {
        /// Amount in currency units.
        amount: Decimal,

        /// ISO currency code, when reported.
        currency_code: Option<String>,
    },
}

impl DiscountValue {
    /// Percentage points (`10` for a `0.1` fraction), if this is a percentage discount.
    #[must_use]
    pub fn percentage_points(&self) -> Option<Decimal> {
        match self {
            Self::Percentage { fraction } => Some(*fraction * Decimal::ONE_HUNDRED),
            Self::FixedAmount { .. } => None,
        }
    }
}

impl fmt::Display for DiscountValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percentage { fraction } => {
                write!(f, "{}%", (*fraction * Decimal::ONE_HUNDRED).round_dp(2).normalize())
            }
            Self::FixedAmount {
                amount,
                currency_code: Some(code),
            } => write!(f, "{code} {amount:.2}"),
            Self::FixedAmount {
                amount,
                currency_code: None,
            } => write!(f, "{amount:.2}"),
        }
    }
}

/// A discount as held by the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRecord {
    /// Store-assigned id, tagged with the representation.
    pub id: DiscountId,

    /// Customer-facing title.
    pub title: String,

    /// Store-reported status.
    pub status: DiscountStatus,

    /// Magnitude, absent for discount types this crate does not model.
    pub value: Option<DiscountValue>,

    /// Redeemable code; only present for code discounts.
    pub code: Option<String>,

    /// When the store created the record, if reported.
    pub created_at: Option<Timestamp>,
}

impl DiscountRecord {
    /// Automatic or code representation.
    #[must_use]
    pub const fn representation(&self) -> RecordKind {
        self.id.kind()
    }

    /// Whether the store currently applies this discount.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == DiscountStatus::Active
    }

    /// Percentage points, for percentage discounts.
    #[must_use]
    pub fn percentage_points(&self) -> Option<Decimal> {
        self.value.as_ref().and_then(DiscountValue::percentage_points)
    }
}
