//! Discounts
//!
//! A discount request starts life as a [`DiscountSpec`], which is user intent and may be wrong in
//! any number of ways. [`normalize::normalize`] turns it into a [`NormalizedDiscount`]: validated,
//! with dates resolved and its magnitude encoded exactly the way the store expects it.

use std::fmt;

use jiff::{Timestamp, civil::Date};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::records::DiscountValue;

pub mod codes;
pub mod normalize;

pub use codes::DiscountCode;

/// What the raw value of a discount measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage points off the eligible subtotal (`10` is 10%).
    Percentage,

    /// Fixed amount off the order, in currency units.
    Fixed,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        })
    }
}

/// Which orders the discount is meant for.
///
/// Basic all-items discounts cannot be gated by payment method, so the order type only reaches
/// the store as a suffix on the title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Every order.
    #[default]
    All,

    /// Cash-on-delivery orders.
    CodOnly,

    /// Orders paid up front.
    PrepaidOnly,
}

impl OrderType {
    /// Suffix appended to the discount title.
    #[must_use]
    pub const fn title_suffix(self) -> &'static str {
        match self {
            Self::All => "",
            Self::CodOnly => " (COD Only)",
            Self::PrepaidOnly => " (Prepaid Only)",
        }
    }
}

/// A discount request as the user expressed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSpec {
    /// Customer-facing name.
    pub name: String,

    /// Percentage or fixed amount.
    pub kind: DiscountKind,

    /// Percentage points or currency units, depending on `kind`.
    pub raw_value: Decimal,

    /// Minimum order subtotal, `0` for none.
    #[serde(default)]
    pub min_order_value: Decimal,

    /// Upper bound on the discount amount, if any.
    #[serde(default)]
    pub max_discount: Option<Decimal>,

    /// First day the discount applies; today when omitted.
    #[serde(default)]
    pub starts_on: Option<Date>,

    /// Last day the discount applies; a year from today when omitted.
    #[serde(default)]
    pub ends_on: Option<Date>,

    /// Which orders the discount is meant for.
    #[serde(default)]
    pub order_type: OrderType,

    /// Apply without a code.
    #[serde(default)]
    pub auto_apply: bool,
}

impl DiscountSpec {
    /// A percentage discount with no minimum, no cap and the default date window.
    pub fn percentage(name: impl Into<String>, raw_value: Decimal) -> Self {
        Self::new(name, DiscountKind::Percentage, raw_value)
    }

    /// A fixed amount discount with no minimum, no cap and the default date window.
    pub fn fixed(name: impl Into<String>, raw_value: Decimal) -> Self {
        Self::new(name, DiscountKind::Fixed, raw_value)
    }

    fn new(name: impl Into<String>, kind: DiscountKind, raw_value: Decimal) -> Self {
        Self {
            name: name.into(),
            kind,
            raw_value,
            min_order_value: Decimal::ZERO,
            max_discount: None,
            starts_on: None,
            ends_on: None,
            order_type: OrderType::All,
            auto_apply: false,
        }
    }

    /// Apply automatically rather than through a code.
    #[must_use]
    pub fn auto_apply(mut self, auto_apply: bool) -> Self {
        self.auto_apply = auto_apply;
        self
    }

    /// Require a minimum order subtotal.
    #[must_use]
    pub fn min_order_value(mut self, min_order_value: Decimal) -> Self {
        self.min_order_value = min_order_value;
        self
    }

    /// Cap the discount amount.
    #[must_use]
    pub fn max_discount(mut self, max_discount: Decimal) -> Self {
        self.max_discount = Some(max_discount);
        self
    }

    /// Set an explicit date window.
    #[must_use]
    pub fn window(mut self, starts_on: Date, ends_on: Date) -> Self {
        self.starts_on = Some(starts_on);
        self.ends_on = Some(ends_on);
        self
    }

    /// Restrict the discount to an order type.
    #[must_use]
    pub fn order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }
}

/// The magnitude of a discount exactly as transmitted to the store.
///
/// Percentages are a fraction in `(0, 1]` rounded to 4 places, fixed amounts are currency units
/// rounded to 2 places. Only the normaliser can construct one, so anything holding an
/// `EncodedValue` is holding a value that has already survived the round-trip check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EncodedValue {
    kind: DiscountKind,
    value: Decimal,
}

impl EncodedValue {
    pub(crate) const fn new(kind: DiscountKind, value: Decimal) -> Self {
        Self { kind, value }
    }

    /// Percentage or fixed amount.
    pub const fn kind(&self) -> DiscountKind {
        self.kind
    }

    /// The transmitted number: a fraction for percentages, currency units for fixed amounts.
    pub const fn value(&self) -> Decimal {
        self.value
    }

    /// The user-facing value this encoding stands for (`10` for a `0.1000` fraction).
    pub fn rederive(&self) -> Decimal {
        match self.kind {
            DiscountKind::Percentage => (self.value * Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            DiscountKind::Fixed => self.value,
        }
    }

    /// The value a store record carrying this encoding would report.
    pub fn to_record_value(&self, currency_code: Option<&str>) -> DiscountValue {
        match self.kind {
            DiscountKind::Percentage => DiscountValue::Percentage {
                fraction: self.value,
            },
            DiscountKind::Fixed => DiscountValue::FixedAmount {
                amount: self.value,
                currency_code: currency_code.map(str::to_string),
            },
        }
    }
}

/// How the discount reaches the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "code", rename_all = "snake_case")]
pub enum Representation {
    /// The store applies it to every eligible cart.
    Automatic,

    /// The shopper has to enter this code.
    Code(DiscountCode),
}

impl Representation {
    /// Whether the store applies the discount without a code.
    pub const fn is_automatic(&self) -> bool {
        matches!(self, Self::Automatic)
    }
}

/// A validated discount, ready to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedDiscount {
    name: String,
    title: String,
    kind: DiscountKind,
    raw_value: Decimal,
    encoded_value: EncodedValue,
    min_order_value: Decimal,
    max_discount: Option<Decimal>,
    starts_on: Date,
    ends_on: Date,
    starts_at: Timestamp,
    ends_at: Timestamp,
    order_type: OrderType,
    representation: Representation,
}

impl NormalizedDiscount {
    /// Name as entered, trimmed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Title sent to the store: the name plus any order-type suffix.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Percentage or fixed amount.
    pub const fn kind(&self) -> DiscountKind {
        self.kind
    }

    /// The user-facing value, kept for display only.
    pub const fn raw_value(&self) -> Decimal {
        self.raw_value
    }

    /// The value to transmit.
    pub const fn encoded_value(&self) -> EncodedValue {
        self.encoded_value
    }

    /// Minimum order subtotal, `0` for none.
    pub const fn min_order_value(&self) -> Decimal {
        self.min_order_value
    }

    /// Cap on the discount amount.
    pub const fn max_discount(&self) -> Option<Decimal> {
        self.max_discount
    }

    /// First day of the window.
    pub const fn starts_on(&self) -> Date {
        self.starts_on
    }

    /// Last day of the window.
    pub const fn ends_on(&self) -> Date {
        self.ends_on
    }

    /// Start of the first day, UTC.
    pub const fn starts_at(&self) -> Timestamp {
        self.starts_at
    }

    /// Last second of the final day, UTC.
    pub const fn ends_at(&self) -> Timestamp {
        self.ends_at
    }

    /// Which orders the discount is meant for.
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Automatic or code.
    pub const fn representation(&self) -> &Representation {
        &self.representation
    }

    /// Generated code, for code discounts.
    pub fn code(&self) -> Option<&DiscountCode> {
        match &self.representation {
            Representation::Automatic => None,
            Representation::Code(code) => Some(code),
        }
    }

    /// Short customer-facing description of the value, `10%` or `5.00 off`.
    pub fn display_value(&self) -> String {
        match self.kind {
            DiscountKind::Percentage => format!("{}%", self.raw_value.normalize()),
            DiscountKind::Fixed => format!("{:.2} off", self.encoded_value.value()),
        }
    }
}
