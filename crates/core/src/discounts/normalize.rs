//! Normalisation
//!
//! Validation and exact encoding of discount requests. Everything here is pure: the clock is
//! passed in through [`NormalizeContext`].

use std::str::FromStr;

use jiff::{
    Timestamp, ToSpan,
    civil::{Date, DateTime},
    tz::TimeZone,
};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use super::{
    DiscountCode, DiscountKind, DiscountSpec, EncodedValue, NormalizedDiscount, Representation,
};

/// Largest difference tolerated between a raw value and the value re-derived from its encoding.
pub const ROUNDING_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Decimal places kept for percentage fractions.
const PERCENTAGE_PLACES: u32 = 4;

/// Decimal places kept for fixed amounts.
const FIXED_PLACES: u32 = 2;

/// Input rejected before it reaches the store.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Name was empty or whitespace.
    #[error("discount name must not be empty")]
    EmptyName,

    /// A numeric field could not be parsed.
    #[error("{field} must be a number, got {input:?}")]
    NotNumeric {
        /// Field name.
        field: &'static str,

        /// Input as given.
        input: String,

        /// Parser error.
        #[source]
        source: rust_decimal::Error,
    },

    /// A date field could not be parsed.
    #[error("{field} must be a date (YYYY-MM-DD), got {input:?}")]
    NotADate {
        /// Field name.
        field: &'static str,

        /// Input as given.
        input: String,

        /// Parser error.
        #[source]
        source: jiff::Error,
    },

    /// Discount value was zero or negative.
    #[error("discount value must be greater than zero, got {0}")]
    NonPositiveValue(Decimal),

    /// Percentage above 100.
    #[error("percentage must be at most 100, got {0}")]
    PercentageAboveHundred(Decimal),

    /// Minimum order value below zero.
    #[error("minimum order value must not be negative, got {0}")]
    NegativeMinimumOrder(Decimal),

    /// Maximum discount given but not positive.
    #[error("maximum discount must be greater than zero, got {0}")]
    NonPositiveMaxDiscount(Decimal),

    /// Start date after end date.
    #[error("start date {starts_on} is after end date {ends_on}")]
    InvertedDateRange {
        /// First day.
        starts_on: Date,

        /// Last day.
        ends_on: Date,
    },

    /// Value rounds to something the store cannot accept (e.g. `0.001%`).
    #[error("discount value {raw} encodes to {encoded}, which is out of range")]
    EncodedOutOfRange {
        /// Raw input.
        raw: Decimal,

        /// Rounded encoding.
        encoded: Decimal,
    },

    /// Date arithmetic left the supported calendar range.
    #[error("date window is out of range")]
    DateOutOfRange(#[source] jiff::Error),
}

/// Normalisation failure.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Bad input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The encoding no longer stands for the value the user asked for.
    #[error(
        "encoded value {encoded} re-derives to {rederived}, which is more than 0.01 away from {raw}"
    )]
    Precision {
        /// Raw input.
        raw: Decimal,

        /// Encoded value.
        encoded: Decimal,

        /// Raw value re-derived from the encoding.
        rederived: Decimal,
    },
}

/// Clock readings normalisation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeContext {
    today: Date,
    now: Timestamp,
}

impl NormalizeContext {
    /// Context for the given instant, with `today` taken in UTC.
    pub fn at(now: Timestamp) -> Self {
        Self {
            today: now.to_zoned(TimeZone::UTC).date(),
            now,
        }
    }

    /// Context for the current instant.
    pub fn now() -> Self {
        Self::at(Timestamp::now())
    }

    /// Default first day of the window.
    pub const fn today(&self) -> Date {
        self.today
    }

    /// Instant used to make codes unique.
    pub const fn timestamp(&self) -> Timestamp {
        self.now
    }
}

/// Validate a discount request and encode its value.
///
/// # Errors
///
/// Returns [`NormalizeError::Validation`] when the request is malformed and
/// [`NormalizeError::Precision`] when the encoded value would not re-derive to the requested one.
pub fn normalize(
    spec: &DiscountSpec,
    ctx: &NormalizeContext,
) -> Result<NormalizedDiscount, NormalizeError> {
    let name = spec.name.trim();

    if name.is_empty() {
        return Err(ValidationError::EmptyName.into());
    }

    let raw = spec.raw_value;

    if raw <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveValue(raw).into());
    }

    if spec.kind == DiscountKind::Percentage && raw > Decimal::ONE_HUNDRED {
        return Err(ValidationError::PercentageAboveHundred(raw).into());
    }

    if spec.min_order_value < Decimal::ZERO {
        return Err(ValidationError::NegativeMinimumOrder(spec.min_order_value).into());
    }

    if let Some(max) = spec.max_discount
        && max <= Decimal::ZERO
    {
        return Err(ValidationError::NonPositiveMaxDiscount(max).into());
    }

    let starts_on = spec.starts_on.unwrap_or(ctx.today);
    let ends_on = match spec.ends_on {
        Some(ends_on) => ends_on,
        None => ctx
            .today
            .checked_add(1.year())
            .map_err(ValidationError::DateOutOfRange)?,
    };

    if starts_on > ends_on {
        return Err(ValidationError::InvertedDateRange { starts_on, ends_on }.into());
    }

    let encoded_value = encode(spec.kind, raw)?;

    verify_round_trip(raw, &encoded_value)?;

    let representation = if spec.auto_apply {
        Representation::Automatic
    } else {
        Representation::Code(DiscountCode::generate(spec.kind, raw, ctx.now))
    };

    Ok(NormalizedDiscount {
        name: name.to_string(),
        title: format!("{name}{}", spec.order_type.title_suffix()),
        kind: spec.kind,
        raw_value: raw,
        encoded_value,
        min_order_value: spec.min_order_value,
        max_discount: spec.max_discount,
        starts_on,
        ends_on,
        starts_at: utc_instant(starts_on.at(0, 0, 0, 0))?,
        ends_at: utc_instant(ends_on.at(23, 59, 59, 0))?,
        order_type: spec.order_type,
        representation,
    })
}

/// Check that `encoded` still stands for `raw`.
///
/// # Errors
///
/// Returns [`NormalizeError::Precision`] when the re-derived value is more than
/// [`ROUNDING_TOLERANCE`] away from `raw`.
pub fn verify_round_trip(raw: Decimal, encoded: &EncodedValue) -> Result<(), NormalizeError> {
    let rederived = encoded.rederive();

    if (rederived - raw).abs() > ROUNDING_TOLERANCE {
        return Err(NormalizeError::Precision {
            raw,
            encoded: encoded.value(),
            rederived,
        });
    }

    Ok(())
}

/// Parse a user-entered amount.
///
/// # Errors
///
/// Returns [`ValidationError::NotNumeric`] when `input` is not a decimal number.
pub fn parse_amount(field: &'static str, input: &str) -> Result<Decimal, ValidationError> {
    let trimmed = input.trim();

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|source| ValidationError::NotNumeric {
            field,
            input: input.to_string(),
            source,
        })
}

/// Parse a user-entered calendar date.
///
/// # Errors
///
/// Returns [`ValidationError::NotADate`] when `input` is not an ISO 8601 date.
pub fn parse_date(field: &'static str, input: &str) -> Result<Date, ValidationError> {
    input
        .trim()
        .parse::<Date>()
        .map_err(|source| ValidationError::NotADate {
            field,
            input: input.to_string(),
            source,
        })
}

fn encode(kind: DiscountKind, raw: Decimal) -> Result<EncodedValue, ValidationError> {
    let (mut encoded, places) = match kind {
        DiscountKind::Percentage => (raw / Decimal::ONE_HUNDRED, PERCENTAGE_PLACES),
        DiscountKind::Fixed => (raw, FIXED_PLACES),
    };

    encoded = encoded.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    encoded.rescale(places);

    let in_range = match kind {
        DiscountKind::Percentage => encoded > Decimal::ZERO && encoded <= Decimal::ONE,
        DiscountKind::Fixed => encoded > Decimal::ZERO,
    };

    if !in_range {
        return Err(ValidationError::EncodedOutOfRange { raw, encoded });
    }

    Ok(EncodedValue::new(kind, encoded))
}

fn utc_instant(datetime: DateTime) -> Result<Timestamp, ValidationError> {
    datetime
        .to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .map_err(ValidationError::DateOutOfRange)
}
