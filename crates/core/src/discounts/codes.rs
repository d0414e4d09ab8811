//! Discount codes

use std::fmt;

use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use super::DiscountKind;

/// A code the shopper types at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountCode(String);

impl DiscountCode {
    /// Generate a code of the form `{SAVE|OFF}{floor(raw)}{4 digits}`.
    ///
    /// The trailing digits are the last four of the millisecond clock, which keeps codes created
    /// in quick succession for the same value apart without any extra state.
    pub fn generate(kind: DiscountKind, raw_value: Decimal, now: Timestamp) -> Self {
        let prefix = match kind {
            DiscountKind::Percentage => "SAVE",
            DiscountKind::Fixed => "OFF",
        };

        let whole = raw_value.floor().to_i64().unwrap_or_default();
        let suffix = now.as_millisecond().rem_euclid(10_000);

        Self(format!("{prefix}{whole}{suffix:04}"))
    }

    /// Borrow the code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiscountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DiscountCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn percentage_codes_use_save_and_floor_the_value() -> TestResult {
        let now = Timestamp::from_millisecond(1_760_000_001_234)?;
        let code = DiscountCode::generate(DiscountKind::Percentage, Decimal::new(125, 1), now);

        assert_eq!(code.as_str(), "SAVE121234");

        Ok(())
    }

    #[test]
    fn fixed_codes_use_off_and_pad_the_suffix() -> TestResult {
        let now = Timestamp::from_millisecond(1_760_000_000_042)?;
        let code = DiscountCode::generate(DiscountKind::Fixed, Decimal::new(5, 0), now);

        assert_eq!(code.as_str(), "OFF50042");

        Ok(())
    }
}
