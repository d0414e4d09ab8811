//! Mutation inputs.
//!
//! Built only from [`NewAutomaticDiscount`] and [`NewCodeDiscount`], so the transmitted value is
//! always the encoded one.

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::Serialize;
use trellis::discounts::{DiscountKind, EncodedValue};

use crate::store::{NewAutomaticDiscount, NewCodeDiscount};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AutomaticBasicInput<'a> {
    title: &'a str,
    starts_at: Timestamp,
    ends_at: Timestamp,
    customer_gets: CustomerGetsInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum_requirement: Option<MinimumRequirementInput>,
}

impl<'a> From<&'a NewAutomaticDiscount> for AutomaticBasicInput<'a> {
    fn from(discount: &'a NewAutomaticDiscount) -> Self {
        Self {
            title: &discount.title,
            starts_at: discount.starts_at,
            ends_at: discount.ends_at,
            customer_gets: CustomerGetsInput::from(&discount.value),
            minimum_requirement: discount.minimum_subtotal.map(MinimumRequirementInput::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CodeBasicInput<'a> {
    title: &'a str,
    code: &'a str,
    starts_at: Timestamp,
    ends_at: Timestamp,
    customer_selection: CustomerSelectionInput,
    customer_gets: CustomerGetsInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum_requirement: Option<MinimumRequirementInput>,
}

impl<'a> From<&'a NewCodeDiscount> for CodeBasicInput<'a> {
    fn from(discount: &'a NewCodeDiscount) -> Self {
        Self {
            title: &discount.title,
            code: discount.code.as_str(),
            starts_at: discount.starts_at,
            ends_at: discount.ends_at,
            customer_selection: CustomerSelectionInput { all: true },
            customer_gets: CustomerGetsInput::from(&discount.value),
            minimum_requirement: discount.minimum_subtotal.map(MinimumRequirementInput::from),
        }
    }
}

#[derive(Debug, Serialize)]
struct CustomerSelectionInput {
    all: bool,
}

#[derive(Debug, Serialize)]
struct CustomerGetsInput {
    value: ValueInput,
    items: ItemsInput,
}

impl From<&EncodedValue> for CustomerGetsInput {
    fn from(value: &EncodedValue) -> Self {
        let value = match value.kind() {
            DiscountKind::Percentage => ValueInput::Percentage(value.value()),
            DiscountKind::Fixed => ValueInput::DiscountAmount(DiscountAmountInput {
                amount: value.value(),
                applies_on_each_item: false,
            }),
        };

        Self {
            value,
            items: ItemsInput { all: true },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum ValueInput {
    Percentage(#[serde(with = "rust_decimal::serde::float")] Decimal),
    DiscountAmount(DiscountAmountInput),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscountAmountInput {
    #[serde(with = "rust_decimal::serde::str")]
    amount: Decimal,
    applies_on_each_item: bool,
}

#[derive(Debug, Serialize)]
struct ItemsInput {
    all: bool,
}

#[derive(Debug, Serialize)]
struct MinimumRequirementInput {
    subtotal: SubtotalRequirementInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubtotalRequirementInput {
    #[serde(with = "rust_decimal::serde::str")]
    greater_than_or_equal_to_subtotal: Decimal,
}

impl From<Decimal> for MinimumRequirementInput {
    fn from(minimum: Decimal) -> Self {
        Self {
            subtotal: SubtotalRequirementInput {
                greater_than_or_equal_to_subtotal: minimum,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use serde_json::json;
    use testresult::TestResult;
    use trellis::discounts::{
        DiscountSpec,
        normalize::{NormalizeContext, normalize},
    };

    use super::*;

    fn context() -> TestResult<NormalizeContext> {
        Ok(NormalizeContext::at("2026-03-14T09:30:00Z".parse::<Timestamp>()?))
    }

    #[test]
    fn automatic_input_carries_the_encoded_fraction() -> TestResult {
        let spec = DiscountSpec::percentage("Spring", Decimal::new(10, 0)).auto_apply(true);
        let discount = NewAutomaticDiscount::new(&normalize(&spec, &context()?)?);

        let input = serde_json::to_value(AutomaticBasicInput::from(&discount))?;

        assert_eq!(
            input,
            json!({
                "title": "Spring",
                "startsAt": "2026-03-14T00:00:00Z",
                "endsAt": "2027-03-14T23:59:59Z",
                "customerGets": {
                    "value": { "percentage": 0.1 },
                    "items": { "all": true }
                }
            })
        );

        Ok(())
    }

    #[test]
    fn code_input_has_a_code_and_minimum_subtotal() -> TestResult {
        let spec = DiscountSpec::fixed("Fiver", Decimal::new(5, 0))
            .min_order_value(Decimal::new(50, 0));

        let normalized = normalize(&spec, &context()?)?;
        let code = normalized.code().cloned().ok_or("expected a code")?;
        let discount = NewCodeDiscount::new(&normalized, code.clone());

        let input = serde_json::to_value(CodeBasicInput::from(&discount))?;

        assert_eq!(input["code"], json!(code.as_str()));
        assert_eq!(input["customerSelection"], json!({ "all": true }));
        assert_eq!(
            input["customerGets"]["value"],
            json!({ "discountAmount": { "amount": "5.00", "appliesOnEachItem": false } })
        );
        assert_eq!(
            input["minimumRequirement"],
            json!({ "subtotal": { "greaterThanOrEqualToSubtotal": "50" } })
        );

        Ok(())
    }
}
