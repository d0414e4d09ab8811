//! Discount Writer

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{Span, info};
use trellis::{
    discounts::{
        DiscountCode, DiscountKind, EncodedValue, NormalizedDiscount, Representation,
        normalize::ROUNDING_TOLERANCE,
    },
    records::{DiscountRecord, DiscountValue},
};

use crate::{
    errors::ErrorKind,
    store::{DiscountStore, NewAutomaticDiscount, NewCodeDiscount, StoreError},
};

/// Errors creating a discount.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store accepted the discount but reports a different value.
    #[error("store reports {reported} for discount {title:?}, expected {expected}")]
    ValueDrift {
        /// Title of the created discount.
        title: String,

        /// Value we transmitted.
        expected: Decimal,

        /// Value the store echoed.
        reported: Decimal,
    },
}

impl WriteError {
    /// Taxonomy kind for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(error) => error.kind(),
            Self::ValueDrift { .. } => ErrorKind::OpaqueFailure,
        }
    }
}

/// A discount the store accepted, with the message shown to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedDiscount {
    /// The record as the store reported it.
    pub record: DiscountRecord,

    /// Code to enter at checkout, for code discounts.
    pub code: Option<DiscountCode>,

    /// Whether the store applies it without a code.
    pub automatic: bool,

    /// Customer-facing summary.
    pub message: String,
}

impl CreatedDiscount {
    pub fn new(discount: &NormalizedDiscount, record: DiscountRecord) -> Self {
        let value = match discount.kind() {
            DiscountKind::Percentage => format!("{}%", discount.raw_value().normalize()),
            DiscountKind::Fixed => format!("{:.2}", discount.encoded_value().value()),
        };

        let delivery = match discount.representation() {
            Representation::Automatic => "Auto-applies at checkout".to_string(),
            Representation::Code(code) => format!("Code: {code}"),
        };

        Self {
            record,
            code: discount.code().cloned(),
            automatic: discount.representation().is_automatic(),
            message: format!("{value} discount created successfully! {delivery}"),
        }
    }
}

/// Creates exactly one store discount per normalised request.
#[derive(Clone)]
pub struct DiscountWriter {
    store: Arc<dyn DiscountStore>,
}

impl std::fmt::Debug for DiscountWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscountWriter").finish_non_exhaustive()
    }
}

impl DiscountWriter {
    #[must_use]
    pub fn new(store: Arc<dyn DiscountStore>) -> Self {
        Self { store }
    }

    /// Create `discount` through the representation it asks for.
    ///
    /// Creates are never retried: a create that timed out may still have gone through.
    ///
    /// # Errors
    ///
    /// Returns the store's error, or [`WriteError::ValueDrift`] when the store echoes a value
    /// that no longer matches what was transmitted.
    #[tracing::instrument(
        name = "writer.create",
        skip(self, discount),
        fields(
            title = %discount.title(),
            automatic = discount.representation().is_automatic(),
            encoded_value = %discount.encoded_value().value(),
            discount_id = tracing::field::Empty
        ),
        err
    )]
    pub async fn create(
        &self,
        discount: &NormalizedDiscount,
    ) -> Result<DiscountRecord, WriteError> {
        let record = match discount.representation() {
            Representation::Automatic => {
                self.store
                    .create_automatic_discount(&NewAutomaticDiscount::new(discount))
                    .await?
            }
            Representation::Code(code) => {
                self.store
                    .create_code_discount(&NewCodeDiscount::new(discount, code.clone()))
                    .await?
            }
        };

        Span::current().record("discount_id", tracing::field::display(&record.id));

        check_echo(&record, &discount.encoded_value())?;

        info!(discount_id = %record.id, kind = %record.representation(), "discount created");

        Ok(record)
    }
}

/// Compare the value the store echoed with the one we sent.
fn check_echo(record: &DiscountRecord, sent: &EncodedValue) -> Result<(), WriteError> {
    let Some(value) = &record.value else {
        return Ok(());
    };

    let (expected, reported, comparable) = match (sent.kind(), value) {
        (DiscountKind::Percentage, DiscountValue::Percentage { fraction }) => {
            (sent.rederive(), *fraction * Decimal::ONE_HUNDRED, true)
        }
        (DiscountKind::Fixed, DiscountValue::FixedAmount { amount, .. }) => {
            (sent.value(), *amount, true)
        }
        (_, DiscountValue::Percentage { fraction }) => (sent.value(), *fraction, false),
        (_, DiscountValue::FixedAmount { amount, .. }) => (sent.value(), *amount, false),
    };

    if !comparable || (expected - reported).abs() > ROUNDING_TOLERANCE {
        return Err(WriteError::ValueDrift {
            title: record.title.clone(),
            expected,
            reported,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;
    use trellis::{
        discounts::{
            DiscountSpec,
            normalize::{NormalizeContext, normalize},
        },
        records::{AutomaticDiscountId, CodeDiscountId, DiscountId, DiscountStatus},
    };

    use super::*;
    use crate::store::MockDiscountStore;

    fn context() -> TestResult<NormalizeContext> {
        Ok(NormalizeContext::at(
            "2026-03-14T09:30:00Z".parse::<Timestamp>()?,
        ))
    }

    fn automatic_record(fraction: Decimal) -> DiscountRecord {
        DiscountRecord {
            id: DiscountId::Automatic(AutomaticDiscountId::new(
                "gid://shopify/DiscountAutomaticNode/1",
            )),
            title: "Spring".to_string(),
            status: DiscountStatus::Active,
            value: Some(DiscountValue::Percentage { fraction }),
            code: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn automatic_discounts_transmit_the_encoded_fraction() -> TestResult {
        let discount = normalize(
            &DiscountSpec::percentage("Spring", Decimal::new(10, 0)).auto_apply(true),
            &context()?,
        )?;

        let mut store = MockDiscountStore::new();

        store
            .expect_create_automatic_discount()
            .once()
            .withf(|new| {
                new.title == "Spring"
                    && new.value.value() == Decimal::new(1000, 4)
                    && new.minimum_subtotal.is_none()
            })
            .return_once(|_| Ok(automatic_record(Decimal::new(1, 1))));

        store.expect_create_code_discount().never();

        let record = DiscountWriter::new(Arc::new(store)).create(&discount).await?;

        assert_eq!(record.title, "Spring");

        let created = CreatedDiscount::new(&discount, record);

        assert_eq!(
            created.message,
            "10% discount created successfully! Auto-applies at checkout"
        );
        assert!(created.code.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn code_discounts_carry_the_generated_code() -> TestResult {
        let discount = normalize(&DiscountSpec::fixed("Fiver", Decimal::new(5, 0)), &context()?)?;

        let expected_code = discount.code().cloned().ok_or("expected a code")?;

        let mut store = MockDiscountStore::new();

        let code = expected_code.clone();

        store
            .expect_create_code_discount()
            .once()
            .withf(move |new| new.code == code && new.value.value() == Decimal::new(5, 0))
            .return_once(|new| {
                Ok(DiscountRecord {
                    id: DiscountId::Code(CodeDiscountId::new("gid://shopify/DiscountCodeNode/2")),
                    title: new.title.clone(),
                    status: DiscountStatus::Active,
                    value: Some(DiscountValue::FixedAmount {
                        amount: Decimal::new(500, 2),
                        currency_code: Some("AED".to_string()),
                    }),
                    code: Some(new.code.to_string()),
                    created_at: None,
                })
            });

        store.expect_create_automatic_discount().never();

        let record = DiscountWriter::new(Arc::new(store)).create(&discount).await?;
        let created = CreatedDiscount::new(&discount, record);

        assert_eq!(
            created.message,
            format!("5.00 discount created successfully! Code: {expected_code}")
        );

        Ok(())
    }

    #[tokio::test]
    async fn a_drifted_echo_is_reported() -> TestResult {
        let discount = normalize(
            &DiscountSpec::percentage("Spring", Decimal::new(10, 0)).auto_apply(true),
            &context()?,
        )?;

        let mut store = MockDiscountStore::new();

        store
            .expect_create_automatic_discount()
            .once()
            .return_once(|_| Ok(automatic_record(Decimal::new(1, 3))));

        let result = DiscountWriter::new(Arc::new(store)).create(&discount).await;

        assert!(matches!(
            result,
            Err(WriteError::ValueDrift { expected, reported, .. })
                if expected == Decimal::new(10, 0) && reported == Decimal::new(1, 1)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn permission_errors_are_returned_after_one_attempt() -> TestResult {
        let discount = normalize(
            &DiscountSpec::percentage("Spring", Decimal::new(10, 0)).auto_apply(true),
            &context()?,
        )?;

        let mut store = MockDiscountStore::new();

        store.expect_create_automatic_discount().once().return_once(|_| {
            Err(StoreError::Permission(
                "Access denied: write_discounts".to_string(),
            ))
        });

        let result = DiscountWriter::new(Arc::new(store)).create(&discount).await;

        let Err(error) = result else {
            return Err("expected a permission error".into());
        };

        assert_eq!(error.kind(), ErrorKind::Permission);

        Ok(())
    }
}
