//! Checkout Consistency Validator

use std::sync::Arc;

use tracing::{Span, info, warn};
use trellis::consistency::{ConsistencyReport, evaluate};

use crate::{errors::DiscountError, retry::RetryPolicy, store::DiscountStore};

/// Read-only inspection of the store's active discounts.
#[derive(Clone)]
pub struct ConsistencyValidator {
    store: Arc<dyn DiscountStore>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ConsistencyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyValidator")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ConsistencyValidator {
    #[must_use]
    pub fn new(store: Arc<dyn DiscountStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Fetch both listings and evaluate them. Never writes to the store.
    ///
    /// # Errors
    ///
    /// Returns an error when either listing fails. A failed shop probe only loses the currency.
    #[tracing::instrument(
        name = "consistency.validator.analyze",
        skip(self),
        fields(
            checkout_ready = tracing::field::Empty,
            issue_count = tracing::field::Empty
        ),
        err
    )]
    pub async fn analyze(&self) -> Result<ConsistencyReport, DiscountError> {
        let currency = match self
            .retry
            .run("read_shop_info", || self.store.read_shop_info())
            .await
        {
            Ok(shop) => Some(shop.currency_code),
            Err(error) => {
                warn!(error = %error, "shop probe failed; using fallback currency");
                None
            }
        };

        let automatic = self
            .retry
            .run("list_automatic_discounts", || {
                self.store.list_automatic_discounts()
            })
            .await?;

        let code = self
            .retry
            .run("list_code_discounts", || self.store.list_code_discounts())
            .await?;

        let report = evaluate(&automatic, &code, currency.as_deref());

        let span = Span::current();

        span.record("checkout_ready", tracing::field::display(report.checkout_ready));
        span.record("issue_count", tracing::field::display(report.issues.len()));

        info!(
            active_automatic = report.active_automatic,
            active_code = report.active_code,
            "analysis complete"
        );

        Ok(report)
    }
}
