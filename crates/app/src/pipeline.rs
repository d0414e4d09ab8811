//! Normalize, clean up, create.
//!
//! One sequential chain per request, bounded by a deadline. Each stage runs in its own span.

use std::{sync::Arc, time::Duration};

use jiff::ToSpan;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{Instrument, Span, info, info_span};
use trellis::{
    conflicts::ConflictPredicate,
    consistency::ConsistencyReport,
    discounts::{
        DiscountSpec, NormalizedDiscount,
        normalize::{NormalizeContext, NormalizeError, ValidationError, normalize},
    },
    records::DiscountId,
};

use crate::{
    cleanup::{CleanupCoordinator, CleanupReport},
    consistency::ConsistencyValidator,
    errors::DiscountError,
    writer::{CreatedDiscount, DiscountWriter},
};

/// Title of the discount the checkout fix creates.
pub const FIX_CHECKOUT_TITLE: &str = "Working 10% Off - Auto Apply";

/// Deadline used when none is configured.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Everything one pipeline run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    /// The request after validation and encoding.
    pub discount: NormalizedDiscount,

    /// What cleanup removed.
    pub cleanup: CleanupReport,

    /// What the store created.
    pub created: CreatedDiscount,
}

/// A pipeline run followed by a fresh consistency check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixCheckoutOutcome {
    /// The cleanup and create.
    pub outcome: PipelineOutcome,

    /// The store as it looks afterwards.
    pub report: ConsistencyReport,
}

/// Ties the cleanup coordinator and the writer together.
#[derive(Clone)]
pub struct Pipeline {
    cleanup: CleanupCoordinator,
    writer: DiscountWriter,
    validator: ConsistencyValidator,
    predicate: Arc<dyn ConflictPredicate>,
    deadline: Duration,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("cleanup", &self.cleanup)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(
        cleanup: CleanupCoordinator,
        writer: DiscountWriter,
        validator: ConsistencyValidator,
        predicate: Arc<dyn ConflictPredicate>,
        deadline: Duration,
    ) -> Self {
        Self {
            cleanup,
            writer,
            validator,
            predicate,
            deadline,
        }
    }

    /// Run the pipeline against the current clock.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run_with_context`].
    pub async fn run(&self, spec: &DiscountSpec) -> Result<PipelineOutcome, DiscountError> {
        self.run_with_context(spec, &NormalizeContext::now()).await
    }

    /// Normalise `spec`, remove conflicting discounts and create the new one.
    ///
    /// Nothing reaches the store when normalisation fails.
    ///
    /// # Errors
    ///
    /// Returns validation and precision errors before any store call, the writer's error when
    /// the create fails, or [`DiscountError::DeadlineExceeded`] when the whole run takes longer
    /// than the configured deadline.
    #[tracing::instrument(
        name = "pipeline.run",
        skip(self, spec, context),
        fields(
            name = %spec.name,
            kind = %spec.kind,
            auto_apply = spec.auto_apply,
            deadline_secs = self.deadline.as_secs(),
            discount_id = tracing::field::Empty
        ),
        err
    )]
    pub async fn run_with_context(
        &self,
        spec: &DiscountSpec,
        context: &NormalizeContext,
    ) -> Result<PipelineOutcome, DiscountError> {
        let outcome = tokio::time::timeout(self.deadline, self.stages(spec, context))
            .await
            .map_err(|elapsed| {
                info!(%elapsed, "pipeline deadline hit");
                DiscountError::DeadlineExceeded(self.deadline)
            })??;

        Span::current().record(
            "discount_id",
            tracing::field::display(&outcome.created.record.id),
        );

        Ok(outcome)
    }

    async fn stages(
        &self,
        spec: &DiscountSpec,
        context: &NormalizeContext,
    ) -> Result<PipelineOutcome, DiscountError> {
        let discount = info_span!("pipeline.normalize").in_scope(|| normalize(spec, context))?;

        let cleanup = self
            .cleanup
            .cleanup(
                self.predicate.as_ref(),
                discount.representation().is_automatic(),
            )
            .instrument(info_span!("pipeline.cleanup"))
            .await;

        let record = self
            .writer
            .create(&discount)
            .instrument(info_span!("pipeline.create"))
            .await?;

        let created = CreatedDiscount::new(&discount, record);

        info!(message = %created.message, "pipeline finished");

        Ok(PipelineOutcome {
            discount,
            cleanup,
            created,
        })
    }

    /// Replace problem discounts with a plain 10% automatic one, then re-check the store.
    ///
    /// # Errors
    ///
    /// Returns any pipeline error, or the validator's error when the follow-up check fails.
    #[tracing::instrument(name = "pipeline.fix_checkout", skip(self, context), err)]
    pub async fn fix_checkout(
        &self,
        context: &NormalizeContext,
    ) -> Result<FixCheckoutOutcome, DiscountError> {
        let starts_on = context.today();
        let ends_on = starts_on
            .checked_add(1.month())
            .map_err(|error| NormalizeError::from(ValidationError::DateOutOfRange(error)))?;

        let spec = DiscountSpec::percentage(FIX_CHECKOUT_TITLE, Decimal::TEN)
            .auto_apply(true)
            .window(starts_on, ends_on);

        let outcome = self.run_with_context(&spec, context).await?;
        let report = self.validator.analyze().await?;

        info!(checkout_ready = report.checkout_ready, "checkout fix applied");

        Ok(FixCheckoutOutcome { outcome, report })
    }

    /// Existing discounts cannot be edited.
    ///
    /// # Errors
    ///
    /// Always returns [`DiscountError::UpdateUnsupported`]; delete the discount and create a new
    /// one instead.
    #[tracing::instrument(name = "pipeline.update", skip(self), err)]
    pub async fn update(&self, id: &DiscountId) -> Result<(), DiscountError> {
        Err(DiscountError::UpdateUnsupported)
    }
}
