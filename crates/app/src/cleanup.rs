//! Conflict Scanner & Cleanup Coordinator
//!
//! Lists the store's discounts, deletes those a [`ConflictPredicate`] flags, then waits for the
//! deletions to propagate before reporting what is left. Automatic discounts are always handled
//! before code discounts. A failed delete or listing is recorded and the pass carries on.

use std::{sync::Arc, time::Duration};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{Span, info, warn};
use trellis::{
    conflicts::{ConflictPredicate, ScanContext},
    records::{DiscountId, DiscountRecord, RecordKind},
};

use crate::{
    retry::RetryPolicy,
    store::{DiscountStore, ShopInfo, StoreError},
};

/// How to wait for deletions to become visible to listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlePolicy {
    /// Re-list every `interval` until no deleted id is visible, at most `max_attempts` times.
    Poll {
        /// Delay before each listing.
        interval: Duration,

        /// Listings before giving up.
        max_attempts: u32,
    },

    /// Wait unconditionally, then check once.
    Fixed(Duration),
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::Poll {
            interval: Duration::from_millis(500),
            max_attempts: 6,
        }
    }
}

/// A discount removed by cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedDiscount {
    /// Store id.
    pub id: DiscountId,

    /// Title at deletion time.
    pub title: String,
}

/// A delete the store refused or that never completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    /// Store id.
    pub id: DiscountId,

    /// Title at deletion time.
    pub title: String,

    /// Why the delete failed.
    pub reason: String,
}

/// A listing that failed, leaving one representation unscanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanError {
    /// Representation whose listing failed.
    pub kind: RecordKind,

    /// Why the listing failed.
    pub reason: String,
}

/// Outcome of one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Automatic discounts deleted.
    pub automatic_deleted: Vec<DeletedDiscount>,

    /// Code discounts deleted.
    pub code_deleted: Vec<DeletedDiscount>,

    /// Deletes that failed.
    pub failures: Vec<DeleteFailure>,

    /// Listings that failed.
    pub scan_errors: Vec<ScanError>,

    /// Whether listings confirmed every deletion before the report was produced.
    pub settled: bool,

    /// Automatic discounts visible after cleanup.
    pub remaining_automatic: usize,

    /// Code discounts visible after cleanup.
    pub remaining_code: usize,

    /// Shop details, when the probe succeeded.
    pub shop: Option<ShopInfo>,
}

impl CleanupReport {
    /// Total discounts deleted.
    pub fn deleted_count(&self) -> usize {
        self.automatic_deleted.len() + self.code_deleted.len()
    }

    fn deleted_ids(&self) -> FxHashSet<DiscountId> {
        self.automatic_deleted
            .iter()
            .chain(&self.code_deleted)
            .map(|deleted| deleted.id.clone())
            .collect()
    }
}

/// What a store looks like after cleanup, as reported by `verify_clean`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanlinessReport {
    /// No automatic or code discounts remain.
    pub is_clean: bool,

    /// Remaining automatic discounts.
    pub automatic: Vec<DiscountRecord>,

    /// Remaining code discounts.
    pub code: Vec<DiscountRecord>,
}

/// Scans the store for conflicting discounts and removes them.
#[derive(Clone)]
pub struct CleanupCoordinator {
    store: Arc<dyn DiscountStore>,
    settle: SettlePolicy,
    retry: RetryPolicy,
}

impl std::fmt::Debug for CleanupCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupCoordinator")
            .field("settle", &self.settle)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl CleanupCoordinator {
    #[must_use]
    pub fn new(store: Arc<dyn DiscountStore>, settle: SettlePolicy, retry: RetryPolicy) -> Self {
        Self {
            store,
            settle,
            retry,
        }
    }

    /// Delete every discount `predicate` flags, wait for the deletions to settle and report.
    ///
    /// `incoming_automatic` tells the predicate whether the discount about to be created is
    /// automatic. This never fails: listing and delete failures are collected in the report.
    #[tracing::instrument(
        name = "cleanup.coordinator.cleanup",
        skip(self, predicate),
        fields(
            deleted = tracing::field::Empty,
            failed = tracing::field::Empty,
            settled = tracing::field::Empty
        )
    )]
    pub async fn cleanup(
        &self,
        predicate: &dyn ConflictPredicate,
        incoming_automatic: bool,
    ) -> CleanupReport {
        let mut report = CleanupReport {
            shop: self.probe().await,
            ..CleanupReport::default()
        };

        for kind in [RecordKind::Automatic, RecordKind::Code] {
            let records = match self.list(kind).await {
                Ok(records) => records,
                Err(error) => {
                    warn!(%kind, error = %error, "listing failed; skipping pass");

                    report.scan_errors.push(ScanError {
                        kind,
                        reason: error.to_string(),
                    });

                    continue;
                }
            };

            let context = ScanContext {
                automatic_count: if kind == RecordKind::Automatic {
                    records.len()
                } else {
                    0
                },
                incoming_automatic,
            };

            report = self
                .sweep(records, predicate, &context)
                .await
                .into_iter()
                .fold(report, |mut report, (record, outcome)| {
                    match outcome {
                        Ok(()) => {
                            let deleted = DeletedDiscount {
                                id: record.id,
                                title: record.title,
                            };

                            match kind {
                                RecordKind::Automatic => report.automatic_deleted.push(deleted),
                                RecordKind::Code => report.code_deleted.push(deleted),
                            }
                        }
                        Err(error) => report.failures.push(DeleteFailure {
                            id: record.id,
                            title: record.title,
                            reason: error.to_string(),
                        }),
                    }

                    report
                });
        }

        report.settled = self.settle(&report.deleted_ids()).await;

        let (remaining_automatic, remaining_code) = self.remaining(&mut report).await;

        report.remaining_automatic = remaining_automatic;
        report.remaining_code = remaining_code;

        let span = Span::current();

        span.record("deleted", tracing::field::display(report.deleted_count()));
        span.record("failed", tracing::field::display(report.failures.len()));
        span.record("settled", tracing::field::display(report.settled));

        info!(
            automatic_deleted = report.automatic_deleted.len(),
            code_deleted = report.code_deleted.len(),
            remaining_automatic,
            remaining_code,
            "cleanup finished"
        );

        report
    }

    /// Delete a single discount by id.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the delete fails.
    #[tracing::instrument(
        name = "cleanup.coordinator.delete",
        skip(self),
        fields(kind = %id.kind(), discount_id = %id),
        err
    )]
    pub async fn delete(&self, id: &DiscountId) -> Result<(), StoreError> {
        self.delete_record(id).await?;

        info!(discount_id = %id, "deleted discount");

        Ok(())
    }

    /// List what remains in the store.
    ///
    /// # Errors
    ///
    /// Returns an error when either listing fails.
    #[tracing::instrument(
        name = "cleanup.coordinator.verify_clean",
        skip(self),
        fields(is_clean = tracing::field::Empty),
        err
    )]
    pub async fn verify_clean(&self) -> Result<CleanlinessReport, StoreError> {
        let automatic = self.list(RecordKind::Automatic).await?;
        let code = self.list(RecordKind::Code).await?;

        let is_clean = automatic.is_empty() && code.is_empty();

        Span::current().record("is_clean", tracing::field::display(is_clean));

        Ok(CleanlinessReport {
            is_clean,
            automatic,
            code,
        })
    }

    async fn probe(&self) -> Option<ShopInfo> {
        match self
            .retry
            .run("read_shop_info", || self.store.read_shop_info())
            .await
        {
            Ok(shop) => Some(shop),
            Err(error) => {
                warn!(error = %error, "shop probe failed");
                None
            }
        }
    }

    async fn list(&self, kind: RecordKind) -> Result<Vec<DiscountRecord>, StoreError> {
        match kind {
            RecordKind::Automatic => {
                self.retry
                    .run("list_automatic_discounts", || {
                        self.store.list_automatic_discounts()
                    })
                    .await
            }
            RecordKind::Code => {
                self.retry
                    .run("list_code_discounts", || self.store.list_code_discounts())
                    .await
            }
        }
    }

    async fn delete_record(&self, id: &DiscountId) -> Result<(), StoreError> {
        match id {
            DiscountId::Automatic(id) => {
                self.retry
                    .run("delete_automatic_discount", || {
                        self.store.delete_automatic_discount(id)
                    })
                    .await
            }
            DiscountId::Code(id) => {
                self.retry
                    .run("delete_code_discount", || self.store.delete_code_discount(id))
                    .await
            }
        }
    }

    /// Delete every flagged record in order, keeping each outcome.
    async fn sweep(
        &self,
        records: Vec<DiscountRecord>,
        predicate: &dyn ConflictPredicate,
        context: &ScanContext,
    ) -> Vec<(DiscountRecord, Result<(), StoreError>)> {
        let mut outcomes = Vec::new();

        for record in records {
            if !predicate.conflicts(&record, context) {
                continue;
            }

            let outcome = self.delete_record(&record.id).await;

            if let Err(error) = &outcome {
                warn!(
                    discount_id = %record.id,
                    title = %record.title,
                    error = %error,
                    "delete failed"
                );
            }

            outcomes.push((record, outcome));
        }

        outcomes
    }

    /// `true` once no deleted id shows up in listings.
    async fn settle(&self, deleted: &FxHashSet<DiscountId>) -> bool {
        if deleted.is_empty() {
            return true;
        }

        let (interval, attempts) = match self.settle {
            SettlePolicy::Poll {
                interval,
                max_attempts,
            } => (interval, max_attempts),
            SettlePolicy::Fixed(duration) => (duration, 1),
        };

        for attempt in 1..=attempts {
            tokio::time::sleep(interval).await;

            if self.all_gone(deleted).await {
                info!(attempt, "deletions settled");
                return true;
            }
        }

        warn!(
            pending = deleted.len(),
            "deleted discounts still visible; continuing without confirmation"
        );

        false
    }

    async fn all_gone(&self, deleted: &FxHashSet<DiscountId>) -> bool {
        for kind in [RecordKind::Automatic, RecordKind::Code] {
            if !deleted.iter().any(|id| id.kind() == kind) {
                continue;
            }

            match self.list(kind).await {
                Ok(records) if records.iter().any(|record| deleted.contains(&record.id)) => {
                    return false;
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%kind, error = %error, "settle listing failed");
                    return false;
                }
            }
        }

        true
    }

    async fn remaining(&self, report: &mut CleanupReport) -> (usize, usize) {
        let mut counts = [0, 0];

        for (slot, kind) in counts
            .iter_mut()
            .zip([RecordKind::Automatic, RecordKind::Code])
        {
            match self.list(kind).await {
                Ok(records) => *slot = records.len(),
                Err(error) => report.scan_errors.push(ScanError {
                    kind,
                    reason: error.to_string(),
                }),
            }
        }

        let [automatic, code] = counts;

        (automatic, code)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use testresult::TestResult;
    use trellis::{conflicts::MarkerConflictPredicate, records::AutomaticDiscountId};

    use super::*;
    use crate::{store::MockDiscountStore, test::FakeStore};

    fn coordinator(store: Arc<dyn DiscountStore>) -> CleanupCoordinator {
        CleanupCoordinator::new(store, SettlePolicy::default(), RetryPolicy::none())
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_is_idempotent() {
        let store = Arc::new(
            FakeStore::new()
                .with_automatic("Test 10% Off", 10)
                .with_automatic("Summer Sale", 15)
                .with_code("COD Discount", 5)
                .with_propagation_lag(2),
        );

        let cleanup = coordinator(store.clone());
        let predicate = MarkerConflictPredicate::default();

        let first = cleanup.cleanup(&predicate, true).await;

        assert_eq!(first.automatic_deleted.len(), 2);
        assert_eq!(first.code_deleted.len(), 1);
        assert!(first.settled);
        assert_eq!((first.remaining_automatic, first.remaining_code), (0, 0));

        let second = cleanup.cleanup(&predicate, true).await;

        assert_eq!(second.deleted_count(), 0);
        assert!(second.failures.is_empty());
        assert!(second.settled);
    }

    #[tokio::test(start_paused = true)]
    async fn unmarked_code_discounts_survive() {
        let store = Arc::new(
            FakeStore::new()
                .with_code("Loyalty Reward 5", 5)
                .with_code("Test Code", 10),
        );

        let report = coordinator(store.clone())
            .cleanup(&MarkerConflictPredicate::default(), false)
            .await;

        let live = store.live_records().await;

        assert_eq!(report.code_deleted.len(), 1);
        assert_eq!(live.len(), 1);
        assert_eq!(
            live.first().map(|record| record.title.as_str()),
            Some("Loyalty Reward 5")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_delete_does_not_abort_the_run() {
        let store = Arc::new(
            FakeStore::new()
                .with_automatic("Stuck Test", 10)
                .with_automatic("Other Test", 10)
                .with_code("Test Code", 10)
                .with_failing_delete("Stuck Test"),
        );

        let report = coordinator(store)
            .cleanup(&MarkerConflictPredicate::default(), true)
            .await;

        assert_eq!(report.automatic_deleted.len(), 1);
        assert_eq!(report.code_deleted.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures.first().map(|failure| failure.title.as_str()),
            Some("Stuck Test")
        );
        assert_eq!(report.remaining_automatic, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_gives_up_after_the_bounded_poll() {
        let store = Arc::new(
            FakeStore::new()
                .with_automatic("Test", 10)
                .with_propagation_lag(100),
        );

        let started = tokio::time::Instant::now();

        let report = coordinator(store)
            .cleanup(&MarkerConflictPredicate::default(), true)
            .await;

        assert!(!report.settled);
        assert_eq!(report.automatic_deleted.len(), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_stops_polling_once_deletions_are_visible() {
        let store = Arc::new(
            FakeStore::new()
                .with_automatic("Test", 10)
                .with_propagation_lag(1),
        );

        let started = tokio::time::Instant::now();

        let report = coordinator(store)
            .cleanup(&MarkerConflictPredicate::default(), true)
            .await;

        assert!(report.settled);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_listing_is_recorded_and_the_code_pass_still_runs() -> TestResult {
        let mut store = MockDiscountStore::new();

        store
            .expect_read_shop_info()
            .once()
            .return_once(|| Err(StoreError::Authentication("401".to_string())));

        store
            .expect_list_automatic_discounts()
            .times(2)
            .returning(|| Err(StoreError::Protocol("bad body".to_string())));

        store
            .expect_list_code_discounts()
            .times(2)
            .returning(|| Ok(Vec::new()));

        store.expect_delete_automatic_discount().never();
        store.expect_delete_code_discount().never();

        let report = coordinator(Arc::new(store))
            .cleanup(&MarkerConflictPredicate::default(), true)
            .await;

        assert!(report.shop.is_none());
        assert_eq!(report.scan_errors.len(), 2);
        assert!(report.settled);

        let error = report.scan_errors.first().ok_or("expected a scan error")?;

        assert_eq!(error.kind, RecordKind::Automatic);

        Ok(())
    }

    #[tokio::test]
    async fn single_deletes_go_through_the_matching_call() -> TestResult {
        let mut store = MockDiscountStore::new();

        store
            .expect_delete_automatic_discount()
            .once()
            .withf(|id| id.as_str() == "gid://shopify/DiscountAutomaticNode/9")
            .return_once(|_| Ok(()));

        store.expect_delete_code_discount().never();

        coordinator(Arc::new(store))
            .delete(&DiscountId::Automatic(AutomaticDiscountId::new(
                "gid://shopify/DiscountAutomaticNode/9",
            )))
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn verify_clean_reports_leftovers() -> TestResult {
        let store = Arc::new(FakeStore::new().with_code("Loyalty Reward 5", 5));

        let report = coordinator(store).verify_clean().await?;

        assert!(!report.is_clean);
        assert!(report.automatic.is_empty());
        assert_eq!(
            report.code.first().and_then(|record| record.percentage_points()),
            Some(Decimal::new(500, 2))
        );

        Ok(())
    }
}
