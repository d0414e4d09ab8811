//! In-memory, eventually consistent discount store.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use tokio::sync::Mutex;
use trellis::records::{
    AutomaticDiscountId, CodeDiscountId, DiscountId, DiscountRecord, DiscountStatus,
    DiscountValue,
};

use crate::store::{
    DiscountStore, NewAutomaticDiscount, NewCodeDiscount, ShopInfo, StoreError, UserError,
};

pub(crate) const SHOP_CURRENCY: &str = "AED";

#[derive(Debug)]
struct Entry {
    record: DiscountRecord,

    /// Listings that will still show the record after it was deleted.
    lingering_reads: Option<u32>,
}

impl Entry {
    fn is_deleted(&self) -> bool {
        self.lingering_reads.is_some()
    }
}

/// A store whose deletes take a configurable number of listings to become visible.
#[derive(Debug, Default)]
pub(crate) struct FakeStore {
    entries: Mutex<Vec<Entry>>,
    failing_deletes: FxHashSet<String>,
    propagation_lag: u32,
    next_id: AtomicU32,
    creates: AtomicU32,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Deleted records stay visible for `reads` further listings.
    pub(crate) fn with_propagation_lag(mut self, reads: u32) -> Self {
        self.propagation_lag = reads;
        self
    }

    /// Deletes of records with this title are rejected.
    pub(crate) fn with_failing_delete(mut self, title: &str) -> Self {
        self.failing_deletes.insert(title.to_string());
        self
    }

    pub(crate) fn with_automatic(self, title: &str, percentage: i64) -> Self {
        self.seed(true, title, percentage, DiscountStatus::Active)
    }

    pub(crate) fn with_code(self, title: &str, percentage: i64) -> Self {
        self.seed(false, title, percentage, DiscountStatus::Active)
    }

    pub(crate) fn with_expired_automatic(self, title: &str, percentage: i64) -> Self {
        self.seed(true, title, percentage, DiscountStatus::Expired)
    }

    fn seed(
        mut self,
        automatic: bool,
        title: &str,
        percentage: i64,
        status: DiscountStatus,
    ) -> Self {
        let id = self.allocate_id(automatic);

        self.entries.get_mut().push(Entry {
            record: DiscountRecord {
                id,
                title: title.to_string(),
                status,
                value: Some(DiscountValue::Percentage {
                    fraction: Decimal::new(percentage, 2),
                }),
                code: (!automatic).then(|| format!("SEED{percentage}")),
                created_at: None,
            },
            lingering_reads: None,
        });

        self
    }

    fn allocate_id(&self, automatic: bool) -> DiscountId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        if automatic {
            DiscountId::Automatic(AutomaticDiscountId::new(format!(
                "gid://shopify/DiscountAutomaticNode/{n}"
            )))
        } else {
            DiscountId::Code(CodeDiscountId::new(format!(
                "gid://shopify/DiscountCodeNode/{n}"
            )))
        }
    }

    /// Number of create calls received.
    pub(crate) fn create_calls(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    /// Records that have not been deleted, regardless of what listings show.
    pub(crate) async fn live_records(&self) -> Vec<DiscountRecord> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|entry| !entry.is_deleted())
            .map(|entry| entry.record.clone())
            .collect()
    }

    async fn list(&self, automatic: bool) -> Vec<DiscountRecord> {
        let mut entries = self.entries.lock().await;

        let visible = entries
            .iter()
            .filter(|entry| matches!(entry.record.id, DiscountId::Automatic(_)) == automatic)
            .filter(|entry| entry.lingering_reads.is_none_or(|reads| reads > 0))
            .map(|entry| entry.record.clone())
            .collect();

        for entry in entries
            .iter_mut()
            .filter(|entry| matches!(entry.record.id, DiscountId::Automatic(_)) == automatic)
        {
            if let Some(reads) = entry.lingering_reads.as_mut() {
                *reads = reads.saturating_sub(1);
            }
        }

        visible
    }

    async fn delete(&self, id: &DiscountId) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;

        let entry = entries
            .iter_mut()
            .find(|entry| entry.record.id == *id && !entry.is_deleted())
            .ok_or_else(|| {
                StoreError::UserErrors(vec![UserError {
                    field: Some(vec!["id".to_string()]),
                    code: Some("INVALID".to_string()),
                    message: "Discount does not exist".to_string(),
                }])
            })?;

        if self.failing_deletes.contains(&entry.record.title) {
            return Err(StoreError::UserErrors(vec![UserError {
                field: None,
                code: Some("INTERNAL_ERROR".to_string()),
                message: "Could not delete discount".to_string(),
            }]));
        }

        entry.lingering_reads = Some(self.propagation_lag);

        Ok(())
    }

    async fn insert(
        &self,
        id: DiscountId,
        title: &str,
        value: DiscountValue,
        code: Option<String>,
    ) -> DiscountRecord {
        self.creates.fetch_add(1, Ordering::SeqCst);

        let record = DiscountRecord {
            id,
            title: title.to_string(),
            status: DiscountStatus::Active,
            value: Some(value),
            code,
            created_at: Some(Timestamp::UNIX_EPOCH),
        };

        self.entries.lock().await.push(Entry {
            record: record.clone(),
            lingering_reads: None,
        });

        record
    }
}

#[async_trait]
impl DiscountStore for FakeStore {
    async fn list_automatic_discounts(&self) -> Result<Vec<DiscountRecord>, StoreError> {
        Ok(self.list(true).await)
    }

    async fn list_code_discounts(&self) -> Result<Vec<DiscountRecord>, StoreError> {
        Ok(self.list(false).await)
    }

    async fn create_automatic_discount(
        &self,
        discount: &NewAutomaticDiscount,
    ) -> Result<DiscountRecord, StoreError> {
        let id = self.allocate_id(true);
        let value = discount.value.to_record_value(Some(SHOP_CURRENCY));

        Ok(self.insert(id, &discount.title, value, None).await)
    }

    async fn create_code_discount(
        &self,
        discount: &NewCodeDiscount,
    ) -> Result<DiscountRecord, StoreError> {
        let id = self.allocate_id(false);
        let value = discount.value.to_record_value(Some(SHOP_CURRENCY));

        Ok(self
            .insert(id, &discount.title, value, Some(discount.code.to_string()))
            .await)
    }

    async fn delete_automatic_discount(&self, id: &AutomaticDiscountId) -> Result<(), StoreError> {
        self.delete(&DiscountId::Automatic(id.clone())).await
    }

    async fn delete_code_discount(&self, id: &CodeDiscountId) -> Result<(), StoreError> {
        self.delete(&DiscountId::Code(id.clone())).await
    }

    async fn read_shop_info(&self) -> Result<ShopInfo, StoreError> {
        Ok(ShopInfo {
            name: "Trellis Test Shop".to_string(),
            currency_code: SHOP_CURRENCY.to_string(),
            plan_name: Some("Development".to_string()),
        })
    }
}
