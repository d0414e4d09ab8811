//! App Context

use std::sync::Arc;

use thiserror::Error;
use trellis::conflicts::{ConflictPredicate, ConflictRulesError};

use crate::{
    cleanup::CleanupCoordinator,
    config::{ReconcileConfig, StoreConfig},
    consistency::ConsistencyValidator,
    pipeline::Pipeline,
    store::{DiscountStore, ShopifyAdminClient},
    writer::DiscountWriter,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to load conflict rules")]
    ConflictRules(#[source] ConflictRulesError),
}

#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn DiscountStore>,
    pub cleanup: CleanupCoordinator,
    pub validator: ConsistencyValidator,
    pub pipeline: Pipeline,
    pub predicate: Arc<dyn ConflictPredicate>,
}

impl AppContext {
    /// Build application context against a Shopify store.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured conflict rules cannot be loaded.
    pub fn from_config(
        store: StoreConfig,
        reconcile: &ReconcileConfig,
    ) -> Result<Self, AppInitError> {
        let client = ShopifyAdminClient::new(store.into_shopify_config());

        Self::with_store(Arc::new(client), reconcile)
    }

    /// Build application context around any store.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured conflict rules cannot be loaded.
    pub fn with_store(
        store: Arc<dyn DiscountStore>,
        reconcile: &ReconcileConfig,
    ) -> Result<Self, AppInitError> {
        let predicate: Arc<dyn ConflictPredicate> = Arc::new(
            reconcile
                .conflict_predicate()
                .map_err(AppInitError::ConflictRules)?,
        );

        let retry = reconcile.retry_policy();

        let cleanup = CleanupCoordinator::new(store.clone(), reconcile.settle_policy(), retry);
        let validator = ConsistencyValidator::new(store.clone(), retry);

        let pipeline = Pipeline::new(
            cleanup.clone(),
            DiscountWriter::new(store.clone()),
            validator.clone(),
            predicate.clone(),
            reconcile.deadline(),
        );

        Ok(Self {
            store,
            cleanup,
            validator,
            pipeline,
            predicate,
        })
    }
}
