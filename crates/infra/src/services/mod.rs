//! Application services over an [`InventoryStore`].
//!
//! Services hold their store explicitly (no globals), so tests run them against
//! [`crate::store::InMemoryInventoryStore`]. All of them share one per-product
//! lock table through the [`StockEngine`].

pub mod error;
pub mod ledger;
pub mod registry;
pub mod return_workflow;
pub mod stock_engine;

use std::sync::Arc;

pub use error::{ServiceError, ServiceResult};
pub use ledger::TransactionLedger;
pub use registry::ProductRegistry;
pub use return_workflow::ReturnWorkflow;
pub use stock_engine::{StockEngine, OPENING_REFERENCE};

use crate::locks::KeyedLocks;
use crate::query::PageLimits;
use crate::store::InventoryStore;

/// Every service wired against one store.
pub struct InventoryServices<S> {
    pub engine: Arc<StockEngine<S>>,
    pub registry: ProductRegistry<S>,
    pub ledger: TransactionLedger<S>,
    pub returns: ReturnWorkflow<S>,
}

impl<S> InventoryServices<S>
where
    S: InventoryStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self::with_limits(store, PageLimits::default())
    }

    /// Wire the services with configured page-size bounds on every list read.
    pub fn with_limits(store: S, limits: PageLimits) -> Self {
        let engine = Arc::new(StockEngine::new(store.clone(), Arc::new(KeyedLocks::new())));
        Self {
            registry: ProductRegistry::new(store.clone(), Arc::clone(&engine), limits),
            ledger: TransactionLedger::new(store.clone(), limits),
            returns: ReturnWorkflow::new(store, Arc::clone(&engine), limits),
            engine,
        }
    }
}
