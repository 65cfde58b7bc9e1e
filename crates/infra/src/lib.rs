//! Infrastructure layer: storage boundary, locks, services, config.

pub mod config;
pub mod locks;
pub mod query;
pub mod services;
pub mod store;


pub use config::InventoryConfig;
pub use query::{PageLimits, Pagination, ProductFilter, ReturnFilter, TransactionFilter};
pub use services::{
    InventoryServices, ProductRegistry, ReturnWorkflow, ServiceError, ServiceResult, StockEngine,
    TransactionLedger,
};
pub use store::{ChangeSet, InMemoryInventoryStore, InventoryStore, Mutation, StoreError};
