//! Storage boundary for products, ledger rows and returns.
//!
//! Services depend on the [`InventoryStore`] trait only; the in-memory
//! implementation backs tests and the demo binary.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use r#trait::{ChangeSet, InventoryStore, Mutation, StoreError};
