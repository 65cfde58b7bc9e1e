//! Inventory domain module: the stock ledger.
//!
//! This crate contains the rules for stock movements, implemented purely as
//! deterministic domain logic (no IO, no storage). Committing a planned adjustment
//! is the infra crate's job.

pub mod summary;
pub mod transaction;

pub use summary::{net_change, summarize_by_type, TypeTotals};
pub use transaction::{
    plan_adjustment, AdjustOptions, AdjustStock, StockAdjustment, StockTransaction,
    TransactionType,
};
