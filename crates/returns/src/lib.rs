//! Returns domain module: the return approval workflow.
//!
//! Pure state-machine logic. A completing return only *describes* its stock
//! movement; the infra layer commits it through the stock engine.

pub mod return_request;
pub mod stats;

pub use return_request::{
    NewReturn, ProcessPlan, ProcessReturn, Return, ReturnPatch, ReturnStatus, ReturnType,
    StatusChange, StockMovement, AUTO_APPROVE_NOTE,
};
pub use stats::{ReturnGroup, ReturnStats, ReturnSummary};
