//! `stockledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{CategoryId, ProductId, ReturnId, SupplierId, TransactionId, UserId};
pub use value_object::Money;
