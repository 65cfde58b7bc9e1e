//! Products domain module.
//!
//! This crate contains business rules for the product registry, implemented purely
//! as deterministic domain logic (no IO, no storage, no clock reads).

pub mod product;
pub mod stats;

pub use product::{NewProduct, Product, ProductPatch};
pub use stats::ProductStats;
