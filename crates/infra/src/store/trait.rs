use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use stockledger_core::{ProductId, ReturnId, TransactionId};
use stockledger_inventory::StockTransaction;
use stockledger_products::Product;
use stockledger_returns::Return;

use crate::query::{ReturnFilter, TransactionFilter};

/// One row mutation inside a [`ChangeSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Insert a new product row. Fails if the id or a non-empty SKU is taken.
    InsertProduct(Product),
    /// Replace a product's attributes. The stored quantity is always preserved.
    UpdateProductAttributes(Product),
    /// Compare-and-set the on-hand quantity.
    SetQuantity {
        product_id: ProductId,
        expected: i64,
        quantity: i64,
        at: DateTime<Utc>,
    },
    /// Append a ledger row. Fails if the id already exists.
    AppendTransaction(StockTransaction),
    InsertReturn(Return),
    UpdateReturn(Return),
    DeleteReturn(ReturnId),
}

/// Ordered mutations applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    mutations: Vec<Mutation>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(mutation: Mutation) -> Self {
        Self {
            mutations: vec![mutation],
        }
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn with(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Storage operation error.
///
/// These are storage-level failures (constraint checks, concurrency, poisoned
/// state) as opposed to domain errors (validation, invariants, transitions).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{table} row not found: {id}")]
    MissingRow { table: &'static str, id: String },

    #[error("{table} row already exists: {id}")]
    DuplicateRow { table: &'static str, id: String },

    #[error("sku already in use: {0}")]
    DuplicateSku(String),

    /// The quantity changed between read and write.
    #[error("quantity conflict on product {product_id} (expected: {expected}, actual: {actual})")]
    QuantityConflict {
        product_id: ProductId,
        expected: i64,
        actual: i64,
    },

    /// A write would break a storage-level constraint (e.g. negative quantity).
    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Storage boundary for the three row-sets: products, stock transactions, returns.
///
/// ## Implementation Requirements
///
/// - `apply` is atomic: every mutation in the set is persisted, or none is.
/// - Ledger rows are append-only: no mutation updates or removes one.
/// - `SetQuantity` is a compare-and-set against `expected`, and never stores a
///   negative quantity.
/// - Listing methods return rows newest first.
pub trait InventoryStore: Send + Sync {
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    fn product_by_barcode(&self, barcode: &str) -> Result<Option<Product>, StoreError>;

    /// Every product row, including inactive ones, newest `updated_at` first.
    fn products(&self) -> Result<Vec<Product>, StoreError>;

    fn transaction(&self, id: TransactionId) -> Result<Option<StockTransaction>, StoreError>;

    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<StockTransaction>, StoreError>;

    fn return_request(&self, id: ReturnId) -> Result<Option<Return>, StoreError>;

    fn returns(&self, filter: &ReturnFilter) -> Result<Vec<Return>, StoreError>;

    fn apply(&self, changes: ChangeSet) -> Result<(), StoreError>;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).product(id)
    }

    fn product_by_barcode(&self, barcode: &str) -> Result<Option<Product>, StoreError> {
        (**self).product_by_barcode(barcode)
    }

    fn products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).products()
    }

    fn transaction(&self, id: TransactionId) -> Result<Option<StockTransaction>, StoreError> {
        (**self).transaction(id)
    }

    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<StockTransaction>, StoreError> {
        (**self).transactions(filter)
    }

    fn return_request(&self, id: ReturnId) -> Result<Option<Return>, StoreError> {
        (**self).return_request(id)
    }

    fn returns(&self, filter: &ReturnFilter) -> Result<Vec<Return>, StoreError> {
        (**self).returns(filter)
    }

    fn apply(&self, changes: ChangeSet) -> Result<(), StoreError> {
        (**self).apply(changes)
    }
}
