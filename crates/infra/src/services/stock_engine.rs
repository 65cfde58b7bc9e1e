//! The single write path for on-hand quantities and ledger rows.
//!
//! Every quantity change goes through [`StockEngine`]: it serializes work per
//! product, plans the change with the pure domain rules, and commits the new
//! quantity together with exactly one ledger row. Callers that need to persist
//! something alongside the movement (a completing return) hand their mutations in
//! so everything lands in one change set.
//!
//! ## Adjustment Flow
//!
//! ```text
//! AdjustStock
//!   ↓
//! 1. Take the product's lock
//!   ↓
//! 2. Load the product (NotFound if absent, active or not)
//!   ↓
//! 3. plan_adjustment (pure: zero change, overflow, negative result)
//!   ↓
//! 4. Apply one change set: SetQuantity (compare-and-set) + AppendTransaction [+ extra]
//!   ↓
//! 5. Release the lock, return the refreshed product and its ledger row
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use stockledger_core::{DomainError, ProductId, TransactionId};
use stockledger_inventory::{plan_adjustment, AdjustOptions, AdjustStock, StockAdjustment, TransactionType};
use stockledger_products::Product;

use super::error::ServiceResult;
use crate::locks::KeyedLocks;
use crate::store::{ChangeSet, InventoryStore, Mutation};

/// Reference written on the ledger row that books a product's opening balance.
pub const OPENING_REFERENCE: &str = "OPENING";

/// Owner of product quantities and the stock ledger.
///
/// Registry, ledger and return workflow all hold the same engine (through `Arc`),
/// and with it the one per-product lock table.
///
/// ## Invariants
///
/// - **Non-negative stock**: a change that would leave `quantity < 0` fails with
///   `InsufficientStock` and writes nothing
/// - **Ledger parity**: for every product, the stored quantity equals the sum of the
///   signed changes of its ledger rows, from the opening balance onward
/// - **Snapshots**: each row records `previous_quantity` as read under the lock and
///   `new_quantity` as committed
/// - **Sign**: any type may carry either sign; only zero is refused
///
/// ## Atomicity
///
/// The quantity update, the ledger row and any caller-supplied mutations go to the
/// store as a single [`ChangeSet`]. The store applies it all-or-nothing, so a failed
/// extra mutation rolls the movement back too.
///
/// ## Lock Order
///
/// - The engine only ever takes product locks, one at a time
/// - Callers holding another lock (the return workflow's per-return lock) take it
///   before entering the engine, never after
/// - `SetQuantity` is a compare-and-set against the quantity read under the lock, so
///   a writer that bypassed the lock surfaces as `Conflict` instead of a lost update
///
/// ## Errors
///
/// - **Unknown product**: `DomainError::NotFound`
/// - **Zero change, overflow**: `DomainError::Validation`
/// - **Overdraw**: `DomainError::InsufficientStock`
/// - **Store failures**: `ServiceError::Store`, or `Conflict` for a lost compare-and-set
pub struct StockEngine<S> {
    store: S,
    locks: Arc<KeyedLocks<ProductId>>,
}

impl<S> StockEngine<S>
where
    S: InventoryStore,
{
    pub fn new(store: S, locks: Arc<KeyedLocks<ProductId>>) -> Self {
        Self { store, locks }
    }

    /// Apply a signed quantity change and append its ledger row.
    ///
    /// Nothing is written when the change is rejected. The unit price defaults to
    /// the product's current price; `total_amount` is `|change| × unit_price`.
    ///
    /// Inactive products still accept adjustments.
    #[instrument(
        skip(self, cmd),
        fields(product_id = %cmd.product_id, kind = %cmd.kind, change = cmd.change),
        err
    )]
    pub fn adjust_stock(&self, cmd: AdjustStock) -> ServiceResult<StockAdjustment> {
        self.adjust_with(&cmd, Vec::new())
    }

    /// Like [`StockEngine::adjust_stock`], committing `extra` in the same change set.
    ///
    /// If any mutation fails, none of them (and no stock change) is persisted.
    pub(crate) fn adjust_with(&self, cmd: &AdjustStock, extra: Vec<Mutation>) -> ServiceResult<StockAdjustment> {
        self.locks.with(cmd.product_id, || -> ServiceResult<StockAdjustment> {
            let product = self
                .store
                .product(cmd.product_id)?
                .ok_or_else(|| DomainError::not_found("product", cmd.product_id))?;

            let planned = match plan_adjustment(&product, cmd, TransactionId::new()) {
                Ok(planned) => planned,
                Err(err) => {
                    tracing::warn!(
                        product_id = %cmd.product_id,
                        available = product.quantity(),
                        change = cmd.change,
                        "stock adjustment rejected: {err}"
                    );
                    return Err(err.into());
                }
            };

            let mut changes = ChangeSet::new()
                .with(Mutation::SetQuantity {
                    product_id: cmd.product_id,
                    expected: planned.transaction.previous_quantity(),
                    quantity: planned.transaction.new_quantity(),
                    at: cmd.occurred_at,
                })
                .with(Mutation::AppendTransaction(planned.transaction.clone()));
            for mutation in extra {
                changes.push(mutation);
            }
            self.store.apply(changes)?;

            tracing::info!(
                product_id = %cmd.product_id,
                transaction_id = %planned.transaction.id_typed(),
                previous = planned.transaction.previous_quantity(),
                new = planned.transaction.new_quantity(),
                "stock adjusted ({})",
                cmd.kind
            );
            Ok(planned)
        })
    }

    /// Insert a new product and book its opening balance, atomically.
    ///
    /// The product row starts at zero; a positive `opening_quantity` becomes one
    /// `adjustment` row referenced [`OPENING_REFERENCE`].
    pub(crate) fn open_product(
        &self,
        product: Product,
        opening_quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Product> {
        let product_id = product.id_typed();
        self.locks.with(product_id, || -> ServiceResult<Product> {
            let mut changes = ChangeSet::single(Mutation::InsertProduct(product.clone()));
            if opening_quantity == 0 {
                self.store.apply(changes)?;
                return Ok(product);
            }

            let cmd = AdjustStock::new(product_id, opening_quantity, TransactionType::Adjustment, occurred_at)
                .with_options(AdjustOptions {
                    reference_no: Some(OPENING_REFERENCE.to_string()),
                    notes: Some("Opening balance".to_string()),
                    ..AdjustOptions::default()
                });
            let planned = plan_adjustment(&product, &cmd, TransactionId::new())?;
            changes.push(Mutation::SetQuantity {
                product_id,
                expected: 0,
                quantity: planned.product.quantity(),
                at: occurred_at,
            });
            changes.push(Mutation::AppendTransaction(planned.transaction));
            self.store.apply(changes)?;

            Ok(planned.product)
        })
    }

    /// Run `f` while holding the product's stock lock.
    pub(crate) fn with_product_lock<T>(&self, product_id: ProductId, f: impl FnOnce() -> T) -> T {
        self.locks.with(product_id, f)
    }
}
