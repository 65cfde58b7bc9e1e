use chrono::{DateTime, Utc};

use stockledger_core::{DomainError, ProductId, TransactionId};
use stockledger_inventory::{net_change, summarize_by_type, StockTransaction, TypeTotals};

use super::error::ServiceResult;
use crate::query::{PageLimits, Pagination, TransactionFilter};
use crate::store::InventoryStore;

/// Read-only view over the stock ledger.
pub struct TransactionLedger<S> {
    store: S,
    limits: PageLimits,
}

impl<S> TransactionLedger<S>
where
    S: InventoryStore,
{
    pub const PRODUCT_HISTORY_LIMIT: usize = 50;
    pub const RECENT_LIMIT: usize = 10;

    pub fn new(store: S, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    pub fn get_transaction(&self, id: TransactionId) -> ServiceResult<StockTransaction> {
        Ok(self
            .store
            .transaction(id)?
            .ok_or_else(|| DomainError::not_found("transaction", id))?)
    }

    /// Newest first. The page limit is held to the configured maximum.
    pub fn list_transactions(&self, filter: &TransactionFilter, page: Pagination) -> ServiceResult<Vec<StockTransaction>> {
        Ok(self.limits.clamp(page).apply(self.store.transactions(filter)?))
    }

    pub fn transactions_for_product(&self, product_id: ProductId, limit: Option<usize>) -> ServiceResult<Vec<StockTransaction>> {
        let page = self.limits.page(Some(limit.unwrap_or(Self::PRODUCT_HISTORY_LIMIT)), None);
        self.list_transactions(&TransactionFilter::for_product(product_id), page)
    }

    pub fn recent_transactions(&self, limit: Option<usize>) -> ServiceResult<Vec<StockTransaction>> {
        let page = self.limits.page(Some(limit.unwrap_or(Self::RECENT_LIMIT)), None);
        self.list_transactions(&TransactionFilter::default(), page)
    }

    /// Every row with `from <= created_at <= to`, newest first.
    pub fn transactions_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> ServiceResult<Vec<StockTransaction>> {
        Ok(self.store.transactions(&TransactionFilter::between(from, to))?)
    }

    /// Per-type totals for the range, in type declaration order.
    pub fn summarize_transactions(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> ServiceResult<Vec<TypeTotals>> {
        let rows = self.transactions_between(from, to)?;
        Ok(summarize_by_type(&rows))
    }

    /// Quantity implied by the product's full history.
    ///
    /// Equals the stored quantity for every product whose quantity only moved
    /// through the stock engine.
    pub fn reconstruct_quantity(&self, product_id: ProductId) -> ServiceResult<i64> {
        let rows = self.store.transactions(&TransactionFilter::for_product(product_id))?;
        Ok(net_change(&rows))
    }
}
