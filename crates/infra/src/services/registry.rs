use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use stockledger_core::{DomainError, ProductId};
use stockledger_products::{NewProduct, Product, ProductPatch, ProductStats};

use super::error::ServiceResult;
use super::stock_engine::StockEngine;
use crate::query::{PageLimits, Pagination, ProductFilter};
use crate::store::{ChangeSet, InventoryStore, Mutation};

/// Product catalog: attributes, lookups and stock-level reports.
///
/// Never writes quantities itself; opening balances go through the stock engine.
pub struct ProductRegistry<S> {
    store: S,
    engine: Arc<StockEngine<S>>,
    limits: PageLimits,
}

impl<S> ProductRegistry<S>
where
    S: InventoryStore,
{
    pub fn new(store: S, engine: Arc<StockEngine<S>>, limits: PageLimits) -> Self {
        Self { store, engine, limits }
    }

    pub fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        Ok(self
            .store
            .product(id)?
            .ok_or_else(|| DomainError::not_found("product", id))?)
    }

    pub fn get_by_barcode(&self, barcode: &str) -> ServiceResult<Product> {
        Ok(self
            .store
            .product_by_barcode(barcode)?
            .ok_or_else(|| DomainError::not_found("product", barcode))?)
    }

    pub fn list_products(&self, filter: &ProductFilter, page: Pagination) -> ServiceResult<Vec<Product>> {
        let rows: Vec<Product> = self.store.products()?.into_iter().filter(|p| filter.matches(p)).collect();
        Ok(self.limits.clamp(page).apply(rows))
    }

    #[instrument(skip(self, cmd), fields(name = %cmd.name, opening_quantity = cmd.opening_quantity), err)]
    pub fn create_product(&self, cmd: NewProduct) -> ServiceResult<Product> {
        let product = Product::create(ProductId::new(), &cmd)?;
        let created = self.engine.open_product(product, cmd.opening_quantity, cmd.occurred_at)?;
        tracing::info!(product_id = %created.id_typed(), "product created");
        Ok(created)
    }

    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    pub fn update_product(&self, id: ProductId, patch: &ProductPatch, occurred_at: DateTime<Utc>) -> ServiceResult<Product> {
        self.engine.with_product_lock(id, || -> ServiceResult<Product> {
            let current = self.get_product(id)?;
            let updated = current.apply_patch(patch, occurred_at)?;
            if updated != current {
                self.store
                    .apply(ChangeSet::single(Mutation::UpdateProductAttributes(updated.clone())))?;
                tracing::info!(product_id = %id, "product updated");
            }
            Ok(updated)
        })
    }

    /// Soft delete. Ledger rows and returns keep resolving the product.
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub fn deactivate_product(&self, id: ProductId, occurred_at: DateTime<Utc>) -> ServiceResult<Product> {
        self.engine.with_product_lock(id, || -> ServiceResult<Product> {
            let current = self.get_product(id)?;
            if !current.is_active() {
                return Ok(current);
            }
            let gone = current.deactivate(occurred_at);
            self.store
                .apply(ChangeSet::single(Mutation::UpdateProductAttributes(gone.clone())))?;
            tracing::info!(product_id = %id, "product deactivated");
            Ok(gone)
        })
    }

    /// Active products at or under their threshold, lowest quantity first.
    pub fn low_stock(&self) -> ServiceResult<Vec<Product>> {
        let mut rows: Vec<Product> = self
            .store
            .products()?
            .into_iter()
            .filter(|p| p.is_active() && p.is_low_stock())
            .collect();
        rows.sort_by(|a, b| a.quantity().cmp(&b.quantity()).then_with(|| a.name().cmp(b.name())));
        Ok(rows)
    }

    pub fn out_of_stock(&self) -> ServiceResult<Vec<Product>> {
        let mut rows: Vec<Product> = self
            .store
            .products()?
            .into_iter()
            .filter(|p| p.is_active() && p.is_out_of_stock())
            .collect();
        rows.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(rows)
    }

    pub fn stats(&self) -> ServiceResult<ProductStats> {
        Ok(ProductStats::from_products(&self.store.products()?))
    }
}
