use std::collections::HashMap;
use std::sync::RwLock;

use stockledger_core::{ProductId, ReturnId, TransactionId};
use stockledger_inventory::StockTransaction;
use stockledger_products::Product;
use stockledger_returns::Return;

use super::r#trait::{ChangeSet, InventoryStore, Mutation, StoreError};
use crate::query::{ReturnFilter, TransactionFilter};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    /// Insertion order; never rewritten.
    transactions: Vec<StockTransaction>,
    transaction_index: HashMap<TransactionId, usize>,
    returns: HashMap<ReturnId, Return>,
}

/// Inverse of one applied mutation.
#[derive(Debug)]
enum Undo {
    RemoveProduct(ProductId),
    RestoreProduct(Product),
    PopTransaction,
    RemoveReturn(ReturnId),
    RestoreReturn(Return),
}

impl Tables {
    fn sku_taken(&self, sku: Option<&str>, except: ProductId) -> bool {
        let Some(sku) = sku else { return false };
        self.products
            .values()
            .any(|p| p.id_typed() != except && p.sku() == Some(sku))
    }

    fn stored_product(&self, id: ProductId) -> Result<&Product, StoreError> {
        self.products.get(&id).ok_or_else(|| StoreError::MissingRow {
            table: "products",
            id: id.to_string(),
        })
    }

    fn stored_return(&self, id: ReturnId) -> Result<&Return, StoreError> {
        self.returns.get(&id).ok_or_else(|| StoreError::MissingRow {
            table: "returns",
            id: id.to_string(),
        })
    }

    fn apply_one(&mut self, mutation: Mutation) -> Result<Undo, StoreError> {
        match mutation {
            Mutation::InsertProduct(product) => {
                let id = product.id_typed();
                if self.products.contains_key(&id) {
                    return Err(StoreError::DuplicateRow {
                        table: "products",
                        id: id.to_string(),
                    });
                }
                if self.sku_taken(product.sku(), id) {
                    return Err(StoreError::DuplicateSku(product.sku().unwrap_or_default().to_string()));
                }
                self.products.insert(id, product);
                Ok(Undo::RemoveProduct(id))
            }
            Mutation::UpdateProductAttributes(product) => {
                let id = product.id_typed();
                let stored = self.stored_product(id)?.clone();
                if self.sku_taken(product.sku(), id) {
                    return Err(StoreError::DuplicateSku(product.sku().unwrap_or_default().to_string()));
                }
                let merged = product
                    .with_quantity(stored.quantity(), product.updated_at())
                    .map_err(|e| StoreError::Constraint(e.to_string()))?;
                self.products.insert(id, merged);
                Ok(Undo::RestoreProduct(stored))
            }
            Mutation::SetQuantity {
                product_id,
                expected,
                quantity,
                at,
            } => {
                let stored = self.stored_product(product_id)?.clone();
                if stored.quantity() != expected {
                    return Err(StoreError::QuantityConflict {
                        product_id,
                        expected,
                        actual: stored.quantity(),
                    });
                }
                if quantity < 0 {
                    return Err(StoreError::Constraint(format!(
                        "quantity of product {product_id} cannot be negative"
                    )));
                }
                let updated = stored
                    .with_quantity(quantity, at)
                    .map_err(|e| StoreError::Constraint(e.to_string()))?;
                self.products.insert(product_id, updated);
                Ok(Undo::RestoreProduct(stored))
            }
            Mutation::AppendTransaction(row) => {
                let id = row.id_typed();
                if self.transaction_index.contains_key(&id) {
                    return Err(StoreError::DuplicateRow {
                        table: "stock_transactions",
                        id: id.to_string(),
                    });
                }
                self.stored_product(row.product_id())?;
                self.transaction_index.insert(id, self.transactions.len());
                self.transactions.push(row);
                Ok(Undo::PopTransaction)
            }
            Mutation::InsertReturn(ret) => {
                let id = ret.id_typed();
                if self.returns.contains_key(&id) {
                    return Err(StoreError::DuplicateRow {
                        table: "returns",
                        id: id.to_string(),
                    });
                }
                self.stored_product(ret.product_id())?;
                self.returns.insert(id, ret);
                Ok(Undo::RemoveReturn(id))
            }
            Mutation::UpdateReturn(ret) => {
                let id = ret.id_typed();
                let stored = self.stored_return(id)?.clone();
                self.returns.insert(id, ret);
                Ok(Undo::RestoreReturn(stored))
            }
            Mutation::DeleteReturn(id) => {
                let stored = self.stored_return(id)?.clone();
                self.returns.remove(&id);
                Ok(Undo::RestoreReturn(stored))
            }
        }
    }

    fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::RemoveProduct(id) => {
                self.products.remove(&id);
            }
            Undo::RestoreProduct(product) => {
                self.products.insert(product.id_typed(), product);
            }
            Undo::PopTransaction => {
                if let Some(row) = self.transactions.pop() {
                    self.transaction_index.remove(&row.id_typed());
                }
            }
            Undo::RemoveReturn(id) => {
                self.returns.remove(&id);
            }
            Undo::RestoreReturn(ret) => {
                self.returns.insert(ret.id_typed(), ret);
            }
        }
    }
}

/// In-memory inventory store.
///
/// Intended for tests/dev. Not optimized for performance: listings scan and sort.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&tables))
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.read(|t| t.products.get(&id).cloned())
    }

    fn product_by_barcode(&self, barcode: &str) -> Result<Option<Product>, StoreError> {
        let barcode = barcode.trim();
        self.read(|t| {
            t.products
                .values()
                .filter(|p| p.barcode() == Some(barcode))
                .max_by_key(|p| (p.is_active(), p.updated_at()))
                .cloned()
        })
    }

    fn products(&self) -> Result<Vec<Product>, StoreError> {
        self.read(|t| {
            let mut rows: Vec<Product> = t.products.values().cloned().collect();
            rows.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()).then_with(|| b.name().cmp(a.name())));
            rows
        })
    }

    fn transaction(&self, id: TransactionId) -> Result<Option<StockTransaction>, StoreError> {
        self.read(|t| t.transaction_index.get(&id).map(|&idx| t.transactions[idx].clone()))
    }

    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<StockTransaction>, StoreError> {
        self.read(|t| {
            // Reverse insertion order first so equal timestamps stay newest-first.
            let mut rows: Vec<StockTransaction> =
                t.transactions.iter().rev().filter(|row| filter.matches(row)).cloned().collect();
            rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
            rows
        })
    }

    fn return_request(&self, id: ReturnId) -> Result<Option<Return>, StoreError> {
        self.read(|t| t.returns.get(&id).cloned())
    }

    fn returns(&self, filter: &ReturnFilter) -> Result<Vec<Return>, StoreError> {
        self.read(|t| {
            let mut rows: Vec<Return> = t.returns.values().filter(|r| filter.matches(r)).cloned().collect();
            rows.sort_by(|a, b| {
                b.created_at()
                    .cmp(&a.created_at())
                    .then_with(|| b.id_typed().as_uuid().cmp(a.id_typed().as_uuid()))
            });
            rows
        })
    }

    fn apply(&self, changes: ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let mut undo_log = Vec::with_capacity(changes.len());

        for mutation in changes.into_mutations() {
            match tables.apply_one(mutation) {
                Ok(undo) => undo_log.push(undo),
                Err(err) => {
                    while let Some(undo) = undo_log.pop() {
                        tables.revert(undo);
                    }
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}
