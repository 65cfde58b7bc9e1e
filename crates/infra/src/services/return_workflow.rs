//! Return approval workflow.
//!
//! Lock order: the return's lock first, then (inside the stock engine) the
//! product's lock.
//!
//! ## Status Machine
//!
//! ```text
//! pending ──→ approved ──→ completed
//!    │           │
//!    │           ├──→ approved   (re-approval, recorded in history)
//!    │           └──→ rejected
//!    ├──→ rejected
//!    └──→ completed   (auto-approved first, recorded in history)
//! ```
//!
//! `completed` and `rejected` are terminal. Only the step into `completed` moves
//! stock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use stockledger_core::{DomainError, ProductId, ReturnId};
use stockledger_inventory::{AdjustOptions, AdjustStock};
use stockledger_returns::{NewReturn, ProcessReturn, Return, ReturnPatch, ReturnStats, StockMovement};

use super::error::ServiceResult;
use super::stock_engine::StockEngine;
use crate::locks::KeyedLocks;
use crate::query::{PageLimits, Pagination, ReturnFilter};
use crate::store::{ChangeSet, InventoryStore, Mutation};

/// Creates, edits, processes and deletes returns.
///
/// Stock is never written here directly: a completing return hands its movement
/// to the [`StockEngine`] along with its own status update.
///
/// ## Invariants
///
/// - **One movement per return**: a return reaches `completed` at most once, and
///   that transition books exactly one `return_in`/`return_out` ledger row with
///   `reference_no = RET-<id>`
/// - **Terminal states**: no transition leaves `completed` or `rejected`; edits are
///   refused only once completed
/// - **Deletion**: only `pending` returns can be deleted
/// - **Advisory check**: a `return_out` is checked against on-hand stock at creation
///   but nothing is reserved; completion re-checks through the engine
///
/// ## Lock Order
///
/// 1. The return's lock (held for the whole edit, process or delete)
/// 2. The product's lock, taken inside the stock engine
///
/// Creation only takes the product lock, since the return does not exist yet.
///
/// ## Atomicity
///
/// - **Completion**: the status update and the stock movement commit in one change
///   set; if the engine refuses the movement (e.g. `InsufficientStock`) the return
///   keeps its previous status
/// - **Approve / reject / edit / delete**: a single-mutation change set each
///
/// ## Pagination
///
/// List reads are clamped to the configured [`PageLimits`]; the per-product and
/// recent helpers default to 50 and 10 rows.
pub struct ReturnWorkflow<S> {
    store: S,
    engine: Arc<StockEngine<S>>,
    locks: KeyedLocks<ReturnId>,
    limits: PageLimits,
}

impl<S> ReturnWorkflow<S>
where
    S: InventoryStore,
{
    pub const PRODUCT_HISTORY_LIMIT: usize = 50;
    pub const RECENT_LIMIT: usize = 10;

    pub fn new(store: S, engine: Arc<StockEngine<S>>, limits: PageLimits) -> Self {
        Self {
            store,
            engine,
            locks: KeyedLocks::new(),
            limits,
        }
    }

    /// Open a pending return. Nothing moves in stock yet.
    ///
    /// For `return_out` the on-hand quantity is checked now, but not reserved.
    #[instrument(skip(self, cmd), fields(product_id = %cmd.product_id, kind = %cmd.kind, quantity = cmd.quantity), err)]
    pub fn create_return(&self, cmd: NewReturn) -> ServiceResult<Return> {
        let ret = self.engine.with_product_lock(cmd.product_id, || -> ServiceResult<Return> {
            let product = self
                .store
                .product(cmd.product_id)?
                .ok_or_else(|| DomainError::not_found("product", cmd.product_id))?;
            let ret = Return::create(ReturnId::new(), &cmd, product.quantity())?;
            self.store.apply(ChangeSet::single(Mutation::InsertReturn(ret.clone())))?;
            Ok(ret)
        })?;

        tracing::info!(return_id = %ret.id_typed(), "return created");
        Ok(ret)
    }

    /// Edit a return's fields. Refused once completed; never changes status or stock.
    #[instrument(skip(self, patch), fields(return_id = %id), err)]
    pub fn update_return(&self, id: ReturnId, patch: &ReturnPatch, occurred_at: DateTime<Utc>) -> ServiceResult<Return> {
        self.locks.with(id, || -> ServiceResult<Return> {
            let current = self.get_return(id)?;
            let updated = current.apply_patch(patch, occurred_at)?;
            if updated != current {
                self.store.apply(ChangeSet::single(Mutation::UpdateReturn(updated.clone())))?;
            }
            Ok(updated)
        })
    }

    /// Move a return to `approved`, `rejected` or `completed`.
    ///
    /// Completion books the stock movement and the new status in one change set;
    /// if the movement is refused the return is left untouched.
    ///
    /// ## Errors
    ///
    /// - **From `completed`**: `DomainError::AlreadyCompleted`
    /// - **From `rejected`**: `DomainError::AlreadyRejected`
    /// - **Back to `pending`**: `DomainError::Validation`
    /// - **Movement refused**: whatever the stock engine returns
    #[instrument(skip(self, cmd), fields(return_id = %id, target = %cmd.target), err)]
    pub fn process_return(&self, id: ReturnId, cmd: ProcessReturn) -> ServiceResult<Return> {
        self.locks.with(id, || -> ServiceResult<Return> {
            let current = self.get_return(id)?;
            let plan = match current.plan_process(&cmd) {
                Ok(plan) => plan,
                Err(err) => {
                    tracing::warn!(return_id = %id, status = %current.status(), "return transition refused: {err}");
                    return Err(err.into());
                }
            };

            match &plan.movement {
                Some(movement) => {
                    let adjust = movement_command(movement, cmd.occurred_at);
                    self.engine
                        .adjust_with(&adjust, vec![Mutation::UpdateReturn(plan.updated.clone())])?;
                }
                None => {
                    self.store
                        .apply(ChangeSet::single(Mutation::UpdateReturn(plan.updated.clone())))?;
                }
            }

            tracing::info!(
                return_id = %id,
                from = %current.status(),
                to = %plan.updated.status(),
                "return processed"
            );
            Ok(plan.updated)
        })
    }

    /// Hard delete; only pending returns qualify.
    #[instrument(skip(self), fields(return_id = %id), err)]
    pub fn delete_return(&self, id: ReturnId) -> ServiceResult<()> {
        self.locks.with(id, || -> ServiceResult<()> {
            let current = self.get_return(id)?;
            current.ensure_deletable()?;
            self.store.apply(ChangeSet::single(Mutation::DeleteReturn(id)))?;
            tracing::info!(return_id = %id, "return deleted");
            Ok(())
        })
    }

    pub fn get_return(&self, id: ReturnId) -> ServiceResult<Return> {
        Ok(self
            .store
            .return_request(id)?
            .ok_or_else(|| DomainError::not_found("return", id))?)
    }

    /// Newest first. The page limit is held to the configured maximum.
    pub fn list_returns(&self, filter: &ReturnFilter, page: Pagination) -> ServiceResult<Vec<Return>> {
        Ok(self.limits.clamp(page).apply(self.store.returns(filter)?))
    }

    pub fn returns_for_product(&self, product_id: ProductId, limit: Option<usize>) -> ServiceResult<Vec<Return>> {
        let page = self.limits.page(Some(limit.unwrap_or(Self::PRODUCT_HISTORY_LIMIT)), None);
        self.list_returns(&ReturnFilter::for_product(product_id), page)
    }

    pub fn recent_returns(&self, limit: Option<usize>) -> ServiceResult<Vec<Return>> {
        let page = self.limits.page(Some(limit.unwrap_or(Self::RECENT_LIMIT)), None);
        self.list_returns(&ReturnFilter::default(), page)
    }

    /// Grouped counts, optionally restricted to returns created in `[from, to]`.
    pub fn return_stats(&self, range: Option<(DateTime<Utc>, DateTime<Utc>)>) -> ServiceResult<ReturnStats> {
        let filter = match range {
            Some((from, to)) => ReturnFilter {
                from: Some(from),
                to: Some(to),
                ..ReturnFilter::default()
            },
            None => ReturnFilter::default(),
        };
        Ok(ReturnStats::from_returns(&self.store.returns(&filter)?))
    }
}

fn movement_command(movement: &StockMovement, occurred_at: DateTime<Utc>) -> AdjustStock {
    AdjustStock::new(movement.product_id, movement.change, movement.kind, occurred_at).with_options(AdjustOptions {
        reference_no: Some(movement.reference_no.clone()),
        notes: Some(movement.notes.clone()),
        unit_price: None,
        user_id: movement.user_id,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use stockledger_core::{ErrorKind, Money, UserId};
    use stockledger_inventory::TransactionType;
    use stockledger_products::{NewProduct, Product};
    use stockledger_returns::{ReturnStatus, ReturnType};

    use super::*;
    use crate::query::TransactionFilter;
    use crate::services::error::ServiceError;
    use crate::store::InMemoryInventoryStore;

    struct Fixture {
        store: Arc<InMemoryInventoryStore>,
        engine: Arc<StockEngine<Arc<InMemoryInventoryStore>>>,
        workflow: ReturnWorkflow<Arc<InMemoryInventoryStore>>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryInventoryStore::new());
        let engine = Arc::new(StockEngine::new(Arc::clone(&store), Arc::new(KeyedLocks::new())));
        let workflow = ReturnWorkflow::new(Arc::clone(&store), Arc::clone(&engine), PageLimits::default());
        Fixture { store, engine, workflow }
    }

    fn product(f: &Fixture, qty: i64) -> ProductId {
        let p = Product::create(ProductId::new(), &NewProduct::named("Tinta Printer", Money::new(85_000), Utc::now()))
            .unwrap();
        f.engine.open_product(p, qty, Utc::now()).unwrap().id_typed()
    }

    fn quantity(f: &Fixture, id: ProductId) -> i64 {
        f.store.product(id).unwrap().unwrap().quantity()
    }

    fn process(target: ReturnStatus) -> ProcessReturn {
        ProcessReturn::new(target, Utc::now())
    }

    #[test]
    fn approve_then_complete_moves_stock_once() {
        let f = fixture();
        let id = product(&f, 5);
        let ret = f
            .workflow
            .create_return(NewReturn::new(id, ReturnType::ReturnIn, 3, Utc::now()).with_reason("Rusak"))
            .unwrap();
        assert_eq!(quantity(&f, id), 5);

        let approved = f.workflow.process_return(ret.id_typed(), process(ReturnStatus::Approved)).unwrap();
        assert_eq!(approved.status(), ReturnStatus::Approved);
        assert_eq!(quantity(&f, id), 5);

        let user = UserId::new();
        let done = f
            .workflow
            .process_return(ret.id_typed(), process(ReturnStatus::Completed).by(user))
            .unwrap();
        assert_eq!(done.status(), ReturnStatus::Completed);
        assert_eq!(done.processed_by(), Some(user));
        assert_eq!(quantity(&f, id), 8);

        let rows = f.store.transactions(&TransactionFilter::for_product(id)).unwrap();
        let row = &rows[0];
        assert_eq!(row.kind(), TransactionType::ReturnIn);
        assert_eq!(row.reference_no(), Some(ret.reference_no().as_str()));
        assert_eq!(row.notes(), Some("Return from customer: Rusak"));
        assert_eq!(row.user_id(), Some(user));

        let err = f
            .workflow
            .process_return(ret.id_typed(), process(ReturnStatus::Completed))
            .unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::AlreadyCompleted));
        assert_eq!(quantity(&f, id), 8);
    }

    #[test]
    fn return_out_completion_fails_cleanly_when_stock_was_consumed() {
        let f = fixture();
        let id = product(&f, 4);
        let ret = f
            .workflow
            .create_return(NewReturn::new(id, ReturnType::ReturnOut, 3, Utc::now()))
            .unwrap();
        f.engine
            .adjust_stock(AdjustStock::new(id, -2, TransactionType::Sale, Utc::now()))
            .unwrap();

        let err = f
            .workflow
            .process_return(ret.id_typed(), process(ReturnStatus::Completed))
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InsufficientStock));

        let unchanged = f.workflow.get_return(ret.id_typed()).unwrap();
        assert_eq!(unchanged, ret);
        assert_eq!(quantity(&f, id), 2);
    }

    #[test]
    fn rejected_is_terminal_but_still_editable() {
        let f = fixture();
        let id = product(&f, 1);
        let ret = f
            .workflow
            .create_return(NewReturn::new(id, ReturnType::ReturnIn, 1, Utc::now()))
            .unwrap();
        f.workflow.process_return(ret.id_typed(), process(ReturnStatus::Rejected)).unwrap();

        let err = f
            .workflow
            .process_return(ret.id_typed(), process(ReturnStatus::Approved))
            .unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::AlreadyRejected));

        let patch = ReturnPatch {
            notes: Some("customer informed".to_string()),
            ..ReturnPatch::default()
        };
        let edited = f.workflow.update_return(ret.id_typed(), &patch, Utc::now()).unwrap();
        assert_eq!(edited.status(), ReturnStatus::Rejected);
        assert_eq!(edited.notes(), Some("customer informed"));
    }

    #[test]
    fn only_pending_returns_can_be_deleted() {
        let f = fixture();
        let id = product(&f, 1);
        let pending = f
            .workflow
            .create_return(NewReturn::new(id, ReturnType::ReturnIn, 1, Utc::now()))
            .unwrap();
        let approved = f
            .workflow
            .create_return(NewReturn::new(id, ReturnType::ReturnIn, 1, Utc::now()))
            .unwrap();
        f.workflow.process_return(approved.id_typed(), process(ReturnStatus::Approved)).unwrap();

        f.workflow.delete_return(pending.id_typed()).unwrap();
        assert_eq!(f.workflow.get_return(pending.id_typed()).unwrap_err().kind(), Some(ErrorKind::NotFound));

        let err = f.workflow.delete_return(approved.id_typed()).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidStateTransition));
    }

    #[test]
    fn create_requires_an_existing_product() {
        let f = fixture();
        let err = f
            .workflow
            .create_return(NewReturn::new(ProductId::new(), ReturnType::ReturnIn, 1, Utc::now()))
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[test]
    fn stats_and_listings() {
        let f = fixture();
        let id = product(&f, 10);
        let mut with_refund = NewReturn::new(id, ReturnType::ReturnIn, 2, Utc::now());
        with_refund.refund_amount = Some(Money::new(170_000));
        f.workflow.create_return(with_refund).unwrap();
        let out = f
            .workflow
            .create_return(NewReturn::new(id, ReturnType::ReturnOut, 1, Utc::now()))
            .unwrap();
        f.workflow.process_return(out.id_typed(), process(ReturnStatus::Completed)).unwrap();

        let stats = f.workflow.return_stats(None).unwrap();
        assert_eq!(stats.summary.total_returns, 2);
        assert_eq!(stats.summary.pending_count, 1);
        assert_eq!(stats.summary.completed_count, 1);
        assert_eq!(stats.summary.total_refund_amount, Money::new(170_000));

        assert_eq!(f.workflow.returns_for_product(id, None).unwrap().len(), 2);
        assert_eq!(f.workflow.recent_returns(Some(1)).unwrap().len(), 1);
        let completed = ReturnFilter {
            status: Some(ReturnStatus::Completed),
            ..ReturnFilter::default()
        };
        let rows = f.workflow.list_returns(&completed, Pagination::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id_typed(), out.id_typed());
    }
}
