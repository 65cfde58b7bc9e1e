use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{
    DomainError, DomainResult, Money, ProductId, ReturnId, SupplierId, TransactionId, UserId,
};
use stockledger_inventory::TransactionType;

/// Direction of a return.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    /// From a customer back into stock.
    ReturnIn,
    /// From stock back to a supplier.
    ReturnOut,
}

impl ReturnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnType::ReturnIn => "return_in",
            ReturnType::ReturnOut => "return_out",
        }
    }

    /// Ledger type booked when the return completes.
    pub fn transaction_type(self) -> TransactionType {
        match self {
            ReturnType::ReturnIn => TransactionType::ReturnIn,
            ReturnType::ReturnOut => TransactionType::ReturnOut,
        }
    }

    /// Signed stock change for a completed return of `quantity` units.
    pub fn stock_change(self, quantity: i64) -> i64 {
        match self {
            ReturnType::ReturnIn => quantity,
            ReturnType::ReturnOut => -quantity,
        }
    }

    fn counterparty(self) -> &'static str {
        match self {
            ReturnType::ReturnIn => "from customer",
            ReturnType::ReturnOut => "to supplier",
        }
    }
}

impl core::fmt::Display for ReturnType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return lifecycle.
///
/// ```text
/// pending ──► approved ──► completed
///    │           │
///    └──► rejected ◄┘
/// ```
///
/// `pending → completed` is allowed only as two recorded steps through `approved`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ReturnStatus {
    pub const ALL: [ReturnStatus; 4] = [
        ReturnStatus::Pending,
        ReturnStatus::Approved,
        ReturnStatus::Rejected,
        ReturnStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReturnStatus::Pending => "pending",
            ReturnStatus::Approved => "approved",
            ReturnStatus::Rejected => "rejected",
            ReturnStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReturnStatus::Rejected | ReturnStatus::Completed)
    }
}

impl core::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ReturnStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReturnStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown return status: {s}")))
    }
}

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: ReturnStatus,
    pub to: ReturnStatus,
    pub at: DateTime<Utc>,
    pub by: Option<UserId>,
    pub note: Option<String>,
}

/// A return request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Return {
    id: ReturnId,
    product_id: ProductId,
    #[serde(rename = "type")]
    kind: ReturnType,
    quantity: i64,
    reason: Option<String>,
    status: ReturnStatus,
    customer_name: Option<String>,
    customer_contact: Option<String>,
    supplier_id: Option<SupplierId>,
    original_transaction_id: Option<TransactionId>,
    refund_amount: Option<Money>,
    notes: Option<String>,
    processed_by: Option<UserId>,
    history: Vec<StatusChange>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: create a return request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReturn {
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub kind: ReturnType,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_contact: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub original_transaction_id: Option<TransactionId>,
    #[serde(default)]
    pub refund_amount: Option<Money>,
    #[serde(default)]
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl NewReturn {
    pub fn new(product_id: ProductId, kind: ReturnType, quantity: i64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            product_id,
            kind,
            quantity,
            reason: None,
            customer_name: None,
            customer_contact: None,
            supplier_id: None,
            original_transaction_id: None,
            refund_amount: None,
            notes: None,
            occurred_at,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Command: edit a return's fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPatch {
    pub quantity: Option<i64>,
    pub reason: Option<String>,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub refund_amount: Option<Money>,
    pub notes: Option<String>,
}

/// Command: move a return through its workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReturn {
    pub target: ReturnStatus,
    #[serde(default)]
    pub processed_by: Option<UserId>,
    #[serde(default)]
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ProcessReturn {
    pub fn new(target: ReturnStatus, occurred_at: DateTime<Utc>) -> Self {
        Self {
            target,
            processed_by: None,
            notes: None,
            occurred_at,
        }
    }

    pub fn by(mut self, user: UserId) -> Self {
        self.processed_by = Some(user);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Stock movement a completing return asks the stock engine to book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub product_id: ProductId,
    pub change: i64,
    pub kind: TransactionType,
    pub reference_no: String,
    pub notes: String,
    pub user_id: Option<UserId>,
}

/// Outcome of [`Return::plan_process`]: the return as it should be stored, and the
/// stock movement to commit alongside it (only when entering `completed`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPlan {
    pub updated: Return,
    pub movement: Option<StockMovement>,
}

pub const AUTO_APPROVE_NOTE: &str = "Auto-approved";

fn ensure_quantity(quantity: i64) -> DomainResult<()> {
    if quantity < 1 {
        return Err(DomainError::validation("valid quantity is required"));
    }
    Ok(())
}

fn ensure_refund(refund: Option<Money>) -> DomainResult<()> {
    if refund.is_some_and(Money::is_negative) {
        return Err(DomainError::validation("refund_amount cannot be negative"));
    }
    Ok(())
}

impl Return {
    /// Build a pending return.
    ///
    /// `available` is the product's on-hand quantity at creation time. The check is
    /// advisory: nothing is reserved, so completion can still fail later.
    pub fn create(id: ReturnId, cmd: &NewReturn, available: i64) -> DomainResult<Self> {
        ensure_quantity(cmd.quantity)?;
        ensure_refund(cmd.refund_amount)?;

        if cmd.kind == ReturnType::ReturnOut && available < cmd.quantity {
            return Err(DomainError::InsufficientStock {
                product_id: cmd.product_id.to_string(),
                available,
                requested: cmd.quantity,
            });
        }

        Ok(Self {
            id,
            product_id: cmd.product_id,
            kind: cmd.kind,
            quantity: cmd.quantity,
            reason: cmd.reason.clone(),
            status: ReturnStatus::Pending,
            customer_name: cmd.customer_name.clone(),
            customer_contact: cmd.customer_contact.clone(),
            supplier_id: cmd.supplier_id,
            original_transaction_id: cmd.original_transaction_id,
            refund_amount: cmd.refund_amount,
            notes: cmd.notes.clone(),
            processed_by: None,
            history: Vec::new(),
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> ReturnId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn kind(&self) -> ReturnType {
        self.kind
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn status(&self) -> ReturnStatus {
        self.status
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    pub fn customer_contact(&self) -> Option<&str> {
        self.customer_contact.as_deref()
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn original_transaction_id(&self) -> Option<TransactionId> {
        self.original_transaction_id
    }

    pub fn refund_amount(&self) -> Option<Money> {
        self.refund_amount
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn processed_by(&self) -> Option<UserId> {
        self.processed_by
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Correlation id written to the ledger row booked on completion.
    pub fn reference_no(&self) -> String {
        format!("RET-{}", self.id)
    }

    /// Edit fields. Allowed until the return completes; never changes status.
    pub fn apply_patch(&self, patch: &ReturnPatch, at: DateTime<Utc>) -> DomainResult<Return> {
        if self.status == ReturnStatus::Completed {
            return Err(DomainError::AlreadyCompleted);
        }
        let mut next = self.clone();
        if *patch == ReturnPatch::default() {
            return Ok(next);
        }

        if let Some(quantity) = patch.quantity {
            ensure_quantity(quantity)?;
            next.quantity = quantity;
        }
        ensure_refund(patch.refund_amount)?;
        if patch.refund_amount.is_some() {
            next.refund_amount = patch.refund_amount;
        }
        if patch.reason.is_some() {
            next.reason = patch.reason.clone();
        }
        if patch.customer_name.is_some() {
            next.customer_name = patch.customer_name.clone();
        }
        if patch.customer_contact.is_some() {
            next.customer_contact = patch.customer_contact.clone();
        }
        if patch.supplier_id.is_some() {
            next.supplier_id = patch.supplier_id;
        }
        if patch.notes.is_some() {
            next.notes = patch.notes.clone();
        }

        next.updated_at = at;
        Ok(next)
    }

    /// Whether the return may be hard-deleted.
    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.status != ReturnStatus::Pending {
            return Err(DomainError::NotPending {
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Decide the result of a processing call.
    ///
    /// Pure: the caller stores `updated` and, when present, commits `movement`
    /// through the stock engine in the same unit.
    pub fn plan_process(&self, cmd: &ProcessReturn) -> DomainResult<ProcessPlan> {
        match self.status {
            ReturnStatus::Completed => return Err(DomainError::AlreadyCompleted),
            ReturnStatus::Rejected => return Err(DomainError::AlreadyRejected),
            ReturnStatus::Pending | ReturnStatus::Approved => {}
        }
        if cmd.target == ReturnStatus::Pending {
            return Err(DomainError::validation(
                "status must be approved, rejected, or completed",
            ));
        }

        let mut next = self.clone();

        if cmd.target == ReturnStatus::Completed && next.status == ReturnStatus::Pending {
            next.record(ReturnStatus::Approved, cmd, Some(AUTO_APPROVE_NOTE.to_string()));
        }
        next.record(cmd.target, cmd, cmd.notes.clone());

        next.processed_by = cmd.processed_by;
        next.updated_at = cmd.occurred_at;
        if cmd.notes.is_some() {
            next.notes = cmd.notes.clone();
        }

        let movement = (cmd.target == ReturnStatus::Completed).then(|| self.completion_movement(cmd));

        Ok(ProcessPlan {
            updated: next,
            movement,
        })
    }

    fn record(&mut self, to: ReturnStatus, cmd: &ProcessReturn, note: Option<String>) {
        self.history.push(StatusChange {
            from: self.status,
            to,
            at: cmd.occurred_at,
            by: cmd.processed_by,
            note,
        });
        self.status = to;
    }

    fn completion_movement(&self, cmd: &ProcessReturn) -> StockMovement {
        let why = cmd
            .notes
            .as_deref()
            .or(self.reason.as_deref())
            .unwrap_or("No reason provided");

        StockMovement {
            product_id: self.product_id,
            change: self.kind.stock_change(self.quantity),
            kind: self.kind.transaction_type(),
            reference_no: self.reference_no(),
            notes: format!("Return {}: {}", self.kind.counterparty(), why),
            user_id: cmd.processed_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn pending(kind: ReturnType, quantity: i64) -> Return {
        let cmd = NewReturn::new(ProductId::new(), kind, quantity, test_time()).with_reason("damaged box");
        Return::create(ReturnId::new(), &cmd, 100).unwrap()
    }

    #[test]
    fn create_starts_pending_without_history() {
        let ret = pending(ReturnType::ReturnIn, 3);
        assert_eq!(ret.status(), ReturnStatus::Pending);
        assert!(ret.history().is_empty());
        assert_eq!(ret.processed_by(), None);
    }

    #[test]
    fn create_rejects_non_positive_quantity() {
        let cmd = NewReturn::new(ProductId::new(), ReturnType::ReturnIn, 0, test_time());
        match Return::create(ReturnId::new(), &cmd, 10).unwrap_err() {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn return_out_beyond_stock_is_rejected() {
        let cmd = NewReturn::new(ProductId::new(), ReturnType::ReturnOut, 5, test_time());
        match Return::create(ReturnId::new(), &cmd, 2).unwrap_err() {
            DomainError::InsufficientStock { available, requested, .. } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            _ => panic!("Expected InsufficientStock"),
        }
    }

    #[test]
    fn return_in_ignores_current_stock() {
        let cmd = NewReturn::new(ProductId::new(), ReturnType::ReturnIn, 5, test_time());
        assert!(Return::create(ReturnId::new(), &cmd, 0).is_ok());
    }

    #[test]
    fn approve_and_reject_never_move_stock() {
        let ret = pending(ReturnType::ReturnIn, 3);
        for target in [ReturnStatus::Approved, ReturnStatus::Rejected] {
            let plan = ret.plan_process(&ProcessReturn::new(target, test_time())).unwrap();
            assert_eq!(plan.updated.status(), target);
            assert!(plan.movement.is_none());
        }
    }

    #[test]
    fn completing_pending_records_auto_approval() {
        let ret = pending(ReturnType::ReturnIn, 3);
        let user = UserId::new();
        let plan = ret
            .plan_process(&ProcessReturn::new(ReturnStatus::Completed, test_time()).by(user))
            .unwrap();

        let steps: Vec<_> = plan.updated.history().iter().map(|c| (c.from, c.to)).collect();
        assert_eq!(
            steps,
            vec![
                (ReturnStatus::Pending, ReturnStatus::Approved),
                (ReturnStatus::Approved, ReturnStatus::Completed),
            ]
        );
        assert_eq!(plan.updated.history()[0].note.as_deref(), Some(AUTO_APPROVE_NOTE));
        assert_eq!(plan.updated.status(), ReturnStatus::Completed);
        assert_eq!(plan.updated.processed_by(), Some(user));

        let movement = plan.movement.unwrap();
        assert_eq!(movement.change, 3);
        assert_eq!(movement.kind, TransactionType::ReturnIn);
        assert_eq!(movement.reference_no, format!("RET-{}", ret.id_typed()));
        assert_eq!(movement.notes, "Return from customer: damaged box");
        assert_eq!(movement.user_id, Some(user));
    }

    #[test]
    fn completing_approved_return_out_decreases_stock() {
        let ret = pending(ReturnType::ReturnOut, 4);
        let approved = ret
            .plan_process(&ProcessReturn::new(ReturnStatus::Approved, test_time()))
            .unwrap()
            .updated;
        let plan = approved
            .plan_process(&ProcessReturn::new(ReturnStatus::Completed, test_time()).with_notes("wrong batch"))
            .unwrap();

        assert_eq!(plan.updated.history().len(), 2);
        assert_eq!(plan.updated.notes(), Some("wrong batch"));
        let movement = plan.movement.unwrap();
        assert_eq!(movement.change, -4);
        assert_eq!(movement.kind, TransactionType::ReturnOut);
        assert_eq!(movement.notes, "Return to supplier: wrong batch");
    }

    #[test]
    fn default_note_without_reason() {
        let cmd = NewReturn::new(ProductId::new(), ReturnType::ReturnIn, 1, test_time());
        let ret = Return::create(ReturnId::new(), &cmd, 0).unwrap();
        let plan = ret
            .plan_process(&ProcessReturn::new(ReturnStatus::Completed, test_time()))
            .unwrap();
        assert_eq!(plan.movement.unwrap().notes, "Return from customer: No reason provided");
    }

    #[test]
    fn terminal_states_refuse_processing() {
        let ret = pending(ReturnType::ReturnIn, 1);
        let rejected = ret
            .plan_process(&ProcessReturn::new(ReturnStatus::Rejected, test_time()))
            .unwrap()
            .updated;
        let completed = ret
            .plan_process(&ProcessReturn::new(ReturnStatus::Completed, test_time()))
            .unwrap()
            .updated;

        for target in [ReturnStatus::Approved, ReturnStatus::Rejected, ReturnStatus::Completed] {
            let cmd = ProcessReturn::new(target, test_time());
            assert_eq!(rejected.plan_process(&cmd).unwrap_err(), DomainError::AlreadyRejected);
            assert_eq!(completed.plan_process(&cmd).unwrap_err(), DomainError::AlreadyCompleted);
        }
    }

    #[test]
    fn pending_is_not_a_valid_target() {
        let ret = pending(ReturnType::ReturnIn, 1);
        match ret.plan_process(&ProcessReturn::new(ReturnStatus::Pending, test_time())).unwrap_err() {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn patch_is_refused_once_completed() {
        let ret = pending(ReturnType::ReturnIn, 1);
        let completed = ret
            .plan_process(&ProcessReturn::new(ReturnStatus::Completed, test_time()))
            .unwrap()
            .updated;
        let patch = ReturnPatch {
            reason: Some("changed my mind".to_string()),
            ..ReturnPatch::default()
        };
        assert_eq!(completed.apply_patch(&patch, test_time()).unwrap_err(), DomainError::AlreadyCompleted);
    }

    #[test]
    fn patch_edits_fields_but_not_status() {
        let ret = pending(ReturnType::ReturnIn, 1);
        let patch = ReturnPatch {
            quantity: Some(2),
            customer_name: Some("Budi".to_string()),
            refund_amount: Some(Money::new(75_000)),
            ..ReturnPatch::default()
        };
        let edited = ret.apply_patch(&patch, test_time()).unwrap();
        assert_eq!(edited.quantity(), 2);
        assert_eq!(edited.customer_name(), Some("Budi"));
        assert_eq!(edited.refund_amount(), Some(Money::new(75_000)));
        assert_eq!(edited.status(), ReturnStatus::Pending);

        let bad = ReturnPatch {
            quantity: Some(0),
            ..ReturnPatch::default()
        };
        assert!(ret.apply_patch(&bad, test_time()).is_err());
    }

    #[test]
    fn only_pending_returns_are_deletable() {
        let ret = pending(ReturnType::ReturnIn, 1);
        assert!(ret.ensure_deletable().is_ok());

        let rejected = ret
            .plan_process(&ProcessReturn::new(ReturnStatus::Rejected, test_time()))
            .unwrap()
            .updated;
        assert_eq!(
            rejected.ensure_deletable().unwrap_err(),
            DomainError::NotPending { status: "rejected".to_string() }
        );
    }

    fn status_strategy() -> impl Strategy<Value = ReturnStatus> {
        prop_oneof![
            Just(ReturnStatus::Pending),
            Just(ReturnStatus::Approved),
            Just(ReturnStatus::Rejected),
            Just(ReturnStatus::Completed),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: across any sequence of processing calls a return asks for at
        /// most one stock movement, and once terminal its status never changes.
        #[test]
        fn stock_effect_is_exactly_once(targets in prop::collection::vec(status_strategy(), 1..12)) {
            let mut ret = pending(ReturnType::ReturnOut, 2);
            let mut movements = 0;
            let mut terminal: Option<ReturnStatus> = None;

            for target in targets {
                match ret.plan_process(&ProcessReturn::new(target, Utc::now())) {
                    Ok(plan) => {
                        prop_assert!(terminal.is_none());
                        if plan.movement.is_some() {
                            movements += 1;
                        }
                        ret = plan.updated;
                        if ret.status().is_terminal() {
                            terminal = Some(ret.status());
                        }
                    }
                    Err(_) => {}
                }
                if let Some(status) = terminal {
                    prop_assert_eq!(ret.status(), status);
                }
            }

            prop_assert!(movements <= 1);
            prop_assert_eq!(movements == 1, ret.status() == ReturnStatus::Completed);
        }
    }
}
