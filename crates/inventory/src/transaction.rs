use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Money, ProductId, TransactionId, UserId};
use stockledger_products::Product;

/// Kind of stock movement recorded in the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    StockIn,
    StockOut,
    Adjustment,
    Transfer,
    Sale,
    Purchase,
    ReturnIn,
    ReturnOut,
}

impl TransactionType {
    /// Every type, in declaration order.
    pub const ALL: [TransactionType; 8] = [
        TransactionType::StockIn,
        TransactionType::StockOut,
        TransactionType::Adjustment,
        TransactionType::Transfer,
        TransactionType::Sale,
        TransactionType::Purchase,
        TransactionType::ReturnIn,
        TransactionType::ReturnOut,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::StockIn => "stock_in",
            TransactionType::StockOut => "stock_out",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Transfer => "transfer",
            TransactionType::Sale => "sale",
            TransactionType::Purchase => "purchase",
            TransactionType::ReturnIn => "return_in",
            TransactionType::ReturnOut => "return_out",
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::InvalidType(s.to_string()))
    }
}

/// Optional attributes carried onto the ledger row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustOptions {
    pub reference_no: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the product's current price.
    pub unit_price: Option<Money>,
    pub user_id: Option<UserId>,
}

/// Command: AdjustStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    /// Signed, non-zero change (positive = increase).
    pub change: i64,
    pub kind: TransactionType,
    #[serde(default)]
    pub options: AdjustOptions,
    pub occurred_at: DateTime<Utc>,
}

impl AdjustStock {
    pub fn new(product_id: ProductId, change: i64, kind: TransactionType, occurred_at: DateTime<Utc>) -> Self {
        Self {
            product_id,
            change,
            kind,
            options: AdjustOptions::default(),
            occurred_at,
        }
    }

    pub fn with_options(mut self, options: AdjustOptions) -> Self {
        self.options = options;
        self
    }
}

/// One immutable ledger row.
///
/// Rows are only produced by [`plan_adjustment`], which guarantees
/// `new_quantity = previous_quantity ± quantity` and
/// `total_amount = quantity × unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    id: TransactionId,
    product_id: ProductId,
    #[serde(rename = "type")]
    kind: TransactionType,
    quantity: i64,
    previous_quantity: i64,
    new_quantity: i64,
    unit_price: Money,
    total_amount: Money,
    reference_no: Option<String>,
    notes: Option<String>,
    user_id: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl StockTransaction {
    pub fn id_typed(&self) -> TransactionId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    /// Absolute quantity moved (always positive).
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn previous_quantity(&self) -> i64 {
        self.previous_quantity
    }

    pub fn new_quantity(&self) -> i64 {
        self.new_quantity
    }

    /// Signed change this row applied to the product.
    pub fn signed_change(&self) -> i64 {
        self.new_quantity - self.previous_quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn reference_no(&self) -> Option<&str> {
        self.reference_no.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Consistent pair returned by a stock mutation: the refreshed product and the
/// ledger row describing the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product: Product,
    pub transaction: StockTransaction,
}

/// Decide the outcome of an adjustment against the product's current state.
///
/// Pure: nothing is written. The caller commits the returned product and row as a
/// single unit, or neither.
pub fn plan_adjustment(
    product: &Product,
    cmd: &AdjustStock,
    transaction_id: TransactionId,
) -> DomainResult<StockAdjustment> {
    if product.id_typed() != cmd.product_id {
        return Err(DomainError::validation("product_id mismatch"));
    }
    if cmd.change == 0 {
        return Err(DomainError::validation("quantity change cannot be zero"));
    }

    let previous = product.quantity();
    let quantity = cmd
        .change
        .checked_abs()
        .ok_or_else(|| DomainError::validation("quantity change out of range"))?;
    let new_quantity = previous
        .checked_add(cmd.change)
        .ok_or_else(|| DomainError::validation("quantity out of range"))?;

    if new_quantity < 0 {
        return Err(DomainError::InsufficientStock {
            product_id: product.id_typed().to_string(),
            available: previous,
            requested: quantity,
        });
    }

    let unit_price = cmd.options.unit_price.unwrap_or(product.price());
    if unit_price.is_negative() {
        return Err(DomainError::validation("unit_price cannot be negative"));
    }
    let total_amount = unit_price.times(quantity)?;

    let updated = product.with_quantity(new_quantity, cmd.occurred_at)?;
    let transaction = StockTransaction {
        id: transaction_id,
        product_id: cmd.product_id,
        kind: cmd.kind,
        quantity,
        previous_quantity: previous,
        new_quantity,
        unit_price,
        total_amount,
        reference_no: cmd.options.reference_no.clone(),
        notes: cmd.options.notes.clone(),
        user_id: cmd.options.user_id,
        created_at: cmd.occurred_at,
    };

    Ok(StockAdjustment {
        product: updated,
        transaction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_products::NewProduct;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn product_with(quantity: i64) -> Product {
        let cmd = NewProduct::named("Kopi Arabica 250gr", Money::new(85_000), test_time());
        Product::create(ProductId::new(), &cmd)
            .unwrap()
            .with_quantity(quantity, test_time())
            .unwrap()
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("return_in".parse::<TransactionType>().unwrap(), TransactionType::ReturnIn);
        assert_eq!("stock_out".parse::<TransactionType>().unwrap(), TransactionType::StockOut);
        for t in TransactionType::ALL {
            assert_eq!(t.as_str().parse::<TransactionType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_type_is_invalid_type() {
        let err = "gift".parse::<TransactionType>().unwrap_err();
        assert_eq!(err, DomainError::InvalidType("gift".to_string()));
        // The legacy single "return" type is not accepted.
        assert!("return".parse::<TransactionType>().is_err());
    }

    #[test]
    fn plan_snapshots_previous_and_new_quantity() {
        let product = product_with(10);
        let cmd = AdjustStock::new(product.id_typed(), -4, TransactionType::Sale, test_time());

        let plan = plan_adjustment(&product, &cmd, TransactionId::new()).unwrap();
        assert_eq!(plan.product.quantity(), 6);
        assert_eq!(plan.transaction.quantity(), 4);
        assert_eq!(plan.transaction.previous_quantity(), 10);
        assert_eq!(plan.transaction.new_quantity(), 6);
        assert_eq!(plan.transaction.signed_change(), -4);
        assert_eq!(plan.transaction.unit_price(), Money::new(85_000));
        assert_eq!(plan.transaction.total_amount(), Money::new(340_000));
    }

    #[test]
    fn plan_rejects_going_negative() {
        let product = product_with(10);
        let cmd = AdjustStock::new(product.id_typed(), -15, TransactionType::StockOut, test_time());

        let err = plan_adjustment(&product, &cmd, TransactionId::new()).unwrap_err();
        match err {
            DomainError::InsufficientStock { available, requested, .. } => {
                assert_eq!(available, 10);
                assert_eq!(requested, 15);
            }
            _ => panic!("Expected InsufficientStock"),
        }
    }

    #[test]
    fn plan_rejects_zero_change() {
        let product = product_with(1);
        let cmd = AdjustStock::new(product.id_typed(), 0, TransactionType::Adjustment, test_time());
        match plan_adjustment(&product, &cmd, TransactionId::new()).unwrap_err() {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for zero change"),
        }
    }

    #[test]
    fn plan_accepts_either_sign_for_every_type() {
        let product = product_with(5);
        for kind in TransactionType::ALL {
            let up = AdjustStock::new(product.id_typed(), 1, kind, test_time());
            let down = AdjustStock::new(product.id_typed(), -1, kind, test_time());
            assert_eq!(plan_adjustment(&product, &up, TransactionId::new()).unwrap().product.quantity(), 6);
            assert_eq!(plan_adjustment(&product, &down, TransactionId::new()).unwrap().product.quantity(), 4);
        }

        // A positive sale is how a sale gets reversed.
        let reversal = AdjustStock::new(product.id_typed(), 2, TransactionType::Sale, test_time());
        let plan = plan_adjustment(&product, &reversal, TransactionId::new()).unwrap();
        assert_eq!(plan.transaction.kind(), TransactionType::Sale);
        assert_eq!(plan.transaction.quantity(), 2);
        assert_eq!(plan.transaction.signed_change(), 2);
    }

    #[test]
    fn plan_uses_explicit_unit_price_and_options() {
        let product = product_with(0);
        let user = UserId::new();
        let cmd = AdjustStock::new(product.id_typed(), 3, TransactionType::Purchase, test_time())
            .with_options(AdjustOptions {
                reference_no: Some("PO-17".to_string()),
                notes: Some("restock".to_string()),
                unit_price: Some(Money::new(50_000)),
                user_id: Some(user),
            });

        let plan = plan_adjustment(&product, &cmd, TransactionId::new()).unwrap();
        assert_eq!(plan.transaction.total_amount(), Money::new(150_000));
        assert_eq!(plan.transaction.reference_no(), Some("PO-17"));
        assert_eq!(plan.transaction.notes(), Some("restock"));
        assert_eq!(plan.transaction.user_id(), Some(user));
    }

    #[test]
    fn plan_rejects_foreign_product() {
        let product = product_with(3);
        let cmd = AdjustStock::new(ProductId::new(), 1, TransactionType::StockIn, test_time());
        assert!(plan_adjustment(&product, &cmd, TransactionId::new()).is_err());
    }

    #[test]
    fn serializes_type_under_wire_name() {
        let product = product_with(2);
        let cmd = AdjustStock::new(product.id_typed(), 1, TransactionType::ReturnIn, test_time());
        let plan = plan_adjustment(&product, &cmd, TransactionId::new()).unwrap();

        let json = serde_json::to_value(&plan.transaction).unwrap();
        assert_eq!(json["type"], "return_in");
        assert_eq!(json["previous_quantity"], 2);
        assert_eq!(json["new_quantity"], 3);
    }
}
