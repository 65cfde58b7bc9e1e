//! Aggregations over ledger rows.

use serde::{Deserialize, Serialize};

use stockledger_core::Money;

use crate::transaction::{StockTransaction, TransactionType};

/// Totals for one transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTotals {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub count: u64,
    pub total_quantity: i64,
    pub total_amount: Money,
}

/// Group rows by type. Types with no rows are omitted; output follows
/// [`TransactionType::ALL`] order.
pub fn summarize_by_type<'a>(rows: impl IntoIterator<Item = &'a StockTransaction>) -> Vec<TypeTotals> {
    let mut totals: Vec<TypeTotals> = TransactionType::ALL
        .into_iter()
        .map(|kind| TypeTotals {
            kind,
            count: 0,
            total_quantity: 0,
            total_amount: Money::ZERO,
        })
        .collect();

    for row in rows {
        // ALL is in declaration order, which is also the enum's discriminant order.
        let slot = &mut totals[row.kind() as usize];
        slot.count += 1;
        slot.total_quantity = slot.total_quantity.saturating_add(row.quantity());
        slot.total_amount = [slot.total_amount, row.total_amount()].into_iter().sum();
    }

    totals.retain(|t| t.count > 0);
    totals
}

/// Quantity implied by a product's ledger history.
pub fn net_change<'a>(rows: impl IntoIterator<Item = &'a StockTransaction>) -> i64 {
    rows.into_iter().map(StockTransaction::signed_change).sum()
}
