//! Return statistics grouped by direction and status.

use serde::{Deserialize, Serialize};

use stockledger_core::Money;

use crate::return_request::{Return, ReturnStatus, ReturnType};

/// One (type, status) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnGroup {
    #[serde(rename = "type")]
    pub kind: ReturnType,
    pub status: ReturnStatus,
    pub count: u64,
    pub total_quantity: i64,
    pub total_refund: Money,
}

/// Headline counts across all groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnSummary {
    pub total_returns: u64,
    pub total_return_in: u64,
    pub total_return_out: u64,
    pub pending_count: u64,
    pub approved_count: u64,
    pub completed_count: u64,
    pub rejected_count: u64,
    pub total_refund_amount: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnStats {
    pub details: Vec<ReturnGroup>,
    pub summary: ReturnSummary,
}

impl ReturnStats {
    pub fn from_returns<'a>(returns: impl IntoIterator<Item = &'a Return>) -> Self {
        let mut details: Vec<ReturnGroup> = Vec::new();
        let mut summary = ReturnSummary::default();

        for ret in returns {
            let refund = ret.refund_amount().unwrap_or(Money::ZERO);

            match details
                .iter_mut()
                .find(|g| g.kind == ret.kind() && g.status == ret.status())
            {
                Some(group) => {
                    group.count += 1;
                    group.total_quantity = group.total_quantity.saturating_add(ret.quantity());
                    group.total_refund = [group.total_refund, refund].into_iter().sum();
                }
                None => details.push(ReturnGroup {
                    kind: ret.kind(),
                    status: ret.status(),
                    count: 1,
                    total_quantity: ret.quantity(),
                    total_refund: refund,
                }),
            }

            summary.total_returns += 1;
            match ret.kind() {
                ReturnType::ReturnIn => summary.total_return_in += 1,
                ReturnType::ReturnOut => summary.total_return_out += 1,
            }
            match ret.status() {
                ReturnStatus::Pending => summary.pending_count += 1,
                ReturnStatus::Approved => summary.approved_count += 1,
                ReturnStatus::Completed => summary.completed_count += 1,
                ReturnStatus::Rejected => summary.rejected_count += 1,
            }
            summary.total_refund_amount = [summary.total_refund_amount, refund].into_iter().sum();
        }

        details.sort_by_key(|g| (g.kind.as_str(), g.status.as_str()));
        ReturnStats { details, summary }
    }
}
