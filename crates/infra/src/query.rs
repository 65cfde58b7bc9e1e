//! Filters and pagination for the read surfaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{CategoryId, ProductId};
use stockledger_inventory::{StockTransaction, TransactionType};
use stockledger_products::Product;
use stockledger_returns::{Return, ReturnStatus, ReturnType};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows to return.
    pub limit: usize,
    /// Offset for pagination (0-based).
    pub offset: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub const DEFAULT_LIMIT: usize = 100;
    pub const MAX_LIMIT: usize = 1000;

    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self::bounded(limit, offset, Self::DEFAULT_LIMIT, Self::MAX_LIMIT)
    }

    /// Like [`Pagination::new`] with caller-supplied default and cap.
    /// A zero limit falls back to the default.
    pub fn bounded(limit: Option<usize>, offset: Option<usize>, default_limit: usize, max_limit: usize) -> Self {
        let limit = match limit {
            Some(0) | None => default_limit,
            Some(l) => l,
        };
        Self {
            limit: limit.min(max_limit.max(1)),
            offset: offset.unwrap_or(0),
        }
    }

    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

/// Default and maximum page size enforced by the list services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: Pagination::DEFAULT_LIMIT,
            max_limit: Pagination::MAX_LIMIT,
        }
    }
}

impl PageLimits {
    pub fn page(&self, limit: Option<usize>, offset: Option<usize>) -> Pagination {
        Pagination::bounded(limit, offset, self.default_limit, self.max_limit)
    }

    /// The caller's page with its limit held to `max_limit`.
    pub fn clamp(&self, page: Pagination) -> Pagination {
        Pagination {
            limit: page.limit.min(self.max_limit.max(1)),
            offset: page.offset,
        }
    }
}

fn within(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.is_none_or(|f| at >= f) && to.is_none_or(|t| at <= t)
}

/// Ledger filter. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub product_id: Option<ProductId>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn matches(&self, row: &StockTransaction) -> bool {
        self.product_id.is_none_or(|id| row.product_id() == id)
            && self.kind.is_none_or(|k| row.kind() == k)
            && within(row.created_at(), self.from, self.to)
    }
}

/// Returns filter. Date bounds are inclusive and apply to `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnFilter {
    #[serde(rename = "type")]
    pub kind: Option<ReturnType>,
    pub status: Option<ReturnStatus>,
    pub product_id: Option<ProductId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ReturnFilter {
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, ret: &Return) -> bool {
        self.kind.is_none_or(|k| ret.kind() == k)
            && self.status.is_none_or(|s| ret.status() == s)
            && self.product_id.is_none_or(|id| ret.product_id() == id)
            && within(ret.created_at(), self.from, self.to)
    }
}

/// Product listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Substring over name, SKU and barcode (case-insensitive).
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    /// Include soft-deleted products.
    #[serde(default)]
    pub include_inactive: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        (self.include_inactive || product.is_active())
            && self.category_id.is_none_or(|c| product.category_id() == Some(c))
            && self.search.as_deref().is_none_or(|s| product.matches_search(s))
    }
}
