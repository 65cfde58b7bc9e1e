//! Registry-wide aggregates over active products.

use serde::{Deserialize, Serialize};

use stockledger_core::Money;

use crate::product::Product;

/// Inventory statistics. Inactive (soft-deleted) products are excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStats {
    pub total_products: u64,
    pub total_quantity: i64,
    /// Σ price × quantity.
    pub total_value: Money,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
}

impl ProductStats {
    pub fn from_products<'a>(products: impl IntoIterator<Item = &'a Product>) -> Self {
        products
            .into_iter()
            .filter(|p| p.is_active())
            .fold(ProductStats::default(), |mut acc, p| {
                acc.total_products += 1;
                acc.total_quantity = acc.total_quantity.saturating_add(p.quantity());
                acc.total_value = [acc.total_value, p.stock_value()].into_iter().sum();
                if p.is_low_stock() {
                    acc.low_stock_count += 1;
                }
                if p.is_out_of_stock() {
                    acc.out_of_stock_count += 1;
                }
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use stockledger_core::ProductId;

    use super::*;
    use crate::product::NewProduct;

    fn product(price: i64, quantity: i64, min_stock: i64) -> Product {
        let now = Utc::now();
        let mut cmd = NewProduct::named("Item", Money::new(price), now);
        cmd.min_stock = min_stock;
        Product::create(ProductId::new(), &cmd)
            .unwrap()
            .with_quantity(quantity, now)
            .unwrap()
    }

    #[test]
    fn empty_registry_has_zero_stats() {
        assert_eq!(ProductStats::from_products(&[]), ProductStats::default());
    }

    #[test]
    fn aggregates_active_products_only() {
        let now = Utc::now();
        let products = vec![
            product(100, 10, 5),
            product(250, 3, 5),
            product(999, 0, 2),
            product(50, 40, 0).deactivate(now),
        ];

        let stats = ProductStats::from_products(&products);
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.total_quantity, 13);
        assert_eq!(stats.total_value, Money::new(100 * 10 + 250 * 3));
        assert_eq!(stats.low_stock_count, 1);
        assert_eq!(stats.out_of_stock_count, 1);
    }
}
