//! Value objects: equality by value, not identity.
//!
//! The only value object the ledger needs is [`Money`], a single-currency amount
//! in the smallest currency unit. There is no tax or exchange-rate semantics.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Monetary amount in the smallest currency unit (e.g. cents).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `self × quantity`, failing on overflow rather than wrapping.
    pub fn times(self, quantity: i64) -> DomainResult<Money> {
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::iter::Sum for Money {
    /// Saturating sum; aggregate reports never fail.
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money(iter.fold(0i64, |acc, m| acc.saturating_add(m.0)))
    }
}
