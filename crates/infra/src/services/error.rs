use thiserror::Error;

use stockledger_core::{DomainError, ErrorKind};

use crate::store::StoreError;

/// Failure of a service operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Deterministic domain failure (validation, invariants, transitions).
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Persisting or reading rows failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match &value {
            StoreError::QuantityConflict { .. } => ServiceError::Domain(DomainError::conflict(value.to_string())),
            StoreError::DuplicateSku(sku) => {
                ServiceError::Domain(DomainError::conflict(format!("sku already in use: {sku}")))
            }
            _ => ServiceError::Store(value),
        }
    }
}

impl ServiceError {
    /// Classification for callers; storage failures have none.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ServiceError::Domain(err) => Some(err.kind()),
            ServiceError::Store(_) => None,
        }
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            ServiceError::Store(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use stockledger_core::ProductId;

    use super::*;

    #[test]
    fn concurrent_writes_surface_as_conflicts() {
        let err: ServiceError = StoreError::QuantityConflict {
            product_id: ProductId::new(),
            expected: 3,
            actual: 4,
        }
        .into();
        assert_eq!(err.kind(), Some(ErrorKind::Conflict));
    }

    #[test]
    fn duplicate_sku_is_a_conflict() {
        let err: ServiceError = StoreError::DuplicateSku("A-1".to_string()).into();
        assert_eq!(err, ServiceError::Domain(DomainError::conflict("sku already in use: A-1")));
    }

    #[test]
    fn other_store_failures_stay_unclassified() {
        let err: ServiceError = StoreError::Poisoned.into();
        assert_eq!(err.kind(), None);
        assert!(err.as_domain().is_none());
    }
}
