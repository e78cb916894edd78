//! Record Store Errors
//!
//! Error types for store operations, and their mapping onto the domain
//! error taxonomy.

use crate::domain::{DomainError, ErrorCode};

use super::constraints;

/// Errors that can occur in the record store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A UNIQUE constraint rejected the write
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A FOREIGN KEY constraint rejected the write
    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// The row to update does not exist
    #[error("Row not found")]
    RowNotFound,

    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Stored data no longer satisfies the model invariants
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unique(constraint: &str) -> Self {
        Self::UniqueViolation {
            constraint: constraint.to_string(),
        }
    }

    pub fn foreign_key(constraint: &str) -> Self {
        Self::ForeignKeyViolation {
            constraint: constraint.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation { constraint };
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation { constraint };
            }
        }
        if matches!(err, sqlx::Error::RowNotFound) {
            return StoreError::RowNotFound;
        }
        StoreError::Database(err)
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::UniqueViolation { constraint } => match constraint.as_str() {
                constraints::CLIENT_NICKNAME => DomainError::BusinessRule(ErrorCode::ClientAlreadyExists),
                constraints::PURCHASE_NOTE_NUMBER => {
                    DomainError::BusinessRule(ErrorCode::PurchaseAlreadyExists)
                }
                constraints::PAYMENT_RECEIPT_NUMBER => {
                    DomainError::BusinessRule(ErrorCode::PaymentAlreadyExists)
                }
                _ => DomainError::Database(err.to_string()),
            },
            StoreError::ForeignKeyViolation { constraint } => match constraint.as_str() {
                constraints::PURCHASE_CLIENT => DomainError::BusinessRule(ErrorCode::ClientNotFound),
                constraints::PAYMENT_PURCHASE => {
                    DomainError::BusinessRule(ErrorCode::PurchaseNotFound)
                }
                _ => DomainError::Database(err.to_string()),
            },
            StoreError::RowNotFound => DomainError::Database(err.to_string()),
            StoreError::Database(inner) => DomainError::Database(inner.to_string()),
            StoreError::Corrupt(detail) => DomainError::Database(detail.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_business_rule() {
        let cases = [
            (constraints::CLIENT_NICKNAME, ErrorCode::ClientAlreadyExists),
            (constraints::PURCHASE_NOTE_NUMBER, ErrorCode::PurchaseAlreadyExists),
            (constraints::PAYMENT_RECEIPT_NUMBER, ErrorCode::PaymentAlreadyExists),
        ];

        for (constraint, code) in cases {
            let err: DomainError = StoreError::unique(constraint).into();
            assert_eq!(err, DomainError::BusinessRule(code));
        }
    }

    #[test]
    fn test_foreign_key_violation_maps_to_not_found_code() {
        let err: DomainError = StoreError::foreign_key(constraints::PAYMENT_PURCHASE).into();
        assert_eq!(err, DomainError::BusinessRule(ErrorCode::PurchaseNotFound));

        let err: DomainError = StoreError::foreign_key(constraints::PURCHASE_CLIENT).into();
        assert_eq!(err, DomainError::BusinessRule(ErrorCode::ClientNotFound));
    }

    #[test]
    fn test_unknown_constraint_is_database_error() {
        let err: DomainError = StoreError::unique("some_other_key").into();
        assert_eq!(
            err,
            DomainError::Database("Unique constraint violated: some_other_key".to_string())
        );
    }

    #[test]
    fn test_row_not_found_from_sqlx() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::RowNotFound));
    }

    #[test]
    fn test_database_error_text_is_not_prefixed_twice() {
        let err: DomainError = StoreError::Corrupt("negative total_value".to_string()).into();
        assert_eq!(err, DomainError::Database("negative total_value".to_string()));
        assert_eq!(err.to_string(), "Database error: negative total_value");

        let err: DomainError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.to_string(), format!("Database error: {}", sqlx::Error::PoolTimedOut));
    }
}
