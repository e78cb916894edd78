//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable identifiers for every failure the ledger can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Clients
    ClientNotFound,
    ClientAlreadyExists,
    ClientInvalidName,
    ClientInactive,

    // Purchases
    PurchaseNotFound,
    PurchaseAlreadyExists,
    PurchaseInvalidTotal,
    PurchaseInactive,
    PurchaseInvalidActivationRoute,

    // Payments
    PaymentNotFound,
    PaymentAlreadyExists,
    PaymentInvalidAmount,
    PaymentInvalidMethod,
    PaymentNotLinked,
    PaymentPurchaseInactive,

    // Generic
    DataFieldsEmpty,
    DatabaseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ClientNotFound => "CLIENT_NOT_FOUND",
            ErrorCode::ClientAlreadyExists => "CLIENT_ALREADY_EXISTS",
            ErrorCode::ClientInvalidName => "CLIENT_INVALID_NAME",
            ErrorCode::ClientInactive => "CLIENT_INACTIVE",
            ErrorCode::PurchaseNotFound => "PURCHASE_NOT_FOUND",
            ErrorCode::PurchaseAlreadyExists => "PURCHASE_ALREADY_EXISTS",
            ErrorCode::PurchaseInvalidTotal => "PURCHASE_INVALID_TOTAL",
            ErrorCode::PurchaseInactive => "PURCHASE_INACTIVE",
            ErrorCode::PurchaseInvalidActivationRoute => "PURCHASE_INVALID_ACTIVATION_ROUTE",
            ErrorCode::PaymentNotFound => "PAYMENT_NOT_FOUND",
            ErrorCode::PaymentAlreadyExists => "PAYMENT_ALREADY_EXISTS",
            ErrorCode::PaymentInvalidAmount => "PAYMENT_INVALID_AMOUNT",
            ErrorCode::PaymentInvalidMethod => "PAYMENT_INVALID_METHOD",
            ErrorCode::PaymentNotLinked => "PAYMENT_NOT_LINKED",
            ErrorCode::PaymentPurchaseInactive => "PAYMENT_PURCHASE_INACTIVE",
            ErrorCode::DataFieldsEmpty => "DATA_FIELDS_EMPTY",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
        }
    }

    /// Human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ClientNotFound => "Client not found.",
            ErrorCode::ClientAlreadyExists => "A client with this nickname already exists.",
            ErrorCode::ClientInvalidName => "Client name must not be empty.",
            ErrorCode::ClientInactive => "Client is inactive.",
            ErrorCode::PurchaseNotFound => "Purchase not found.",
            ErrorCode::PurchaseAlreadyExists => "A purchase with this note number already exists.",
            ErrorCode::PurchaseInvalidTotal => "Purchase total value must be greater than zero.",
            ErrorCode::PurchaseInactive => "Purchase is inactive.",
            ErrorCode::PurchaseInvalidActivationRoute => {
                "Use the activate/deactivate routes to change whether a purchase is active."
            }
            ErrorCode::PaymentNotFound => "Payment not found.",
            ErrorCode::PaymentAlreadyExists => "A payment with this receipt number already exists.",
            ErrorCode::PaymentInvalidAmount => "Payment amount must be greater than zero.",
            ErrorCode::PaymentInvalidMethod => "Payment method must not be empty.",
            ErrorCode::PaymentNotLinked => "Payment does not belong to the given purchase.",
            ErrorCode::PaymentPurchaseInactive => "Cannot add a payment to an inactive purchase.",
            ErrorCode::DataFieldsEmpty => "No valid fields were provided for the update.",
            ErrorCode::DatabaseError => "Unexpected database error.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure class, one per external failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    BusinessRule,
    Database,
}

/// Domain-specific errors
///
/// Raised at the point of detection and propagated unmodified to the caller.
/// Independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Referenced entity is absent
    #[error("{}", .0.message())]
    NotFound(ErrorCode),

    /// Malformed or out-of-range value, empty update payload, unmet precondition
    #[error("{}", validation_message(.code, .detail))]
    Validation {
        code: ErrorCode,
        detail: Option<String>,
    },

    /// Uniqueness conflict, dangling reference, invalid state transition, linkage mismatch
    #[error("{}", .0.message())]
    BusinessRule(ErrorCode),

    /// Unexpected store failure
    #[error("Database error: {0}")]
    Database(String),
}

fn validation_message(code: &ErrorCode, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("{} ({})", code.message(), detail),
        None => code.message().to_string(),
    }
}

impl DomainError {
    /// Create a validation error without detail
    pub fn invalid(code: ErrorCode) -> Self {
        Self::Validation { code, detail: None }
    }

    /// Create a validation error carrying the underlying cause
    pub fn invalid_because(code: ErrorCode, cause: impl fmt::Display) -> Self {
        Self::Validation {
            code,
            detail: Some(cause.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::BusinessRule(_) => ErrorKind::BusinessRule,
            Self::Database(_) => ErrorKind::Database,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(code) | Self::BusinessRule(code) => *code,
            Self::Validation { code, .. } => *code,
            Self::Database(_) => ErrorCode::DatabaseError,
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Database(_))
    }

    /// Check if this is a conflict error (state or uniqueness)
    pub fn is_conflict_error(&self) -> bool {
        matches!(self, Self::BusinessRule(_))
    }
}
