//! # Error Types
//!
//! Domain-specific error types for rebill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rebill-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - The five-way taxonomy every layer reports      │
//! │                                                                         │
//! │  rebill-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - CoreError | DbError                            │
//! │                                                                         │
//! │  Server errors (in app)                                                │
//! │  └── ApiError         - What the frontend sees (JSON + status)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → ApiError           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification shared by every error type in the workspace.
///
/// The API layer maps each kind to one HTTP status, so the kinds must
/// never be collapsed into each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entity id or key absent.
    NotFound,
    /// Uniqueness violation or state conflict.
    Conflict,
    /// Mutation attempted on inventory whose linked product is inactive.
    Locked,
    /// Malformed input, rejected before any mutation.
    ValidationFailed,
    /// Storage or transaction failure.
    InternalFailure,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule errors raised by the billing, catalog and inventory rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found (or is inactive where an active one is required).
    ///
    /// ## When This Occurs
    /// - Bill line references an unknown product id
    /// - Bill line references a deactivated product
    /// - Inventory creation links to a product that does not exist
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Category id or name does not exist.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Inventory row does not exist.
    #[error("Inventory item not found: {0}")]
    InventoryNotFound(i64),

    /// No bill with this number in the requested day.
    #[error("Bill not found: #{0}")]
    BillNotFound(i64),

    /// Inventory row is read-only because its product was deactivated.
    ///
    /// ## User Workflow
    /// ```text
    /// Product "A1" deactivated
    ///      │
    ///      ▼
    /// PUT /inventory/7 { stock: 20 }
    ///      │
    ///      ▼
    /// InventoryLocked { id: 7 }
    ///      │
    ///      ▼
    /// UI shows: "Stock is locked while the product is disabled"
    /// ```
    #[error("Inventory item {id} is locked because its product is inactive")]
    InventoryLocked { id: i64 },

    /// Another inventory row already tracks this product.
    #[error("Product {product_id} is already linked to inventory item {inventory_id}")]
    ProductAlreadyLinked {
        product_id: String,
        inventory_id: i64,
    },

    /// Inventory cannot be linked to a deactivated product.
    #[error("Product {0} is inactive")]
    ProductInactive(String),

    /// Product id already exists.
    #[error("Product '{0}' already exists")]
    DuplicateProduct(String),

    /// Category name already exists (case-insensitive).
    #[error("Category '{0}' already exists")]
    DuplicateCategory(String),

    /// Bill is cancelled and cannot be changed.
    #[error("Bill #{0} is cancelled")]
    BillCancelled(i64),

    /// Bill number assignment kept colliding with concurrent writers.
    #[error("Could not assign a bill number after {attempts} attempts")]
    BillNumberConflict { attempts: u32 },

    /// Bill has no line items.
    #[error("A bill needs at least one item")]
    EmptyBill,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies the error for the API layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_)
            | CoreError::CategoryNotFound(_)
            | CoreError::InventoryNotFound(_)
            | CoreError::BillNotFound(_) => ErrorKind::NotFound,
            CoreError::InventoryLocked { .. } => ErrorKind::Locked,
            CoreError::ProductAlreadyLinked { .. }
            | CoreError::ProductInactive(_)
            | CoreError::DuplicateProduct(_)
            | CoreError::DuplicateCategory(_)
            | CoreError::BillCancelled(_)
            | CoreError::BillNumberConflict { .. } => ErrorKind::Conflict,
            CoreError::EmptyBill | CoreError::Validation(_) => ErrorKind::ValidationFailed,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Raised before any database work starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. non-finite number, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for a missing field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for a non-positive number.
    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InventoryLocked { id: 7 };
        assert_eq!(
            err.to_string(),
            "Inventory item 7 is locked because its product is inactive"
        );

        let err = ValidationError::must_be_positive("quantity");
        assert_eq!(err.to_string(), "quantity must be greater than zero");
    }

    #[test]
    fn test_kinds_stay_distinct() {
        assert_eq!(CoreError::BillNotFound(3).kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::InventoryLocked { id: 1 }.kind(), ErrorKind::Locked);
        assert_eq!(
            CoreError::DuplicateCategory("paan".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(CoreError::EmptyBill.kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("product_id").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::ValidationFailed);
    }
}
