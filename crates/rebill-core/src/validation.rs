//! # Validation Module
//!
//! Input validation for catalog, inventory and bill requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler                                                 │
//! │  └── Required fields present (JSON shape)                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rules: quantity > 0, price > 0, names non-empty          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── UNIQUE (product_id, category name, inventory link, bill number)   │
//! │  └── CHECK (price > 0, quantity > 0)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_PRODUCT_ID_LEN: usize = 50;
const MAX_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product id.
///
/// ## Example
/// ```rust
/// use rebill_core::validation::validate_product_id;
///
/// assert!(validate_product_id("A1").is_ok());
/// assert!(validate_product_id("  ").is_err());
/// ```
pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    validate_text("product_id", product_id, MAX_PRODUCT_ID_LEN)
}

/// Validates a product name.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, MAX_NAME_LEN)
}

/// Validates a category name.
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_text("category name", name, MAX_NAME_LEN)
}

/// Validates the name and unit of an inventory row.
pub fn validate_inventory_labels(name: &str, unit: &str) -> ValidationResult<()> {
    validate_text("name", name, MAX_NAME_LEN)?;
    validate_text("unit", unit, 50)
}

/// Validates a settings key.
pub fn validate_setting_key(key: &str) -> ValidationResult<()> {
    validate_text("key", key, 100)
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn validate_finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    Ok(())
}

/// Validates a price (finite, > 0).
///
/// ## Example
/// ```rust
/// use rebill_core::validation::validate_price;
///
/// assert!(validate_price(25.0).is_ok());
/// assert!(validate_price(0.0).is_err());
/// ```
pub fn validate_price(price: f64) -> ValidationResult<()> {
    validate_finite("price", price)?;
    if price <= 0.0 {
        return Err(ValidationError::must_be_positive("price"));
    }
    Ok(())
}

/// Validates a bill line quantity (> 0).
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    Ok(())
}

/// Validates a stock figure. Stock may be negative after overselling,
/// but must be a real number.
pub fn validate_stock(stock: f64) -> ValidationResult<()> {
    validate_finite("stock", stock)
}

/// Validates a non-negative amount such as a unit price or alert threshold.
pub fn validate_non_negative(field: &str, value: f64) -> ValidationResult<()> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Filenames
// =============================================================================

/// Derives a filesystem-safe image filename from a product name.
///
/// Keeps ASCII letters, digits, `-` and `_`; everything else collapses into
/// single underscores. Lowercased, trimmed of leading/trailing underscores.
///
/// ## Example
/// ```rust
/// use rebill_core::validation::safe_filename;
///
/// assert_eq!(safe_filename("Meetha Paan (Large)"), "meetha_paan_large");
/// ```
pub fn safe_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;

    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "product".to_string()
    } else {
        trimmed.to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_id() {
        assert!(validate_product_id("A1").is_ok());
        assert!(validate_product_id("").is_err());
        assert!(validate_product_id(&"X".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(0.5).is_ok());
        assert!(validate_price(0.0).is_err());
        assert!(validate_price(-3.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_stock_may_be_negative() {
        assert!(validate_stock(-4.0).is_ok());
        assert!(validate_stock(f64::INFINITY).is_err());
        assert!(validate_non_negative("alert_threshold", -1.0).is_err());
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("Cold Drink 500ml"), "cold_drink_500ml");
        assert_eq!(safe_filename("  !!  "), "product");
        assert_eq!(safe_filename("Kesar/Paan"), "kesar_paan");
    }
}
