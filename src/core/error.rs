// Copyright 2025 Rowforge Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for Rowforge
//!
//! This module defines all error types used throughout the execution core.

use thiserror::Error;

use super::row::RowId;

/// Result type alias for Rowforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for statement execution
///
/// This enum covers all error cases including both sentinel errors
/// and structured errors with context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // =========================================================================
    // Access errors
    // =========================================================================
    /// User lacks the right required for the statement's action
    #[error("access denied: {right} right on table '{table}' required")]
    AccessDenied { right: String, table: String },

    // =========================================================================
    // Table / column errors
    // =========================================================================
    /// Table not found in the store
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Column not found by name or index
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Duplicate column name in schema
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    // =========================================================================
    // Value errors
    // =========================================================================
    /// Invalid value for a clause or assignment (FETCH NULL/negative,
    /// failed coercion)
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },

    /// Type conversion error
    #[error("type conversion error: cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    // =========================================================================
    // Integrity violations
    // =========================================================================
    /// NOT NULL constraint violation
    #[error("not null constraint failed for column {column}")]
    NotNullConstraint { column: String },

    /// Primary key / unique violation; carries the pointer of the existing
    /// row so ON DUPLICATE KEY can route to the update path
    #[error("duplicate key in table '{table}'")]
    DuplicateKey { table: String, row: RowId },

    /// CHECK constraint violation
    #[error("check constraint failed for column {column}")]
    CheckConstraintViolation { column: String },

    // =========================================================================
    // Concurrency errors
    // =========================================================================
    /// Row or table lock wait exceeded the session timeout
    #[error("lock timeout on table '{table}'")]
    LockTimeout { table: String },

    /// Session cancellation observed mid-statement
    #[error("statement cancelled")]
    Cancelled,

    // =========================================================================
    // String format errors
    // =========================================================================
    /// Odd number of hex digits in a hex-encoded string
    #[error("hex string with odd number of characters: {0}")]
    HexStringOdd(String),

    /// Invalid digit in a hex-encoded string
    #[error("invalid hex digit: {0}")]
    HexStringInvalid(String),

    /// Malformed quoted string or Unicode escape; the text carries a `[*]`
    /// marker at the fault position
    #[error("string format error: {0}")]
    StringFormat(String),

    // =========================================================================
    // Other errors
    // =========================================================================
    /// Internal error for contract violations
    #[error("{message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new AccessDenied error
    pub fn access_denied(right: impl Into<String>, table: impl Into<String>) -> Self {
        Error::AccessDenied {
            right: right.into(),
            table: table.into(),
        }
    }

    /// Create a new InvalidValue error
    pub fn invalid_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Error::InvalidValue {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a new NotNullConstraint error
    pub fn not_null_constraint(column: impl Into<String>) -> Self {
        Error::NotNullConstraint {
            column: column.into(),
        }
    }

    /// Create a new DuplicateKey error
    pub fn duplicate_key(table: impl Into<String>, row: RowId) -> Self {
        Error::DuplicateKey {
            table: table.into(),
            row,
        }
    }

    /// Create a new CheckConstraintViolation error
    pub fn check_constraint(column: impl Into<String>) -> Self {
        Error::CheckConstraintViolation {
            column: column.into(),
        }
    }

    /// Create a new LockTimeout error
    pub fn lock_timeout(table: impl Into<String>) -> Self {
        Error::LockTimeout {
            table: table.into(),
        }
    }

    /// Create a new TypeConversion error
    pub fn type_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Error::TypeConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if this is an integrity violation (NOT NULL, unique, CHECK)
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Error::NotNullConstraint { .. }
                | Error::DuplicateKey { .. }
                | Error::CheckConstraintViolation { .. }
        )
    }

    /// Check if this is a string format error (hex or quoted-string decoders)
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::HexStringOdd(_) | Error::HexStringInvalid(_) | Error::StringFormat(_)
        )
    }

    /// Check if this error aborts the whole statement even inside an
    /// ON DUPLICATE KEY fallback (everything except integrity violations)
    pub fn is_fatal_in_fallback(&self) -> bool {
        !self.is_integrity_violation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::access_denied("DELETE", "users").to_string(),
            "access denied: DELETE right on table 'users' required"
        );
        assert_eq!(
            Error::ColumnNotFound("email".to_string()).to_string(),
            "column 'email' not found"
        );
        assert_eq!(
            Error::invalid_value("FETCH", "NULL").to_string(),
            "invalid value 'NULL' for FETCH"
        );
        assert_eq!(
            Error::lock_timeout("users").to_string(),
            "lock timeout on table 'users'"
        );
        assert_eq!(Error::Cancelled.to_string(), "statement cancelled");
    }

    #[test]
    fn test_structured_error_display() {
        let err = Error::not_null_constraint("email");
        assert_eq!(
            err.to_string(),
            "not null constraint failed for column email"
        );

        let err = Error::duplicate_key("users", RowId(7));
        assert_eq!(err.to_string(), "duplicate key in table 'users'");

        let err = Error::HexStringOdd("4".to_string());
        assert_eq!(
            err.to_string(),
            "hex string with odd number of characters: 4"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::not_null_constraint("col").is_integrity_violation());
        assert!(Error::duplicate_key("t", RowId(1)).is_integrity_violation());
        assert!(Error::check_constraint("col").is_integrity_violation());
        assert!(!Error::Cancelled.is_integrity_violation());

        assert!(Error::HexStringOdd("4".into()).is_format_error());
        assert!(Error::StringFormat("a[*]b".into()).is_format_error());
        assert!(!Error::Cancelled.is_format_error());

        assert!(Error::Cancelled.is_fatal_in_fallback());
        assert!(!Error::not_null_constraint("c").is_fatal_in_fallback());
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            Error::ColumnNotFound("c".to_string()),
            Error::ColumnNotFound("c".to_string())
        );
        assert_ne!(
            Error::ColumnNotFound("c".to_string()),
            Error::TableNotFound("c".to_string())
        );
    }
}
