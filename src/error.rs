//! Error types for the Manuload import pipeline.
//!
//! This module defines a hierarchy of error types following best practices:
//!
//! - [`CsvError`] - Row-source fetching and CSV parsing errors
//! - [`ConfigError`] - Missing or invalid configuration
//! - [`StoreError`] - Persistence-layer lookup/create errors
//! - [`ImportError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV / Row-Source Errors
// =============================================================================

/// Errors while fetching or parsing a tabular row source.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The remote fetch failed outright.
    #[error("Failed to fetch CSV for '{table}': {message}")]
    FetchFailed { table: String, message: String },

    /// The remote returned a non-success status.
    #[error("Error accessing CSV for '{table}': HTTP {status}")]
    BadStatus { table: String, status: u16 },

    /// Invalid CSV content.
    #[error("Invalid CSV for '{table}': {message}")]
    ParseError { table: String, message: String },

    /// No header row found.
    #[error("No headers found in CSV for '{table}'")]
    NoHeaders { table: String },

    /// More than one unlabeled header column.
    #[error("CSV for '{table}' has more than one blank header column")]
    DuplicateBlankHeader { table: String },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in import configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No URL configured for a logical table name.
    #[error("Import URL for '{0}' is not configured")]
    MissingUrl(String),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the persistence layer consumed by the pipeline.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record that is expected to exist (fixture/bootstrap data) is missing.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A citation creator could not be resolved by last name.
    #[error("Source creator not found for {0}")]
    CreatorNotFound(String),

    /// Generic backend failure.
    #[error("Store operation failed: {0}")]
    Backend(String),
}

// =============================================================================
// Import Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::importer::Importer::run`].
/// It wraps all lower-level errors and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Row-source error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for row-source operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration lookups.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for pipeline operations.
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> ImportError
        let csv_err = CsvError::NoHeaders { table: "metadata".into() };
        let import_err: ImportError = csv_err.into();
        assert!(import_err.to_string().contains("metadata"));

        // ConfigError -> ImportError
        let cfg_err = ConfigError::MissingUrl("libraries".into());
        let import_err: ImportError = cfg_err.into();
        assert!(import_err.to_string().contains("libraries"));
    }

    #[test]
    fn test_store_error_format() {
        let err = StoreError::CreatorNotFound("Goitein".into());
        assert!(err.to_string().contains("Goitein"));
    }
}
