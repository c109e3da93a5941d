//! Error types for fluxalloc
//!
//! This module defines the error types used throughout the fluxalloc crates.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! # Example
//!
//! ```
//! use fluxalloc_core::error::{FluxAllocError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to FluxAllocError
//!     let _file = std::fs::read_to_string("nonexistent.json")?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{CurrencyCode, FluxId};

/// Main error type for fluxalloc operations
///
/// Allocation itself never fails on arithmetic: every ratio is guarded before
/// it divides. The variants here cover data inconsistencies, collaborator
/// failures, and input parsing.
#[derive(Error, Debug)]
pub enum FluxAllocError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A worklog references a flux that is not in the billed flux map
    #[error("Billed flux {0} referenced by a worklog is missing")]
    MissingFlux(FluxId),

    /// The exchange collaborator has no rate for the pair
    #[error("No exchange rate from {from} to {to}")]
    MissingExchangeRate {
        /// Source currency
        from: CurrencyCode,
        /// Target currency
        to: CurrencyCode,
    },

    /// Invalid billing month
    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    /// Category dimension not supported by the requested allocator
    #[error("Category '{0}' is not supported here")]
    UnsupportedCategory(String),

    /// Snapshot file could not be located
    #[error("Snapshot file not found: {0}")]
    SnapshotNotFound(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results in fluxalloc
///
/// # Example
///
/// ```
/// use fluxalloc_core::Result;
///
/// fn process_data() -> Result<String> {
///     Ok("Processed successfully".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, FluxAllocError>;
