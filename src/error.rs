//! Error types for recstore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for recstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("duplicate record id: {0}")]
    DuplicateId(u64),

    #[error("record not found: {0}")]
    NotFound(u64),

    // -------------------------------------------------------------------------
    // Metadata Codec Errors
    // -------------------------------------------------------------------------
    #[error("metadata serialization failed: {0}")]
    Serialization(String),

    #[error("metadata decode failed: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Table Lane Errors
    // -------------------------------------------------------------------------
    #[error("table worker unavailable: {0}")]
    Queue(String),

    // -------------------------------------------------------------------------
    // Registry Errors
    // -------------------------------------------------------------------------
    #[error("table '{0}' is already open with a different metadata type")]
    TableType(String),
}
