//! Error types for the PXF core.
//!
//! All public APIs return `PxfResult<T>`: no panics in library code.

use thiserror::Error;

/// Unified error type for all PXF core operations.
#[derive(Debug, Error)]
pub enum PxfError {
    /// Malformed serialized filter string
    #[error("{message} (filter string: '{filter}')")]
    FilterSyntax { message: String, filter: String },

    /// Filter string was absent when a parse was requested
    #[error("filter parsing ended with no result (null filter string)")]
    NullFilter,

    /// Storage or engine type the core cannot handle
    #[error("{0}")]
    UnsupportedType(String),

    /// Value-level or request-level failure, optionally with a remediation hint
    #[error("{message}")]
    Runtime {
        message: String,
        hint: Option<String>,
    },

    /// Caller supplied arguments that cannot be used
    #[error("{0}")]
    InvalidArguments(String),

    /// Request context is missing state that an earlier step should have set
    #[error("{0}")]
    IllegalState(String),

    /// Invalid configuration property value
    #[error("{0}")]
    Config(String),

    /// Operation the plugin does not implement (e.g. writing through Hive)
    #[error("{0}")]
    UnsupportedOperation(String),

    /// Database, table or partition unknown to the metastore
    #[error("{0}")]
    NoSuchObject(String),

    /// Apache Arrow error (RecordBatch operations)
    #[error("arrow error: {source}")]
    Arrow {
        #[from]
        source: arrow::error::ArrowError,
    },

    /// Apache Parquet error (file I/O)
    #[error("parquet error: {source}")]
    Parquet {
        #[from]
        source: parquet::errors::ParquetError,
    },

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PxfError {
    pub fn filter_syntax(message: impl Into<String>, filter: &str) -> Self {
        PxfError::FilterSyntax {
            message: message.into(),
            filter: filter.to_string(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        PxfError::Runtime {
            message: message.into(),
            hint: None,
        }
    }

    pub fn runtime_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        PxfError::Runtime {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Remediation hint attached to a value-level error, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            PxfError::Runtime { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PxfError {
    fn from(err: serde_json::Error) -> Self {
        PxfError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for PxfError {
    fn from(err: bincode::Error) -> Self {
        PxfError::Serialization(err.to_string())
    }
}

/// Result alias used across the crate.
pub type PxfResult<T> = Result<T, PxfError>;
