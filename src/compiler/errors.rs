//! Compilation errors
//!
//! Every failure mode is an explicit variant; nothing in the compiler panics
//! on malformed queries. Messages name the offending query key where one
//! exists so callers can report it without re-parsing the query.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The catalog has no resolution for a query key.
    #[error("query key {key:?} does not resolve to a known field")]
    UnknownKey { key: String },

    /// The predicate tree asks for something the compiler cannot lower.
    #[error("unsupported predicate: {reason}")]
    UnsupportedPredicate { reason: String },

    /// A sorter cannot be lowered for its key.
    #[error("unsupported sorter on {key:?}: {reason}")]
    UnsupportedSorter { key: String, reason: String },

    /// A key resolved but its physical index cannot serve this operation,
    /// typically a geospatial comparison against a vendor without
    /// geospatial support.
    #[error("unusable index for {key:?}: {reason}")]
    UnsupportedIndex { key: String, reason: String },

    /// The requested statement shape is invalid regardless of catalog state.
    #[error("invalid usage: {reason}")]
    InvalidUsage { reason: String },
}

impl CompileError {
    pub fn unmapped_key(key: impl Into<String>) -> Self {
        CompileError::UnknownKey { key: key.into() }
    }

    pub fn unsupported_predicate(reason: impl Into<String>) -> Self {
        CompileError::UnsupportedPredicate {
            reason: reason.into(),
        }
    }

    pub fn unsupported_sorter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::UnsupportedSorter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_index(key: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::UnsupportedIndex {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_usage(reason: impl Into<String>) -> Self {
        CompileError::InvalidUsage {
            reason: reason.into(),
        }
    }
}
