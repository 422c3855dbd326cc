//! Error types for DEPOT operations

use std::time::Duration;
use thiserror::Error;

use crate::Channel;

/// Errors raised by a backing store adapter (content or metadata).
///
/// The retry policy classifies these through [`StoreError::is_retryable`];
/// nothing else in the workspace decides what is transient.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Key {key} not found")]
    NotFound { key: String },

    #[error("Provisioned throughput exceeded: {reason}")]
    Throttled { reason: String },

    #[error("Transient internal error: {reason}")]
    Transient { reason: String },

    #[error("Operation {operation} timed out after {after:?}")]
    TimedOut { operation: String, after: Duration },

    #[error("Backend error: {reason}")]
    Backend { reason: String },

    #[error("Corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    /// Capacity/throttling and transient internal errors are retryable.
    /// Everything else, including not-found, is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Throttled { .. } | StoreError::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        StoreError::Backend {
            reason: reason.into(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Throttled { .. } | StoreError::Transient { .. } => {
                ErrorKind::UpstreamUnavailable
            }
            StoreError::TimedOut { .. } => ErrorKind::Timeout,
            StoreError::Backend { .. } | StoreError::Corrupt { .. } => ErrorKind::Terminal,
        }
    }
}

/// Coarse classification of a [`DepotError`], used by the HTTP layer to pick
/// a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Version already exists and no promotion flag was given.
    Conflict,
    /// Object, version or pointer absent.
    NotFound,
    /// Retryable store error after the retry budget was exhausted.
    UpstreamUnavailable,
    /// Non-retryable store or upstream error.
    Terminal,
    /// Invalid path, version, token or configuration value.
    Malformed,
    /// An upstream call exceeded its timeout.
    Timeout,
}

/// Master error type for all DEPOT errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DepotError {
    #[error("Object {path} version {version} already exists. Not overwriting")]
    Conflict { path: String, version: String },

    #[error("No {channel} version set for object {path}")]
    PointerNotSet { path: String, channel: Channel },

    #[error("Object {path} version {version} does not exist")]
    ContentNotFound { path: String, version: String },

    #[error("Unable to read object {path} version {version}: {source}")]
    ContentRead {
        path: String,
        version: String,
        source: StoreError,
    },

    #[error("Unable to write object {path} version {version}: {source}")]
    ContentWrite {
        path: String,
        version: String,
        source: StoreError,
    },

    #[error("Error looking up version for object {path}: {source}")]
    MetadataRead { path: String, source: StoreError },

    #[error("Unable to write object {path} version {version} info to metadata store: {source}")]
    MetadataWrite {
        path: String,
        version: String,
        source: StoreError,
    },

    #[error("Unable to list {prefix}: {source}")]
    Listing { prefix: String, source: StoreError },

    #[error("Malformed {field}: {reason}")]
    Malformed { field: String, reason: String },

    #[error("Timed out after {after:?} waiting on {operation}")]
    Timeout { operation: String, after: Duration },

    #[error("Upstream error for {key}: {source}")]
    Upstream { key: String, source: StoreError },

    /// Rendered as the remote message alone so it can be relayed verbatim.
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("Local cache error at {path}: {reason}")]
    LocalCache { path: String, reason: String },

    #[error("Invalid configuration for {field}: {reason}")]
    Config { field: String, reason: String },
}

impl DepotError {
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DepotError::Malformed {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DepotError::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error for status-code mapping and caller policy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DepotError::Conflict { .. } => ErrorKind::Conflict,
            DepotError::PointerNotSet { .. } | DepotError::ContentNotFound { .. } => {
                ErrorKind::NotFound
            }
            DepotError::ContentRead { source, .. }
            | DepotError::ContentWrite { source, .. }
            | DepotError::MetadataRead { source, .. }
            | DepotError::MetadataWrite { source, .. }
            | DepotError::Listing { source, .. }
            | DepotError::Upstream { source, .. } => source.kind(),
            DepotError::Malformed { .. } | DepotError::Config { .. } => ErrorKind::Malformed,
            DepotError::Timeout { .. } => ErrorKind::Timeout,
            DepotError::Remote { status, .. } => match status {
                404 => ErrorKind::NotFound,
                409 => ErrorKind::Conflict,
                400 => ErrorKind::Malformed,
                503 => ErrorKind::UpstreamUnavailable,
                504 => ErrorKind::Timeout,
                _ => ErrorKind::Terminal,
            },
            DepotError::LocalCache { .. } => ErrorKind::Terminal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type alias for DEPOT operations.
pub type DepotResult<T> = Result<T, DepotError>;

/// Result type alias for store adapter operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// TESTS
// =============================================================================
