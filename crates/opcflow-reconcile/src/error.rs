//! Reconciler error types

use crate::client::RemoteError;
use thiserror::Error;

/// Lifecycle operation performed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Import => write!(f, "import"),
        }
    }
}

/// Desired configuration rejected before any remote call was made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field '{0}' is missing")]
    MissingField(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{0}' is computed and cannot be set")]
    ComputedField(String),

    #[error("field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field '{field}' must be one of [{allowed}], got '{value}'")]
    NotAllowed {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("identity must not be empty")]
    EmptyIdentity,

    #[error("fields [{}] cannot be changed in place and require replacement", .0.join(", "))]
    ForceNewChanged(Vec<String>),

    #[error("{0} does not support in-place update")]
    UpdateNotSupported(&'static str),

    #[error("identity '{desired}' does not match existing resource '{current}'")]
    IdentityMismatch { current: String, desired: String },
}

/// Reconciler errors
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("invalid {kind} '{name}': {source}")]
    Validation {
        kind: &'static str,
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("failed to {operation} {kind} '{name}': {source}")]
    Remote {
        operation: Operation,
        kind: &'static str,
        name: String,
        #[source]
        source: RemoteError,
    },

    #[error("cannot import {kind} '{name}': it does not exist")]
    ImportNotFound { kind: &'static str, name: String },

    #[error("{kind} '{name}' disappeared when re-read after {operation}")]
    VanishedAfterWrite {
        operation: Operation,
        kind: &'static str,
        name: String,
    },

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Whether the error was raised before reaching the remote system
    pub fn is_validation(&self) -> bool {
        matches!(self, ReconcileError::Validation { .. })
    }

    /// The remote failure behind this error, if any
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ReconcileError::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
