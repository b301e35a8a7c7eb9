//! Compute provider error types

use opcflow_reconcile::{ReconcileError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("Missing configuration: {field} (set it in the provider block or via {env})")]
    MissingConfig {
        field: &'static str,
        env: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid resource data: {0}")]
    InvalidResource(#[from] ValidationError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

pub type Result<T> = std::result::Result<T, ComputeError>;
