//! Remote client contract
//!
//! Every managed resource type is backed by a [`RemoteClient`] that performs
//! create/read/update/delete calls keyed by name. The engine never retries;
//! transient failures are the client's concern.

use crate::value::Attributes;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Per-call context handed unchanged from the caller to the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    /// Upper bound for a single remote call
    pub timeout: Option<Duration>,

    /// Correlation id for logs
    pub request_id: Option<String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Create request: identity plus every caller-suppliable field
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub identity: String,
    pub fields: Attributes,
}

/// Update request: identity plus mutable fields only
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub identity: String,
    pub fields: Attributes,
}

/// Errors surfaced by a remote client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether the remote object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

/// Outcome of looking up a remote object
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent => None,
        }
    }
}

/// CRUD operations against the remote system for one resource type
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Create the object and return what the remote reports
    async fn create(
        &self,
        ctx: &CallContext,
        request: &CreateRequest,
    ) -> Result<Attributes, RemoteError>;

    /// Fetch the object.
    ///
    /// `Ok(None)` and an empty map both mean the remote answered without a
    /// body; a missing object may also be reported as [`RemoteError::NotFound`].
    async fn read(
        &self,
        ctx: &CallContext,
        identity: &str,
    ) -> Result<Option<Attributes>, RemoteError>;

    /// Replace the object's mutable fields
    async fn update(
        &self,
        ctx: &CallContext,
        request: &UpdateRequest,
    ) -> Result<Attributes, RemoteError>;

    /// Delete the object
    async fn delete(&self, ctx: &CallContext, identity: &str) -> Result<(), RemoteError>;
}

#[async_trait]
impl<C: RemoteClient + ?Sized> RemoteClient for Arc<C> {
    async fn create(
        &self,
        ctx: &CallContext,
        request: &CreateRequest,
    ) -> Result<Attributes, RemoteError> {
        (**self).create(ctx, request).await
    }

    async fn read(
        &self,
        ctx: &CallContext,
        identity: &str,
    ) -> Result<Option<Attributes>, RemoteError> {
        (**self).read(ctx, identity).await
    }

    async fn update(
        &self,
        ctx: &CallContext,
        request: &UpdateRequest,
    ) -> Result<Attributes, RemoteError> {
        (**self).update(ctx, request).await
    }

    async fn delete(&self, ctx: &CallContext, identity: &str) -> Result<(), RemoteError> {
        (**self).delete(ctx, identity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(RemoteError::NotFound("web".to_string()).is_not_found());
        assert!(
            !RemoteError::Api {
                status: 500,
                message: "boom".to_string()
            }
            .is_not_found()
        );
    }

    #[test]
    fn test_call_context_builder() {
        let ctx = CallContext::new()
            .with_timeout(Duration::from_secs(5))
            .with_request_id("req-1");
        assert_eq!(ctx.timeout, Some(Duration::from_secs(5)));
        assert_eq!(ctx.request_id.as_deref(), Some("req-1"));
    }
}
