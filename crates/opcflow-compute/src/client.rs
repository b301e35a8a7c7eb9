//! REST client for the compute control plane
//!
//! One authenticated [`ComputeClient`] is shared by every resource type;
//! [`ResourceEndpoint`] binds it to a single collection and implements the
//! engine's [`RemoteClient`] contract.

use crate::config::ComputeConfig;
use crate::error::Result;
use crate::resources::ResourceKind;
use async_trait::async_trait;
use opcflow_reconcile::{
    Attributes, CallContext, CreateRequest, ReconciliationEngine, RemoteClient, RemoteError,
    UpdateRequest,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const MEDIA_TYPE: &str = "application/oracle-compute-v3+json";
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Authenticated session against one identity domain
pub struct ComputeClient {
    http: reqwest::Client,
    config: ComputeConfig,
    authenticated: Mutex<bool>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl ComputeClient {
    pub fn new(config: ComputeConfig) -> Result<Self> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            config,
            authenticated: Mutex::new(false),
        })
    }

    pub fn config(&self) -> &ComputeConfig {
        &self.config
    }

    /// Endpoint for one resource collection
    pub fn endpoint(self: &Arc<Self>, kind: ResourceKind) -> ResourceEndpoint {
        ResourceEndpoint {
            client: Arc::clone(self),
            kind,
        }
    }

    /// Reconciliation engine for one resource type
    pub fn engine(self: &Arc<Self>, kind: ResourceKind) -> ReconciliationEngine<ResourceEndpoint> {
        ReconciliationEngine::new(kind.descriptor(), self.endpoint(kind))
    }

    /// Open a session; the cookie store keeps it for later calls
    pub async fn authenticate(&self, ctx: &CallContext) -> std::result::Result<(), RemoteError> {
        let body = json!({
            "user": self.config.qualified_user(),
            "password": self.config.password,
        });
        tracing::debug!("Authenticating as {}", self.config.qualified_user());
        self.dispatch(ctx, Method::POST, "/authenticate/", Some(&body))
            .await?;
        Ok(())
    }

    async fn ensure_session(&self, ctx: &CallContext) -> std::result::Result<(), RemoteError> {
        let mut authenticated = self.authenticated.lock().await;
        if !*authenticated {
            self.authenticate(ctx).await?;
            *authenticated = true;
        }
        Ok(())
    }

    /// Send an authenticated request; `Ok(None)` means the body was empty
    pub async fn send(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Option<Value>, RemoteError> {
        self.ensure_session(ctx).await?;
        let result = self.dispatch(ctx, method, path, body).await;
        if matches!(result, Err(RemoteError::Unauthorized(_))) {
            // Session expired; the next call authenticates again
            *self.authenticated.lock().await = false;
        }
        result
    }

    async fn dispatch(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Option<Value>, RemoteError> {
        let url = format!("{}{}", self.config.endpoint, path);
        let timeout = ctx.timeout.or(self.config.timeout);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, MEDIA_TYPE);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, MEDIA_TYPE)
                .body(body.to_string());
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        if let Some(request_id) = &ctx.request_id {
            request = request.header(REQUEST_ID_HEADER, request_id);
        }

        tracing::debug!(
            request_id = ctx.request_id.as_deref().unwrap_or("-"),
            "{} {}",
            method,
            path
        );

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if !status.is_success() {
            return Err(status_error(status, path, &text));
        }

        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| RemoteError::Decode(format!("{} {}: {}", method, path, e)))
    }
}

fn transport_error(error: reqwest::Error, timeout: Option<Duration>) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout(timeout.unwrap_or_default())
    } else {
        RemoteError::Transport(error.to_string())
    }
}

fn status_error(status: StatusCode, path: &str, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(path.to_string()),
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(message),
        _ => RemoteError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// [`ComputeClient`] bound to the collection of one resource type
#[derive(Clone)]
pub struct ResourceEndpoint {
    client: Arc<ComputeClient>,
    kind: ResourceKind,
}

impl ResourceEndpoint {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn object_path(&self, identity: &str) -> String {
        format!(
            "{}{}",
            self.kind.wire().collection,
            self.client.config.qualify(identity)
        )
    }

    fn decode(&self, body: Value) -> std::result::Result<Attributes, RemoteError> {
        let config = &self.client.config;
        self.kind.wire().decode(body, |name| config.unqualify(name))
    }
}

#[async_trait]
impl RemoteClient for ResourceEndpoint {
    async fn create(
        &self,
        ctx: &CallContext,
        request: &CreateRequest,
    ) -> std::result::Result<Attributes, RemoteError> {
        let wire = self.kind.wire();
        let body = wire.encode(
            &self.client.config.qualify(&request.identity),
            &request.fields,
        );
        let path = format!("{}/", wire.collection);
        match self.client.send(ctx, Method::POST, &path, Some(&body)).await? {
            Some(created) => self.decode(created),
            None => Ok(Attributes::new()),
        }
    }

    async fn read(
        &self,
        ctx: &CallContext,
        identity: &str,
    ) -> std::result::Result<Option<Attributes>, RemoteError> {
        let path = self.object_path(identity);
        match self.client.send(ctx, Method::GET, &path, None).await? {
            Some(body) => self.decode(body).map(Some),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        ctx: &CallContext,
        request: &UpdateRequest,
    ) -> std::result::Result<Attributes, RemoteError> {
        let body = self.kind.wire().encode(
            &self.client.config.qualify(&request.identity),
            &request.fields,
        );
        let path = self.object_path(&request.identity);
        match self.client.send(ctx, Method::PUT, &path, Some(&body)).await? {
            Some(updated) => self.decode(updated),
            None => Ok(Attributes::new()),
        }
    }

    async fn delete(
        &self,
        ctx: &CallContext,
        identity: &str,
    ) -> std::result::Result<(), RemoteError> {
        let path = self.object_path(identity);
        self.client.send(ctx, Method::DELETE, &path, None).await?;
        Ok(())
    }
}
