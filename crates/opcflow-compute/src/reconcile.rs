//! Manifest-wide reconciliation
//!
//! Deletions of resources dropped from the manifest run first, in reverse
//! [`ResourceKind::ALL`] order; creates and updates follow in forward order.

use crate::client::{ComputeClient, ResourceEndpoint};
use crate::error::Result;
use crate::manifest::Manifest;
use crate::resources::ResourceKind;
use opcflow_reconcile::{
    ApplyResult, CallContext, GlobalState, Plan, ReconciliationEngine, RemoteClient, ResourceKey,
    ResourceRecord, StateBinder,
};
use std::sync::Arc;
use std::time::Instant;

/// Supplies a reconciliation engine per resource kind
pub trait EngineSource {
    type Client: RemoteClient;

    fn engine(&self, kind: ResourceKind) -> ReconciliationEngine<Self::Client>;
}

impl EngineSource for Arc<ComputeClient> {
    type Client = ResourceEndpoint;

    fn engine(&self, kind: ResourceKind) -> ReconciliationEngine<ResourceEndpoint> {
        ComputeClient::engine(self, kind)
    }
}

/// One unit of work: a resource name and its desired attributes, if any
struct Target<'a> {
    kind: ResourceKind,
    name: String,
    desired: Option<&'a opcflow_reconcile::Attributes>,
}

fn kind_of(key: &ResourceKey) -> Option<ResourceKind> {
    let kind = ResourceKind::parse(&key.kind);
    if kind.is_none() {
        tracing::warn!("Ignoring state entry of unknown kind: {}", key);
    }
    kind
}

fn targets<'a>(state: &GlobalState, manifest: &'a Manifest) -> Vec<Target<'a>> {
    let bound = state.keys();
    let mut targets = Vec::new();

    for kind in ResourceKind::ALL.into_iter().rev() {
        for key in &bound {
            if kind_of(key) == Some(kind) && manifest.get(kind, &key.name).is_none() {
                targets.push(Target {
                    kind,
                    name: key.name.clone(),
                    desired: None,
                });
            }
        }
    }

    for kind in ResourceKind::ALL {
        for resource in manifest.resources_of_kind(kind) {
            targets.push(Target {
                kind,
                name: resource.name.clone(),
                desired: Some(&resource.attributes),
            });
        }
    }

    targets
}

/// Refresh bound state and compute the actions needed to reach the manifest
pub async fn plan<S: EngineSource>(
    source: &S,
    ctx: &CallContext,
    state: &mut GlobalState,
    manifest: &Manifest,
) -> Result<Plan> {
    let mut actions = Vec::new();

    for target in targets(state, manifest) {
        let engine = source.engine(target.kind);
        let key = ResourceKey::new(target.kind.as_str(), &target.name);
        let prior = engine.refresh(ctx, state, &key).await?;
        actions.push(engine.plan(&target.name, prior.as_ref(), target.desired)?);
    }

    Ok(Plan::new(actions))
}

/// Converge every resource; failures are recorded and the rest still run.
///
/// Each resource is refreshed again before it is acted on, even when a plan
/// was computed just before.
pub async fn apply<S: EngineSource>(
    source: &S,
    ctx: &CallContext,
    state: &mut GlobalState,
    manifest: &Manifest,
) -> ApplyResult {
    let started = Instant::now();
    let mut result = ApplyResult::new();

    for target in targets(state, manifest) {
        converge(source, ctx, state, &target, &mut result).await;
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    result
}

/// Delete bound resources, all of them or only `only`
pub async fn destroy<S: EngineSource>(
    source: &S,
    ctx: &CallContext,
    state: &mut GlobalState,
    only: Option<&ResourceKey>,
) -> ApplyResult {
    let started = Instant::now();
    let mut result = ApplyResult::new();
    let bound = state.keys();

    for kind in ResourceKind::ALL.into_iter().rev() {
        for key in &bound {
            if kind_of(key) != Some(kind) || only.is_some_and(|o| o != key) {
                continue;
            }
            let target = Target {
                kind,
                name: key.name.clone(),
                desired: None,
            };
            converge(source, ctx, state, &target, &mut result).await;
        }
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    result
}

async fn converge<S: EngineSource>(
    source: &S,
    ctx: &CallContext,
    state: &mut GlobalState,
    target: &Target<'_>,
    result: &mut ApplyResult,
) {
    let engine = source.engine(target.kind);
    let key = ResourceKey::new(target.kind.as_str(), &target.name);

    match engine
        .converge(ctx, state, &target.name, target.desired)
        .await
    {
        Ok(action) if action.action_type == opcflow_reconcile::ActionType::NoOp => {
            tracing::debug!("{} is up to date", key);
        }
        Ok(action) => result.add_success(action.id, action.description),
        Err(e) => {
            tracing::error!("Failed to converge {}: {}", key, e);
            result.add_failure(key.to_string(), e.to_string());
        }
    }
}

/// Re-read every bound resource; returns the keys found to be gone
pub async fn refresh_all<S: EngineSource>(
    source: &S,
    ctx: &CallContext,
    state: &mut GlobalState,
) -> Result<Vec<ResourceKey>> {
    let mut vanished = Vec::new();

    for key in state.keys() {
        let Some(kind) = kind_of(&key) else {
            continue;
        };
        if source
            .engine(kind)
            .refresh(ctx, state, &key)
            .await?
            .is_none()
        {
            vanished.push(key);
        }
    }

    Ok(vanished)
}

/// Adopt an existing remote object into state
pub async fn import<S: EngineSource>(
    source: &S,
    ctx: &CallContext,
    state: &mut GlobalState,
    kind: ResourceKind,
    name: &str,
) -> Result<ResourceRecord> {
    let record = source.engine(kind).import(ctx, name).await?;
    state.store(&ResourceKey::new(kind.as_str(), name), &record);
    Ok(record)
}
