//! Reconciliation engine
//!
//! One engine instance drives the lifecycle of a single resource type. It is
//! parameterized by that type's [`ResourceDescriptor`] and the
//! [`RemoteClient`] that talks to the remote collection.
//!
//! ```text
//!            create ──► read ──► Found ─┐
//!                                       ├─► bound
//!   update (mutable only) ──► read ─────┘
//!
//!   read ──► Found ──► bound
//!        └─► NotFound / empty payload ──► absent (not an error)
//!
//!   delete ──► ok / NotFound ──► absent
//! ```
//!
//! The engine holds no locks. Calls for different identities may run
//! concurrently; calls for the same identity must be serialized by the
//! caller.

use crate::action::{Action, ActionType};
use crate::binder::{ResourceKey, ResourceRecord, StateBinder};
use crate::client::{CallContext, CreateRequest, Lookup, RemoteClient, RemoteError, UpdateRequest};
use crate::descriptor::ResourceDescriptor;
use crate::error::{Operation, ReconcileError, Result, ValidationError};
use crate::value::{Attributes, FieldValue};

/// Generic lifecycle driver for one resource type
pub struct ReconciliationEngine<C> {
    descriptor: &'static ResourceDescriptor,
    client: C,
}

impl<C: RemoteClient> ReconciliationEngine<C> {
    pub fn new(descriptor: &'static ResourceDescriptor, client: C) -> Self {
        Self { descriptor, client }
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create the resource, then read it back to pick up computed fields
    pub async fn create(&self, ctx: &CallContext, desired: &Attributes) -> Result<ResourceRecord> {
        let desired = self.validate(desired)?;
        let name = self.candidate_name(&desired);

        let request = CreateRequest {
            identity: name.clone(),
            fields: self.descriptor.create_payload(&desired),
        };

        tracing::info!("Creating {} {}", self.descriptor.kind(), name);
        let created = self
            .client
            .create(ctx, &request)
            .await
            .map_err(|e| self.remote_error(Operation::Create, &name, e))?;

        // The remote system owns the canonical name
        let identity = self
            .descriptor
            .identity_of(&created)
            .map(str::to_string)
            .unwrap_or(name);

        self.read_back(ctx, Operation::Create, &identity).await
    }

    /// Read the resource; absence is a normal outcome, not an error
    pub async fn read(&self, ctx: &CallContext, identity: &str) -> Result<Lookup<ResourceRecord>> {
        self.require_identity(identity)?;
        self.fetch(ctx, Operation::Read, identity).await
    }

    /// Apply the full desired configuration to mutable fields, then read back
    pub async fn update(
        &self,
        ctx: &CallContext,
        current: &ResourceRecord,
        desired: &Attributes,
    ) -> Result<ResourceRecord> {
        let desired = self.validate(desired)?;
        let name = self.candidate_name(&desired);

        if name != current.identity() {
            return Err(self.invalid(
                current.identity(),
                ValidationError::IdentityMismatch {
                    current: current.identity().to_string(),
                    desired: name,
                },
            ));
        }

        let force_new = self
            .descriptor
            .replacement_fields(current.attributes(), &desired);
        if !force_new.is_empty() {
            return Err(self.invalid(&name, ValidationError::ForceNewChanged(force_new)));
        }

        if !self.descriptor.supports_update() {
            return Err(self.invalid(
                &name,
                ValidationError::UpdateNotSupported(self.descriptor.kind()),
            ));
        }

        // The update replaces every mutable field; unmanaged lists keep their remote value
        let mut fields = self.descriptor.update_payload(&desired);
        for spec in self.descriptor.fields() {
            if spec.is_mutable() && spec.leaves_unmanaged(desired.get(spec.name)) {
                if let Some(value) = current.attributes().get(spec.name) {
                    fields.insert(spec.name.to_string(), value.clone());
                }
            }
        }

        let request = UpdateRequest {
            identity: name.clone(),
            fields,
        };

        tracing::info!("Updating {} {}", self.descriptor.kind(), name);
        let updated = self
            .client
            .update(ctx, &request)
            .await
            .map_err(|e| self.remote_error(Operation::Update, &name, e))?;

        let identity = self
            .descriptor
            .identity_of(&updated)
            .map(str::to_string)
            .unwrap_or(name);

        self.read_back(ctx, Operation::Update, &identity).await
    }

    /// Delete the resource; deleting an absent resource succeeds
    pub async fn delete(&self, ctx: &CallContext, identity: &str) -> Result<()> {
        self.require_identity(identity)?;

        tracing::info!("Deleting {} {}", self.descriptor.kind(), identity);
        match self.client.delete(ctx, identity).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    "{} {} already absent, nothing to delete",
                    self.descriptor.kind(),
                    identity
                );
                Ok(())
            }
            Err(e) => Err(self.remote_error(Operation::Delete, identity, e)),
        }
    }

    /// Adopt an existing remote object by name
    pub async fn import(&self, ctx: &CallContext, identity: &str) -> Result<ResourceRecord> {
        self.require_identity(identity)?;
        match self.fetch(ctx, Operation::Import, identity).await? {
            Lookup::Found(record) => Ok(record),
            Lookup::Absent => Err(ReconcileError::ImportNotFound {
                kind: self.descriptor.kind(),
                name: identity.to_string(),
            }),
        }
    }

    /// True iff any ForceNew field differs between the two configurations
    pub fn requires_replacement(&self, old: &Attributes, new: &Attributes) -> bool {
        self.descriptor.requires_replacement(old, new)
    }

    /// Decide what it takes to move from `prior` to `desired`
    pub fn plan(
        &self,
        name: &str,
        prior: Option<&ResourceRecord>,
        desired: Option<&Attributes>,
    ) -> Result<Action> {
        let kind = self.descriptor.kind();
        let desired = desired.map(|d| self.validate(d)).transpose()?;

        let action = match (prior, desired) {
            (None, None) => Action::new(ActionType::NoOp, kind, name, Vec::new()),
            (None, Some(desired)) => {
                let changes = self.descriptor.diff(&Attributes::new(), &desired);
                Action::new(ActionType::Create, kind, name, changes)
            }
            (Some(prior), None) => {
                let changes = self.descriptor.diff(prior.attributes(), &Attributes::new());
                Action::new(ActionType::Delete, kind, name, changes)
            }
            (Some(prior), Some(desired)) => {
                let changes = self.descriptor.diff(prior.attributes(), &desired);
                let action_type = if changes.is_empty() {
                    ActionType::NoOp
                } else if changes.iter().any(|c| c.force_new) {
                    ActionType::Replace
                } else {
                    ActionType::Update
                };
                Action::new(action_type, kind, name, changes)
            }
        };

        Ok(action)
    }

    /// Refresh, plan and execute for one resource, binding the outcome.
    ///
    /// `desired = None` means the resource should not exist. The binder is
    /// written only after each remote step succeeds.
    pub async fn converge<B: StateBinder + ?Sized>(
        &self,
        ctx: &CallContext,
        binder: &mut B,
        name: &str,
        desired: Option<&Attributes>,
    ) -> Result<Action> {
        let key = ResourceKey::new(self.descriptor.kind(), name);
        let prior = self.refresh(ctx, binder, &key).await?;
        let action = self.plan(name, prior.as_ref(), desired)?;

        match (action.action_type, prior, desired) {
            (ActionType::Create, _, Some(desired)) => {
                let record = self.create(ctx, desired).await?;
                binder.store(&key, &record);
            }
            (ActionType::Update, Some(prior), Some(desired)) => {
                let record = self.update(ctx, &prior, desired).await?;
                binder.store(&key, &record);
            }
            (ActionType::Replace, Some(prior), Some(desired)) => {
                self.delete(ctx, prior.identity()).await?;
                binder.clear(&key);
                let record = self.create(ctx, desired).await?;
                binder.store(&key, &record);
            }
            (ActionType::Delete, Some(prior), _) => {
                self.delete(ctx, prior.identity()).await?;
                binder.clear(&key);
            }
            _ => {}
        }

        Ok(action)
    }

    /// Re-read a bound resource, clearing the binding if it is gone
    pub async fn refresh<B: StateBinder + ?Sized>(
        &self,
        ctx: &CallContext,
        binder: &mut B,
        key: &ResourceKey,
    ) -> Result<Option<ResourceRecord>> {
        let Some(prior) = binder.load(key) else {
            return Ok(None);
        };

        match self.read(ctx, prior.identity()).await? {
            Lookup::Found(record) => {
                binder.store(key, &record);
                Ok(Some(record))
            }
            Lookup::Absent => {
                tracing::info!(
                    "{} {} no longer exists remotely, removing from state",
                    self.descriptor.kind(),
                    prior.identity()
                );
                binder.clear(key);
                Ok(None)
            }
        }
    }

    async fn fetch(
        &self,
        ctx: &CallContext,
        operation: Operation,
        identity: &str,
    ) -> Result<Lookup<ResourceRecord>> {
        tracing::debug!("Reading {} {}", self.descriptor.kind(), identity);

        let raw = match self.client.read(ctx, identity).await {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                tracing::debug!(
                    "{} {} returned an empty payload, treating as absent",
                    self.descriptor.kind(),
                    identity
                );
                return Ok(Lookup::Absent);
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} {} not found", self.descriptor.kind(), identity);
                return Ok(Lookup::Absent);
            }
            Err(e) => return Err(self.remote_error(operation, identity, e)),
        };

        let mut observed = self.descriptor.normalize_observed(raw);
        let identity = match self.descriptor.identity_of(&observed) {
            Some(observed_identity) => observed_identity.to_string(),
            None => {
                observed.insert(
                    self.descriptor.identity_field().to_string(),
                    FieldValue::from(identity),
                );
                identity.to_string()
            }
        };

        let record = ResourceRecord::new(identity.clone(), observed)
            .map_err(|e| self.invalid(&identity, e))?;
        Ok(Lookup::Found(record))
    }

    async fn read_back(
        &self,
        ctx: &CallContext,
        operation: Operation,
        identity: &str,
    ) -> Result<ResourceRecord> {
        match self.fetch(ctx, operation, identity).await? {
            Lookup::Found(record) => Ok(record),
            Lookup::Absent => Err(ReconcileError::VanishedAfterWrite {
                operation,
                kind: self.descriptor.kind(),
                name: identity.to_string(),
            }),
        }
    }

    fn validate(&self, desired: &Attributes) -> Result<Attributes> {
        self.descriptor.validate(desired).map_err(|e| {
            let name = self
                .descriptor
                .identity_of(desired)
                .unwrap_or("<unnamed>")
                .to_string();
            self.invalid(&name, e)
        })
    }

    fn candidate_name(&self, validated: &Attributes) -> String {
        // validate() guarantees a non-empty identity
        self.descriptor
            .identity_of(validated)
            .unwrap_or_default()
            .to_string()
    }

    fn require_identity(&self, identity: &str) -> Result<()> {
        if identity.is_empty() {
            return Err(self.invalid(identity, ValidationError::EmptyIdentity));
        }
        Ok(())
    }

    fn invalid(&self, name: &str, source: ValidationError) -> ReconcileError {
        ReconcileError::Validation {
            kind: self.descriptor.kind(),
            name: name.to_string(),
            source,
        }
    }

    fn remote_error(&self, operation: Operation, name: &str, source: RemoteError) -> ReconcileError {
        ReconcileError::Remote {
            operation,
            kind: self.descriptor.kind(),
            name: name.to_string(),
            source,
        }
    }
}
