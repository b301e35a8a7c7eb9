//! OpcFlow declarative resource reconciler
//!
//! This crate converges named remote objects towards a desired
//! configuration. Every managed resource type reuses one generic lifecycle
//! (create, read, update, delete, import) and only supplies metadata.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 host / opcflow CLI               │
//! │        (desired config, observed state)          │
//! └─────────────────┬───────────────────────────────┘
//!                   │ StateBinder / TypedResource
//! ┌─────────────────▼───────────────────────────────┐
//! │             ReconciliationEngine                 │
//! │  ┌──────────────────────┐  ┌─────────────────┐  │
//! │  │  ResourceDescriptor  │  │  normalize/diff │  │
//! │  └──────────────────────┘  └─────────────────┘  │
//! └─────────────────┬───────────────────────────────┘
//!                   │ trait RemoteClient
//! ┌─────────────────▼───────────────────────────────┐
//! │        per-type remote CRUD endpoint             │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod binder;
pub mod client;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod state;
pub mod value;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use binder::{AttributeReader, ResourceKey, ResourceRecord, StateBinder, TypedResource};
pub use client::{CallContext, CreateRequest, Lookup, RemoteClient, RemoteError, UpdateRequest};
pub use descriptor::{EnumRule, FieldKind, FieldSpec, Presence, ResourceDescriptor};
pub use engine::ReconciliationEngine;
pub use error::{Operation, ReconcileError, Result, ValidationError};
pub use normalize::FieldChange;
pub use state::{GlobalState, ResourceState, StateLock, StateManager};
pub use value::{Attributes, FieldValue, attributes};
