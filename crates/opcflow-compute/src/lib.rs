//! Compute provider for OpcFlow
//!
//! Resource definitions, the REST client and the KDL manifest for the
//! Oracle Public Cloud compute API (security lists, security applications,
//! security protocols and SSH keys).
//!
//! ## Configuration
//!
//! Connection settings come from the manifest's `provider "opc"` block and
//! fall back to environment variables:
//!
//! - `OPC_ENDPOINT`: API endpoint URL
//! - `OPC_IDENTITY_DOMAIN`: identity domain
//! - `OPC_USERNAME`: user name
//! - `OPC_PASSWORD`: password (environment only)
//! - `OPC_TIMEOUT_SECS`: per-call timeout

pub mod client;
pub mod config;
pub mod error;
pub mod manifest;
pub mod reconcile;
pub mod resources;
pub mod wire;

pub use client::{ComputeClient, MEDIA_TYPE, ResourceEndpoint};
pub use config::{ComputeConfig, ProviderSettings};
pub use error::{ComputeError, Result};
pub use reconcile::EngineSource;
pub use manifest::{DesiredResource, MANIFEST_FILE, Manifest, load_manifest};
pub use resources::{
    IcmpCode, IcmpType, IpProtocol, Policy, ResourceKind, SecurityApplication, SecurityList,
    SecurityProtocol, SshKey, SshKeyInfo, lookup_ssh_key,
};
pub use wire::WireSpec;
