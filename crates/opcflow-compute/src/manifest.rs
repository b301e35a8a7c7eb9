//! KDL manifest of desired resources
//!
//! ```kdl
//! provider "opc" {
//!     endpoint "https://api-z27.compute.us6.oraclecloud.com"
//!     identity-domain "acme"
//!     user "jo@example.com"
//! }
//!
//! security-list "web" {
//!     policy "permit"
//! }
//!
//! security-protocol "https" {
//!     ip-protocol "tcp"
//!     dst-ports 443 8443
//! }
//!
//! ssh-key "deploy" {
//!     key "ssh-rsa AAAA..."
//!     enabled #true
//! }
//! ```

use crate::config::ProviderSettings;
use crate::error::{ComputeError, Result};
use crate::resources::ResourceKind;
use kdl::{KdlDocument, KdlNode, KdlValue};
use opcflow_reconcile::{Attributes, FieldKind, FieldValue, ResourceKey};
use std::path::Path;

/// Default manifest file name in a project directory
pub const MANIFEST_FILE: &str = "opcflow.kdl";

/// Desired configuration of every managed resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub provider: ProviderSettings,
    pub resources: Vec<DesiredResource>,
}

/// One resource node of the manifest
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredResource {
    pub kind: ResourceKind,
    pub name: String,
    pub attributes: Attributes,
}

impl DesiredResource {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind.as_str(), &self.name)
    }
}

impl Manifest {
    /// Parse manifest text and validate every resource
    pub fn parse(content: &str) -> Result<Self> {
        let doc: KdlDocument = content.parse()?;
        let mut manifest = Manifest::default();

        for node in doc.nodes() {
            let node_name = node.name().value();
            if node_name == "provider" {
                manifest.provider = parse_provider(node)?;
                continue;
            }

            let kind = ResourceKind::parse(node_name).ok_or_else(|| {
                ComputeError::Manifest(format!("unknown resource kind: {}", node_name))
            })?;
            let resource = parse_resource(kind, node)?;

            if manifest.get(kind, &resource.name).is_some() {
                return Err(ComputeError::Manifest(format!(
                    "duplicate {} '{}'",
                    kind, resource.name
                )));
            }
            manifest.resources.push(resource);
        }

        Ok(manifest)
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&DesiredResource> {
        self.resources
            .iter()
            .find(|r| r.kind == kind && r.name == name)
    }

    pub fn resources_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &DesiredResource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }
}

/// Read and parse a manifest file
pub fn load_manifest(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let manifest = Manifest::parse(&content)?;
    tracing::debug!(
        "Loaded {} resources from {}",
        manifest.resources.len(),
        path.display()
    );
    Ok(manifest)
}

fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}

fn parse_provider(node: &KdlNode) -> Result<ProviderSettings> {
    match first_string(node) {
        Some("opc") | None => {}
        Some(other) => {
            return Err(ComputeError::Manifest(format!(
                "unsupported provider: {}",
                other
            )));
        }
    }

    let mut settings = ProviderSettings::default();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let value = first_string(child).map(|s| s.to_string());
            match child.name().value() {
                "endpoint" => settings.endpoint = value,
                "identity_domain" | "identity-domain" => settings.identity_domain = value,
                "user" => settings.user = value,
                "timeout_secs" | "timeout-secs" => {
                    let secs = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .and_then(|v| u64::try_from(v).ok())
                        .ok_or_else(|| {
                            ComputeError::Manifest(
                                "timeout-secs must be a non-negative integer".to_string(),
                            )
                        })?;
                    settings.timeout_secs = Some(secs);
                }
                "password" => {
                    return Err(ComputeError::Manifest(
                        "password must not be written in the manifest; set OPC_PASSWORD"
                            .to_string(),
                    ));
                }
                other => {
                    return Err(ComputeError::Manifest(format!(
                        "unknown provider setting: {}",
                        other
                    )));
                }
            }
        }
    }

    Ok(settings)
}

fn parse_resource(kind: ResourceKind, node: &KdlNode) -> Result<DesiredResource> {
    let name = first_string(node)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ComputeError::Manifest(format!("{} requires a name", kind)))?
        .to_string();

    let descriptor = kind.descriptor();
    let mut attributes = Attributes::new();
    attributes.insert(
        descriptor.identity_field().to_string(),
        FieldValue::from(name.as_str()),
    );

    let invalid =
        |message: String| ComputeError::Manifest(format!("{} '{}': {}", kind, name, message));

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let field = child.name().value().replace('-', "_");
            let spec = descriptor
                .field(&field)
                .ok_or_else(|| invalid(format!("unknown field: {}", child.name().value())))?;

            let values = child
                .entries()
                .iter()
                .filter(|e| e.name().is_none())
                .map(|e| e.value())
                .collect::<Vec<_>>();

            let value = match spec.kind {
                FieldKind::OrderedList | FieldKind::UnorderedList => FieldValue::List(
                    values
                        .into_iter()
                        .map(|v| {
                            scalar(v).ok_or_else(|| {
                                invalid(format!("{} takes strings or numbers", field))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                ),
                FieldKind::Bool => match values.as_slice() {
                    [KdlValue::Bool(b)] => FieldValue::Bool(*b),
                    _ => return Err(invalid(format!("{} takes a single boolean", field))),
                },
                FieldKind::String => match values.as_slice() {
                    [value] => FieldValue::String(
                        scalar(value)
                            .ok_or_else(|| invalid(format!("{} takes a string", field)))?,
                    ),
                    _ => return Err(invalid(format!("{} takes a single value", field))),
                },
            };

            if attributes.insert(field.clone(), value).is_some() {
                return Err(invalid(format!("{} is set more than once", field)));
            }
        }
    }

    let attributes = descriptor
        .validate(&attributes)
        .and_then(|validated| kind.typed_attributes(&validated))
        .map_err(|e| invalid(e.to_string()))?;

    Ok(DesiredResource {
        kind,
        name,
        attributes,
    })
}

fn scalar(value: &KdlValue) -> Option<String> {
    match value {
        KdlValue::String(s) => Some(s.clone()),
        KdlValue::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
provider "opc" {
    endpoint "https://api.example.com"
    identity-domain "acme"
    timeout-secs 30
}

security-list "web" {
    description "web tier"
    policy "PERMIT"
}

security-protocol "https" {
    ip-protocol "tcp"
    dst-ports 443 8443
    tags "web" "tls"
}

ssh-key "deploy" {
    key "ssh-rsa AAAA"
    enabled #false
}
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();

        assert_eq!(manifest.provider.identity_domain.as_deref(), Some("acme"));
        assert_eq!(manifest.provider.timeout_secs, Some(30));
        assert_eq!(manifest.resources.len(), 3);

        let protocol = manifest
            .get(ResourceKind::SecurityProtocol, "https")
            .unwrap();
        assert_eq!(
            protocol.attributes.get("dst_ports"),
            Some(&FieldValue::from(&["443", "8443"][..]))
        );
        assert_eq!(protocol.key().to_string(), "security_protocol:https");

        let key = manifest.get(ResourceKind::SshKey, "deploy").unwrap();
        assert_eq!(key.attributes.get("enabled"), Some(&FieldValue::Bool(false)));

        // Enum spellings come out canonical, defaults filled in
        let list = manifest.get(ResourceKind::SecurityList, "web").unwrap();
        assert_eq!(list.attributes.get("policy"), Some(&FieldValue::from("permit")));
        assert_eq!(
            list.attributes.get("outbound_cidr_policy"),
            Some(&FieldValue::from("permit"))
        );
    }

    #[test]
    fn test_snake_case_kinds_and_fields() {
        let manifest =
            Manifest::parse(r#"security_list "web" { outbound_cidr_policy "deny" }"#).unwrap();
        let list = manifest.get(ResourceKind::SecurityList, "web").unwrap();
        assert!(list.attributes.contains_key("outbound_cidr_policy"));
    }

    #[test]
    fn test_rejects_invalid_manifests() {
        let cases = [
            r#"instance "vm1""#,
            "ssh-key \"k1\" { key \"a\"; }\nssh-key \"k1\" { key \"b\"; }",
            r#"ssh-key "k1" { key "a"; color "red" }"#,
            r#"ssh-key "k1""#,
            r#"security-list "web" { policy "allow" }"#,
            r#"security-list "web" { fqdn "/Compute-acme/jo/web" }"#,
            r#"ssh-key "k1" { key "a"; enabled "yes" }"#,
            r#"provider "opc" { password "secret" }"#,
            r#"security-list { policy "deny" }"#,
        ];

        for case in cases {
            assert!(
                matches!(Manifest::parse(case), Err(ComputeError::Manifest(_))),
                "expected manifest error for: {}",
                case
            );
        }
    }

    #[test]
    fn test_load_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.resources_of_kind(ResourceKind::SshKey).count(), 1);
    }
}
