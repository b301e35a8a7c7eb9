//! SSH public keys, as a managed resource and as a read-only lookup

use crate::client::ComputeClient;
use crate::error::Result;
use crate::resources::ResourceKind;
use crate::wire::WireSpec;
use opcflow_reconcile::{
    AttributeReader, Attributes, CallContext, FieldKind, FieldSpec, FieldValue, Lookup,
    ResourceDescriptor, TypedResource, ValidationError,
};
use std::sync::{Arc, LazyLock};

static DESCRIPTOR: LazyLock<ResourceDescriptor> = LazyLock::new(|| {
    ResourceDescriptor::new(
        "ssh_key",
        vec![
            FieldSpec::required("name", FieldKind::String).force_new(),
            FieldSpec::required("key", FieldKind::String),
            FieldSpec::optional("enabled", FieldKind::Bool).with_default(true),
            FieldSpec::computed("fqdn", FieldKind::String),
        ],
    )
});

pub static WIRE: WireSpec = WireSpec {
    collection: "/sshkey",
    renames: &[],
    fqdn_field: Some("fqdn"),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKey {
    pub name: String,
    /// Public key in OpenSSH format
    pub key: String,
    pub enabled: bool,
    pub fqdn: Option<String>,
}

impl SshKey {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            enabled: true,
            fqdn: None,
        }
    }
}

impl TypedResource for SshKey {
    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), FieldValue::from(self.name.as_str()));
        attrs.insert("key".to_string(), FieldValue::from(self.key.as_str()));
        attrs.insert("enabled".to_string(), FieldValue::from(self.enabled));
        attrs
    }

    fn from_attributes(attrs: &Attributes) -> std::result::Result<Self, ValidationError> {
        let reader = AttributeReader::new(attrs);
        Ok(Self {
            name: reader.string("name")?,
            key: reader.string("key")?,
            enabled: reader.bool_or("enabled", true)?,
            fqdn: reader.opt_string("fqdn")?,
        })
    }
}

/// Key looked up by name without being managed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyInfo {
    pub name: String,
    pub key: String,
    pub enabled: bool,
}

impl From<SshKey> for SshKeyInfo {
    fn from(key: SshKey) -> Self {
        Self {
            name: key.name,
            key: key.key,
            enabled: key.enabled,
        }
    }
}

/// Look up an existing key; `None` when no key has that name
pub async fn lookup_ssh_key(
    client: &Arc<ComputeClient>,
    ctx: &CallContext,
    name: &str,
) -> Result<Option<SshKeyInfo>> {
    let engine = client.engine(ResourceKind::SshKey);
    match engine.read(ctx, name).await? {
        Lookup::Found(record) => Ok(Some(SshKey::from_record(&record)?.into())),
        Lookup::Absent => Ok(None),
    }
}
