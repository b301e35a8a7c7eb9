//! Security list: a named group of instances with inbound/outbound policies

use super::{Policy, parse_enum};
use crate::wire::WireSpec;
use opcflow_reconcile::{
    AttributeReader, Attributes, FieldKind, FieldSpec, FieldValue, ResourceDescriptor,
    TypedResource, ValidationError,
};
use std::sync::LazyLock;

static DESCRIPTOR: LazyLock<ResourceDescriptor> = LazyLock::new(|| {
    ResourceDescriptor::new(
        "security_list",
        vec![
            FieldSpec::required("name", FieldKind::String).force_new(),
            FieldSpec::optional("description", FieldKind::String),
            FieldSpec::optional("policy", FieldKind::String)
                .with_default(Policy::Deny.as_str())
                .one_of(Policy::VALUES),
            FieldSpec::optional("outbound_cidr_policy", FieldKind::String)
                .with_default(Policy::Permit.as_str())
                .one_of(Policy::VALUES),
            FieldSpec::computed("fqdn", FieldKind::String),
        ],
    )
});

pub static WIRE: WireSpec = WireSpec {
    collection: "/seclist",
    renames: &[],
    fqdn_field: Some("fqdn"),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityList {
    pub name: String,
    pub description: Option<String>,
    /// Policy for traffic entering the list
    pub policy: Policy,
    /// Policy for traffic leaving towards CIDR targets
    pub outbound_cidr_policy: Policy,
    /// Fully qualified name, known once the list exists
    pub fqdn: Option<String>,
}

impl SecurityList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            policy: Policy::Deny,
            outbound_cidr_policy: Policy::Permit,
            fqdn: None,
        }
    }
}

impl TypedResource for SecurityList {
    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), FieldValue::from(self.name.as_str()));
        if let Some(description) = &self.description {
            attrs.insert("description".to_string(), FieldValue::from(description.as_str()));
        }
        attrs.insert("policy".to_string(), FieldValue::from(self.policy.as_str()));
        attrs.insert(
            "outbound_cidr_policy".to_string(),
            FieldValue::from(self.outbound_cidr_policy.as_str()),
        );
        attrs
    }

    fn from_attributes(attrs: &Attributes) -> Result<Self, ValidationError> {
        let reader = AttributeReader::new(attrs);
        let policy = match reader.opt_string("policy")? {
            Some(value) => parse_enum("policy", &value)?,
            None => Policy::Deny,
        };
        let outbound_cidr_policy = match reader.opt_string("outbound_cidr_policy")? {
            Some(value) => parse_enum("outbound_cidr_policy", &value)?,
            None => Policy::Permit,
        };

        Ok(Self {
            name: reader.string("name")?,
            description: reader.opt_string("description")?,
            policy,
            outbound_cidr_policy,
            fqdn: reader.opt_string("fqdn")?,
        })
    }
}
