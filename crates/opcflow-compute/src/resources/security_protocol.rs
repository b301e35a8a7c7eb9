//! Security protocol: port sets matched by network security rules

use super::{IpProtocol, parse_enum};
use crate::wire::WireSpec;
use opcflow_reconcile::{
    AttributeReader, Attributes, FieldKind, FieldSpec, FieldValue, ResourceDescriptor,
    TypedResource, ValidationError,
};
use std::sync::LazyLock;

static DESCRIPTOR: LazyLock<ResourceDescriptor> = LazyLock::new(|| {
    ResourceDescriptor::new(
        "security_protocol",
        vec![
            FieldSpec::required("name", FieldKind::String).force_new(),
            FieldSpec::optional("description", FieldKind::String).force_new(),
            FieldSpec::optional("ip_protocol", FieldKind::String)
                .with_default(IpProtocol::All.as_str())
                .one_of(IpProtocol::VALUES),
            FieldSpec::optional("src_ports", FieldKind::OrderedList),
            FieldSpec::optional("dst_ports", FieldKind::OrderedList),
            FieldSpec::optional("tags", FieldKind::UnorderedList).force_new(),
            FieldSpec::computed("uri", FieldKind::String),
        ],
    )
});

pub static WIRE: WireSpec = WireSpec {
    collection: "/network/v1/secprotocol",
    renames: &[
        ("ip_protocol", "ipProtocol"),
        ("src_ports", "srcPortSet"),
        ("dst_ports", "dstPortSet"),
    ],
    fqdn_field: None,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityProtocol {
    pub name: String,
    pub description: Option<String>,
    pub ip_protocol: IpProtocol,
    pub src_ports: Vec<String>,
    pub dst_ports: Vec<String>,
    pub tags: Vec<String>,
    pub uri: Option<String>,
}

impl SecurityProtocol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            ip_protocol: IpProtocol::All,
            src_ports: Vec::new(),
            dst_ports: Vec::new(),
            tags: Vec::new(),
            uri: None,
        }
    }
}

impl TypedResource for SecurityProtocol {
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
        attrs.insert(
            "ip_protocol".to_string(),
            FieldValue::from(self.ip_protocol.as_str()),
        );
        for (field, list) in [
            ("src_ports", &self.src_ports),
            ("dst_ports", &self.dst_ports),
            ("tags", &self.tags),
        ] {
            if !list.is_empty() {
                attrs.insert(field.to_string(), FieldValue::from(list.clone()));
            }
        }
        attrs
    }

    fn from_attributes(attrs: &Attributes) -> Result<Self, ValidationError> {
        let reader = AttributeReader::new(attrs);
        let ip_protocol = match reader.opt_string("ip_protocol")? {
            Some(value) => parse_enum("ip_protocol", &value)?,
            None => IpProtocol::All,
        };

        Ok(Self {
            name: reader.string("name")?,
            description: reader.opt_string("description")?,
            ip_protocol,
            src_ports: reader.list("src_ports")?,
            dst_ports: reader.list("dst_ports")?,
            tags: reader.list("tags")?,
            uri: reader.opt_string("uri")?,
        })
    }
}
