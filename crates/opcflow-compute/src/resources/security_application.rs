//! Security application: a protocol/port pair used by security rules.
//!
//! The API offers no update; any change replaces the application.

use super::{IcmpCode, IcmpType, IpProtocol, parse_enum};
use crate::wire::WireSpec;
use opcflow_reconcile::{
    AttributeReader, Attributes, FieldKind, FieldSpec, FieldValue, ResourceDescriptor,
    TypedResource, ValidationError,
};
use std::sync::LazyLock;

static DESCRIPTOR: LazyLock<ResourceDescriptor> = LazyLock::new(|| {
    ResourceDescriptor::new(
        "security_application",
        vec![
            FieldSpec::required("name", FieldKind::String).force_new(),
            FieldSpec::optional("description", FieldKind::String).force_new(),
            FieldSpec::required("protocol", FieldKind::String)
                .force_new()
                .one_of(IpProtocol::VALUES),
            FieldSpec::optional("dport", FieldKind::String).force_new(),
            FieldSpec::optional("icmptype", FieldKind::String)
                .force_new()
                .one_of(IcmpType::VALUES),
            FieldSpec::optional("icmpcode", FieldKind::String)
                .force_new()
                .one_of(IcmpCode::VALUES),
            FieldSpec::computed("fqdn", FieldKind::String),
        ],
    )
});

pub static WIRE: WireSpec = WireSpec {
    collection: "/secapplication",
    renames: &[],
    fqdn_field: Some("fqdn"),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityApplication {
    pub name: String,
    pub description: Option<String>,
    pub protocol: IpProtocol,
    /// Destination port or port range, e.g. `22` or `8000-8080`
    pub dport: Option<String>,
    pub icmptype: Option<IcmpType>,
    pub icmpcode: Option<IcmpCode>,
    pub fqdn: Option<String>,
}

impl SecurityApplication {
    pub fn new(name: impl Into<String>, protocol: IpProtocol) -> Self {
        Self {
            name: name.into(),
            description: None,
            protocol,
            dport: None,
            icmptype: None,
            icmpcode: None,
            fqdn: None,
        }
    }
}

impl TypedResource for SecurityApplication {
    fn descriptor() -> &'static ResourceDescriptor {
        &DESCRIPTOR
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), FieldValue::from(self.name.as_str()));
        attrs.insert(
            "protocol".to_string(),
            FieldValue::from(self.protocol.as_str()),
        );
        if let Some(description) = &self.description {
            attrs.insert("description".to_string(), FieldValue::from(description.as_str()));
        }
        if let Some(dport) = &self.dport {
            attrs.insert("dport".to_string(), FieldValue::from(dport.as_str()));
        }
        if let Some(icmptype) = self.icmptype {
            attrs.insert("icmptype".to_string(), FieldValue::from(icmptype.as_str()));
        }
        if let Some(icmpcode) = self.icmpcode {
            attrs.insert("icmpcode".to_string(), FieldValue::from(icmpcode.as_str()));
        }
        attrs
    }

    fn from_attributes(attrs: &Attributes) -> Result<Self, ValidationError> {
        let reader = AttributeReader::new(attrs);
        let protocol = parse_enum("protocol", &reader.string("protocol")?)?;
        let icmptype = reader
            .opt_string("icmptype")?
            .filter(|v| !v.is_empty())
            .map(|v| parse_enum("icmptype", &v))
            .transpose()?;
        let icmpcode = reader
            .opt_string("icmpcode")?
            .filter(|v| !v.is_empty())
            .map(|v| parse_enum("icmpcode", &v))
            .transpose()?;

        Ok(Self {
            name: reader.string("name")?,
            description: reader.opt_string("description")?,
            protocol,
            dport: reader.opt_string("dport")?.filter(|v| !v.is_empty()),
            icmptype,
            icmpcode,
            fqdn: reader.opt_string("fqdn")?,
        })
    }
}
