//! Boundary between the engine and the host's configuration store
//!
//! The engine works on [`Attributes`]. Hosts keep typed configuration
//! ([`TypedResource`]) and persist observed state through a [`StateBinder`].

use crate::descriptor::ResourceDescriptor;
use crate::error::ValidationError;
use crate::value::{Attributes, FieldValue};
use serde::{Deserialize, Serialize};

/// Observed state of a resource known to exist remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    identity: String,
    attributes: Attributes,
}

impl ResourceRecord {
    /// A record always carries a non-empty identity
    pub fn new(
        identity: impl Into<String>,
        attributes: Attributes,
    ) -> Result<Self, ValidationError> {
        let identity = identity.into();
        if identity.is_empty() {
            return Err(ValidationError::EmptyIdentity);
        }
        Ok(Self {
            identity,
            attributes,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Local key of a managed resource (`kind:name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Parse a `kind:name` string
    pub fn parse(key: &str) -> Option<Self> {
        let (kind, name) = key.split_once(':')?;
        if kind.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(kind, name))
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Host-side store of observed resource state
pub trait StateBinder {
    /// Previously bound record, if the resource is believed to exist
    fn load(&self, key: &ResourceKey) -> Option<ResourceRecord>;

    /// Bind observed state after a successful operation
    fn store(&mut self, key: &ResourceKey, record: &ResourceRecord);

    /// Forget the resource; it is absent remotely
    fn clear(&mut self, key: &ResourceKey);
}

/// Strongly typed configuration of one resource type
pub trait TypedResource: Sized {
    fn descriptor() -> &'static ResourceDescriptor;

    fn name(&self) -> &str;

    /// Desired configuration for the engine
    fn to_attributes(&self) -> Attributes;

    /// Typed view of observed configuration
    fn from_attributes(attrs: &Attributes) -> Result<Self, ValidationError>;

    fn from_record(record: &ResourceRecord) -> Result<Self, ValidationError> {
        Self::from_attributes(record.attributes())
    }
}

/// Typed accessors used by [`TypedResource::from_attributes`] implementations
pub struct AttributeReader<'a> {
    attrs: &'a Attributes,
}

impl<'a> AttributeReader<'a> {
    pub fn new(attrs: &'a Attributes) -> Self {
        Self { attrs }
    }

    pub fn string(&self, field: &str) -> Result<String, ValidationError> {
        self.opt_string(field)?
            .ok_or_else(|| ValidationError::MissingField(field.to_string()))
    }

    pub fn opt_string(&self, field: &str) -> Result<Option<String>, ValidationError> {
        match self.attrs.get(field) {
            None => Ok(None),
            Some(FieldValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(mismatch(field, "a string", other)),
        }
    }

    pub fn bool_or(&self, field: &str, default: bool) -> Result<bool, ValidationError> {
        match self.attrs.get(field) {
            None => Ok(default),
            Some(FieldValue::Bool(b)) => Ok(*b),
            Some(other) => Err(mismatch(field, "a boolean", other)),
        }
    }

    pub fn list(&self, field: &str) -> Result<Vec<String>, ValidationError> {
        match self.attrs.get(field) {
            None => Ok(Vec::new()),
            Some(FieldValue::List(items)) => Ok(items.clone()),
            Some(other) => Err(mismatch(field, "a list", other)),
        }
    }
}

fn mismatch(field: &str, expected: &'static str, found: &FieldValue) -> ValidationError {
    ValidationError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::attributes;

    #[test]
    fn test_record_requires_identity() {
        assert_eq!(
            ResourceRecord::new("", Attributes::new()),
            Err(ValidationError::EmptyIdentity)
        );
        assert!(ResourceRecord::new("k1", Attributes::new()).is_ok());
    }

    #[test]
    fn test_resource_key_round_trip() {
        let key = ResourceKey::new("ssh_key", "k1");
        assert_eq!(key.to_string(), "ssh_key:k1");
        assert_eq!(ResourceKey::parse("ssh_key:k1"), Some(key));
        assert_eq!(ResourceKey::parse("ssh_key"), None);
        assert_eq!(ResourceKey::parse(":k1"), None);
    }

    #[test]
    fn test_attribute_reader() {
        let attrs = attributes([
            ("name", FieldValue::from("k1")),
            ("enabled", FieldValue::from(false)),
        ]);
        let reader = AttributeReader::new(&attrs);

        assert_eq!(reader.string("name").unwrap(), "k1");
        assert!(!reader.bool_or("enabled", true).unwrap());
        assert!(reader.list("tags").unwrap().is_empty());
        assert_eq!(
            reader.string("key"),
            Err(ValidationError::MissingField("key".to_string()))
        );
        assert!(matches!(
            reader.list("name"),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }
}
