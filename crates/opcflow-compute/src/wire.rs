//! JSON wire format of the compute API
//!
//! Field names on the wire differ per collection (`ipProtocol` vs
//! `ip_protocol`) and object names travel fully qualified.

use opcflow_reconcile::{Attributes, FieldValue, RemoteError};
use serde_json::{Map, Value};

/// Per-collection wire mapping
#[derive(Debug, Clone, Copy)]
pub struct WireSpec {
    /// Collection path without trailing slash, e.g. `/seclist`
    pub collection: &'static str,

    /// `(attribute, wire name)` pairs for fields whose names differ
    pub renames: &'static [(&'static str, &'static str)],

    /// Attribute that receives the qualified object name
    pub fqdn_field: Option<&'static str>,
}

impl WireSpec {
    fn wire_name<'a>(&self, attribute: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(attr, _)| *attr == attribute)
            .map(|(_, wire)| *wire)
            .unwrap_or(attribute)
    }

    fn attribute_name<'a>(&self, wire: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(_, w)| *w == wire)
            .map(|(attr, _)| *attr)
            .unwrap_or(wire)
    }

    /// Request body for create/update; `name` is always the qualified name
    pub fn encode(&self, qualified_name: &str, fields: &Attributes) -> Value {
        let mut body = Map::new();
        for (attribute, value) in fields {
            let value = match value {
                FieldValue::Bool(b) => Value::Bool(*b),
                FieldValue::String(s) => Value::String(s.clone()),
                FieldValue::List(items) => {
                    Value::Array(items.iter().cloned().map(Value::String).collect())
                }
            };
            body.insert(self.wire_name(attribute).to_string(), value);
        }
        body.insert("name".to_string(), Value::String(qualified_name.to_string()));
        Value::Object(body)
    }

    /// Attributes reported by a response body.
    ///
    /// Nulls and nested objects are skipped, numbers become strings, and
    /// the qualified name is split into `name` and the fqdn attribute.
    pub fn decode(
        &self,
        body: Value,
        unqualify: impl Fn(&str) -> String,
    ) -> Result<Attributes, RemoteError> {
        let Value::Object(object) = body else {
            return Err(RemoteError::Decode(format!(
                "expected a JSON object from {}, got {}",
                self.collection, body
            )));
        };

        let mut attrs = Attributes::new();
        for (wire, value) in object {
            let attribute = self.attribute_name(&wire).to_string();
            let value = match value {
                Value::Null | Value::Object(_) => continue,
                Value::Bool(b) => FieldValue::Bool(b),
                Value::String(s) => FieldValue::String(s),
                Value::Number(n) => FieldValue::String(n.to_string()),
                Value::Array(items) => FieldValue::List(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => Ok(s),
                            Value::Number(n) => Ok(n.to_string()),
                            other => Err(RemoteError::Decode(format!(
                                "unexpected element in {}: {}",
                                wire, other
                            ))),
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                ),
            };

            if attribute == "name" {
                if let (Some(fqdn), FieldValue::String(qualified)) = (self.fqdn_field, &value) {
                    attrs.insert(fqdn.to_string(), FieldValue::from(qualified.as_str()));
                }
                if let FieldValue::String(qualified) = &value {
                    attrs.insert(attribute, FieldValue::from(unqualify(qualified)));
                    continue;
                }
            }
            attrs.insert(attribute, value);
        }

        Ok(attrs)
    }
}
