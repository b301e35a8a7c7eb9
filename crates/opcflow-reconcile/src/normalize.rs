//! Field comparison and diffing
//!
//! Values are compared after normalization:
//! - enum fields fold case when their rule says so
//! - unordered lists compare as sets, ordered lists as sequences
//! - an absent optional value equals its default
//! - an empty string or empty list equals an absent optional value
//! - an optional list without a default that the new side leaves unset is
//!   unmanaged: it is not diffed and keeps its remote value

use crate::descriptor::{FieldKind, FieldSpec, Presence, ResourceDescriptor};
use crate::value::{Attributes, FieldValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single field that differs between two configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<FieldValue>,
    pub new: Option<FieldValue>,
    pub force_new: bool,
}

impl std::fmt::Display for FieldChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: &Option<FieldValue>| match v {
            Some(v) => v.to_string(),
            None => "(unset)".to_string(),
        };
        write!(f, "{}: {} -> {}", self.field, show(&self.old), show(&self.new))?;
        if self.force_new {
            write!(f, " (forces replacement)")?;
        }
        Ok(())
    }
}

impl FieldSpec {
    /// Normalized equality of two optional values of this field
    pub fn values_equal(&self, a: Option<&FieldValue>, b: Option<&FieldValue>) -> bool {
        let a = self.effective(a);
        let b = self.effective(b);

        match (a, b) {
            (None, None) => true,
            (Some(FieldValue::String(a)), Some(FieldValue::String(b))) => match &self.enum_rule {
                Some(rule) => rule.values_equal(a, b),
                None => a == b,
            },
            (Some(FieldValue::List(a)), Some(FieldValue::List(b))) => {
                if self.kind == FieldKind::UnorderedList {
                    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
                } else {
                    a == b
                }
            }
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Optional list without a default that `desired` leaves unset or empty
    pub fn leaves_unmanaged(&self, desired: Option<&FieldValue>) -> bool {
        self.kind.is_list()
            && self.presence == Presence::Optional
            && self.default.is_none()
            && self.effective(desired).is_none()
    }

    fn effective<'a>(&'a self, value: Option<&'a FieldValue>) -> Option<&'a FieldValue> {
        let value = value.or(self.default.as_ref());
        if self.presence == Presence::Required {
            return value;
        }
        value.filter(|v| match v {
            FieldValue::String(s) => !s.is_empty(),
            FieldValue::List(items) => !items.is_empty(),
            FieldValue::Bool(_) => true,
        })
    }
}

impl ResourceDescriptor {
    /// Fields whose normalized values differ, computed fields ignored
    pub fn diff(&self, old: &Attributes, new: &Attributes) -> Vec<FieldChange> {
        self.fields()
            .iter()
            .filter(|spec| !spec.is_computed())
            .filter(|spec| !spec.leaves_unmanaged(new.get(spec.name)))
            .filter(|spec| !spec.values_equal(old.get(spec.name), new.get(spec.name)))
            .map(|spec| FieldChange {
                field: spec.name.to_string(),
                old: old.get(spec.name).cloned(),
                new: new.get(spec.name).cloned(),
                force_new: spec.force_new,
            })
            .collect()
    }

    /// Names of ForceNew fields that differ between `old` and `new`
    pub fn replacement_fields(&self, old: &Attributes, new: &Attributes) -> Vec<String> {
        self.diff(old, new)
            .into_iter()
            .filter(|c| c.force_new)
            .map(|c| c.field)
            .collect()
    }

    /// True iff any ForceNew field differs
    pub fn requires_replacement(&self, old: &Attributes, new: &Attributes) -> bool {
        !self.replacement_fields(old, new).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::attributes;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "security list",
            vec![
                FieldSpec::required("name", FieldKind::String).force_new(),
                FieldSpec::optional("description", FieldKind::String),
                FieldSpec::optional("policy", FieldKind::String)
                    .with_default("deny")
                    .one_of(&["deny", "permit", "reject"]),
                FieldSpec::optional("dst_ports", FieldKind::OrderedList),
                FieldSpec::optional("tags", FieldKind::UnorderedList).force_new(),
                FieldSpec::computed("fqdn", FieldKind::String),
            ],
        )
    }

    #[test]
    fn test_enum_case_is_folded() {
        let d = descriptor();
        let old = attributes([("name", "web"), ("policy", "DENY")]);
        let new = attributes([("name", "web"), ("policy", "deny")]);
        assert!(d.diff(&old, &new).is_empty());
    }

    #[test]
    fn test_absent_equals_default() {
        let d = descriptor();
        let old = attributes([("name", "web"), ("policy", "deny")]);
        let new = attributes([("name", "web")]);
        assert!(d.diff(&old, &new).is_empty());
    }

    #[test]
    fn test_empty_string_equals_absent_optional() {
        let d = descriptor();
        let old = attributes([("name", "web"), ("description", "")]);
        let new = attributes([("name", "web")]);
        assert!(d.diff(&old, &new).is_empty());
    }

    #[test]
    fn test_unordered_list_is_set_compared() {
        let d = descriptor();
        let old = attributes([
            ("name", FieldValue::from("p")),
            ("tags", FieldValue::from(&["a", "b"][..])),
        ]);
        let new = attributes([
            ("name", FieldValue::from("p")),
            ("tags", FieldValue::from(&["b", "a"][..])),
        ]);
        assert!(!d.requires_replacement(&old, &new));
    }

    #[test]
    fn test_ordered_list_is_sequence_compared() {
        let d = descriptor();
        let old = attributes([
            ("name", FieldValue::from("p")),
            ("dst_ports", FieldValue::from(&["80", "443"][..])),
        ]);
        let new = attributes([
            ("name", FieldValue::from("p")),
            ("dst_ports", FieldValue::from(&["443", "80"][..])),
        ]);
        let changes = d.diff(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "dst_ports");
        assert!(!changes[0].force_new);
    }

    #[test]
    fn test_unset_optional_list_is_unmanaged() {
        let d = descriptor();
        let old = attributes([
            ("name", FieldValue::from("p")),
            ("dst_ports", FieldValue::from(&["443"][..])),
            ("tags", FieldValue::from(&["a"][..])),
        ]);
        let new = attributes([("name", FieldValue::from("p"))]);
        assert!(d.diff(&old, &new).is_empty());
        assert!(!d.requires_replacement(&old, &new));

        let emptied = attributes([
            ("name", FieldValue::from("p")),
            ("dst_ports", FieldValue::List(Vec::new())),
        ]);
        assert!(d.diff(&old, &emptied).is_empty());

        // A value on the new side is still compared
        let changed = attributes([
            ("name", FieldValue::from("p")),
            ("dst_ports", FieldValue::from(&["80"][..])),
        ]);
        let changes = d.diff(&old, &changed);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "dst_ports");
    }

    #[test]
    fn test_requires_replacement_only_for_force_new() {
        let d = descriptor();
        let base = attributes([("name", "web"), ("policy", "deny")]);

        let mutable_change = attributes([("name", "web"), ("policy", "permit")]);
        assert!(!d.requires_replacement(&base, &mutable_change));

        let renamed = attributes([("name", "web2"), ("policy", "deny")]);
        assert!(d.requires_replacement(&base, &renamed));
        assert_eq!(d.replacement_fields(&base, &renamed), vec!["name".to_string()]);
    }

    #[test]
    fn test_computed_fields_are_ignored() {
        let d = descriptor();
        let old = attributes([("name", "web"), ("fqdn", "/Compute-acme/jo/web")]);
        let new = attributes([("name", "web")]);
        assert!(d.diff(&old, &new).is_empty());
    }

    #[test]
    fn test_change_display() {
        let change = FieldChange {
            field: "tags".to_string(),
            old: None,
            new: Some(FieldValue::from(&["a"][..])),
            force_new: true,
        };
        assert_eq!(change.to_string(), "tags: (unset) -> [a] (forces replacement)");
    }
}
