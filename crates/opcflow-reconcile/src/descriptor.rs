//! Static per-type resource metadata
//!
//! A [`ResourceDescriptor`] classifies every field of a resource type and is
//! the only thing the engine knows about that type. Validation of desired
//! configuration, request construction and replacement detection are all
//! driven from it.

use crate::error::ValidationError;
use crate::value::{Attributes, FieldValue};

/// How a field is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present in the desired configuration
    Required,
    /// May be omitted; a default applies if the field has one
    Optional,
    /// Only ever reported by the remote system
    Computed,
}

/// Element type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    /// Sequence semantics; source order is preserved
    OrderedList,
    /// Set semantics; order is irrelevant for comparison
    UnorderedList,
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Bool => "a boolean",
            FieldKind::OrderedList | FieldKind::UnorderedList => "a list",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldKind::OrderedList | FieldKind::UnorderedList)
    }

    fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldKind::String, FieldValue::String(_))
                | (FieldKind::Bool, FieldValue::Bool(_))
                | (FieldKind::OrderedList, FieldValue::List(_))
                | (FieldKind::UnorderedList, FieldValue::List(_))
        )
    }
}

/// Allowed values of an enum-valued string field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumRule {
    pub allowed: &'static [&'static str],
    pub case_insensitive: bool,
}

impl EnumRule {
    /// The allowed spelling matching `value`, if any
    pub fn canonical(&self, value: &str) -> Option<&'static str> {
        self.allowed.iter().copied().find(|allowed| {
            if self.case_insensitive {
                allowed.eq_ignore_ascii_case(value)
            } else {
                *allowed == value
            }
        })
    }

    pub fn values_equal(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }
}

/// Metadata for a single field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub presence: Presence,
    pub kind: FieldKind,
    /// A change to this field requires delete + create
    pub force_new: bool,
    pub default: Option<FieldValue>,
    pub enum_rule: Option<EnumRule>,
}

impl FieldSpec {
    fn new(name: &'static str, presence: Presence, kind: FieldKind) -> Self {
        Self {
            name,
            presence,
            kind,
            force_new: false,
            default: None,
            enum_rule: None,
        }
    }

    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, Presence::Required, kind)
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, Presence::Optional, kind)
    }

    pub fn computed(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, Presence::Computed, kind)
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict a string field to `allowed`, compared case-insensitively
    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.enum_rule = Some(EnumRule {
            allowed,
            case_insensitive: true,
        });
        self
    }

    pub fn is_computed(&self) -> bool {
        self.presence == Presence::Computed
    }

    /// Whether the field may be sent in an update request
    pub fn is_mutable(&self) -> bool {
        !self.force_new && !self.is_computed()
    }
}

/// Static metadata for a resource type
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    kind: &'static str,
    identity_field: &'static str,
    fields: Vec<FieldSpec>,
}

impl ResourceDescriptor {
    /// Create a descriptor whose identity is the `name` field
    pub fn new(kind: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self {
            kind,
            identity_field: "name",
            fields,
        }
    }

    /// Type name used in messages and state keys (e.g. "security_list")
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn identity_field(&self) -> &'static str {
        self.identity_field
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True if at least one non-identity field can be changed in place
    pub fn supports_update(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.name != self.identity_field && f.is_mutable())
    }

    /// Non-empty identity carried by `attrs`
    pub fn identity_of<'a>(&self, attrs: &'a Attributes) -> Option<&'a str> {
        attrs
            .get(self.identity_field)
            .and_then(FieldValue::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Check desired configuration against the descriptor.
    ///
    /// Returns the configuration with defaults applied, enum values in their
    /// canonical spelling, and empty optional lists removed.
    pub fn validate(&self, desired: &Attributes) -> Result<Attributes, ValidationError> {
        for key in desired.keys() {
            match self.field(key) {
                None => return Err(ValidationError::UnknownField(key.clone())),
                Some(spec) if spec.is_computed() => {
                    return Err(ValidationError::ComputedField(key.clone()));
                }
                Some(_) => {}
            }
        }

        let mut validated = Attributes::new();
        for spec in self.fields.iter().filter(|f| !f.is_computed()) {
            let value = match desired.get(spec.name) {
                Some(value) => value,
                None => {
                    if spec.name == self.identity_field {
                        return Err(ValidationError::EmptyIdentity);
                    }
                    match (&spec.presence, &spec.default) {
                        (Presence::Required, _) => {
                            return Err(ValidationError::MissingField(spec.name.to_string()));
                        }
                        (_, Some(default)) => {
                            validated.insert(spec.name.to_string(), default.clone());
                        }
                        (_, None) => {}
                    }
                    continue;
                }
            };

            if !spec.kind.accepts(value) {
                return Err(ValidationError::TypeMismatch {
                    field: spec.name.to_string(),
                    expected: spec.kind.expected(),
                    found: value.type_name(),
                });
            }

            let value = match value {
                FieldValue::String(s) if spec.name == self.identity_field && s.is_empty() => {
                    return Err(ValidationError::EmptyIdentity);
                }
                FieldValue::String(s) => match &spec.enum_rule {
                    Some(rule) => {
                        let canonical =
                            rule.canonical(s).ok_or_else(|| ValidationError::NotAllowed {
                                field: spec.name.to_string(),
                                value: s.clone(),
                                allowed: rule.allowed.join(", "),
                            })?;
                        FieldValue::String(canonical.to_string())
                    }
                    None => value.clone(),
                },
                // Empty is treated as omitted for optional lists
                FieldValue::List(items)
                    if items.is_empty() && spec.presence == Presence::Optional =>
                {
                    continue;
                }
                FieldValue::List(items) if spec.kind == FieldKind::UnorderedList => {
                    let mut seen = Vec::with_capacity(items.len());
                    for item in items {
                        if !seen.contains(item) {
                            seen.push(item.clone());
                        }
                    }
                    FieldValue::List(seen)
                }
                _ => value.clone(),
            };

            validated.insert(spec.name.to_string(), value);
        }

        Ok(validated)
    }

    /// Fields sent on create: everything the caller may supply
    pub fn create_payload(&self, validated: &Attributes) -> Attributes {
        self.select(validated, |spec| !spec.is_computed())
    }

    /// Fields sent on update: mutable fields only, identity excluded
    pub fn update_payload(&self, validated: &Attributes) -> Attributes {
        self.select(validated, |spec| {
            spec.name != self.identity_field && spec.is_mutable()
        })
    }

    /// Keep only fields the descriptor knows about, dropping empty lists
    pub fn normalize_observed(&self, raw: Attributes) -> Attributes {
        raw.into_iter()
            .filter(|(key, value)| match self.field(key) {
                Some(spec) if spec.kind.is_list() => {
                    value.as_list().is_none_or(|items| !items.is_empty())
                }
                Some(_) => true,
                None => {
                    tracing::debug!("Dropping unknown {} field from response: {}", self.kind, key);
                    false
                }
            })
            .collect()
    }

    fn select(&self, attrs: &Attributes, keep: impl Fn(&FieldSpec) -> bool) -> Attributes {
        attrs
            .iter()
            .filter(|(key, _)| self.field(key).is_some_and(&keep))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
