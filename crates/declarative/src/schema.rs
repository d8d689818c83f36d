//! Schema declarations.
//!
//! Each resource kind publishes one [`Schema`]: attribute names, types,
//! required/optional/computed markers, sensitivity, defaults and
//! exactly-one-of groups. The orchestrator validates declarations against it
//! before invoking the engine and fills in defaults. The engine enforces the
//! variant constraints again on its own, so bypassing validation never
//! reaches the remote API.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Placeholder shown instead of sensitive values.
pub const REDACTED: &str = "(sensitive)";

/// Attribute value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    String,
    Int,
    Bool,
    /// Map of string to string.
    StringMap,
    /// A single nested block.
    Block,
    /// An ordered list of nested blocks.
    BlockList,
}

impl AttrType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
            Self::StringMap => value
                .as_object()
                .is_some_and(|map| map.values().all(Value::is_string)),
            Self::Block => value.is_object(),
            Self::BlockList => value.is_array(),
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int => "integer",
            Self::Bool => "boolean",
            Self::StringMap => "map of strings",
            Self::Block => "block",
            Self::BlockList => "list of blocks",
        };
        write!(f, "{name}")
    }
}

/// Who supplies an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Required,
    Optional,
    /// Set by the remote only.
    Computed,
    /// Declared or, when absent, defaulted/normalized by the remote.
    OptionalComputed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: AttrType,
    pub presence: Presence,
    #[serde(skip_serializing_if = "is_false")]
    pub sensitive: bool,
    /// Never echoed back by the remote.
    #[serde(skip_serializing_if = "is_false")]
    pub write_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "no_values")]
    pub one_of: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "no_text")]
    pub description: &'static str,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn no_values(values: &&'static [&'static str]) -> bool {
    values.is_empty()
}

fn no_text(text: &&'static str) -> bool {
    text.is_empty()
}

impl Attribute {
    pub fn new(name: &'static str, ty: AttrType, presence: Presence) -> Self {
        Self {
            name,
            ty,
            presence,
            sensitive: false,
            write_only: false,
            default: None,
            one_of: &[],
            nested: None,
            description: "",
        }
    }

    pub fn required(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::Required)
    }

    pub fn optional(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::Optional)
    }

    pub fn computed(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::Computed)
    }

    pub fn optional_computed(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::OptionalComputed)
    }

    /// A single nested block.
    pub fn block(name: &'static str, presence: Presence, schema: Schema) -> Self {
        Self {
            nested: Some(Box::new(schema)),
            ..Self::new(name, AttrType::Block, presence)
        }
    }

    /// An ordered list of nested blocks.
    pub fn block_list(name: &'static str, presence: Presence, schema: Schema) -> Self {
        Self {
            nested: Some(Box::new(schema)),
            ..Self::new(name, AttrType::BlockList, presence)
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Sensitive and never returned by the remote.
    pub fn write_only(mut self) -> Self {
        self.sensitive = true;
        self.write_only = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = values;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// A block of attributes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    #[serde(skip_serializing_if = "no_text")]
    pub description: &'static str,
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exactly_one_of: Vec<&'static [&'static str]>,
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn is_set(map: &Map<String, Value>, name: &str) -> bool {
    map.get(name).is_some_and(|v| !v.is_null())
}

impl Schema {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self {
            description: "",
            attributes,
            exactly_one_of: Vec::new(),
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Require exactly one attribute of `group` to be set.
    pub fn exactly_one_of(mut self, group: &'static [&'static str]) -> Self {
        self.exactly_one_of.push(group);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Mask every set sensitive attribute, recursively, for display and logs.
    pub fn redact(&self, value: &mut Value) {
        let Some(map) = value.as_object_mut() else {
            return;
        };

        for attr in &self.attributes {
            let Some(field) = map.get_mut(attr.name) else {
                continue;
            };
            if attr.sensitive {
                if !field.is_null() {
                    *field = Value::String(REDACTED.to_string());
                }
                continue;
            }
            let Some(nested) = &attr.nested else {
                continue;
            };
            match field {
                Value::Array(items) => {
                    for item in items {
                        nested.redact(item);
                    }
                }
                item => nested.redact(item),
            }
        }
    }

    /// Validate a declaration, collecting every violation.
    pub fn validate(&self, declaration: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.validate_at("", declaration, &mut violations);
        violations
    }

    fn validate_at(&self, path: &str, value: &Value, out: &mut Vec<Violation>) {
        let Some(map) = value.as_object() else {
            out.push(Violation {
                path: path.to_string(),
                message: "expected a block".to_string(),
            });
            return;
        };

        for (key, value) in map {
            let here = join(path, key);
            let Some(attr) = self.attribute(key) else {
                out.push(Violation {
                    path: here,
                    message: "unknown attribute".to_string(),
                });
                continue;
            };
            if value.is_null() {
                continue;
            }
            if attr.presence == Presence::Computed {
                out.push(Violation {
                    path: here,
                    message: "computed attribute cannot be set".to_string(),
                });
                continue;
            }
            attr.validate_value(&here, value, out);
        }

        for attr in &self.attributes {
            if attr.presence == Presence::Required && !is_set(map, attr.name) {
                out.push(Violation {
                    path: join(path, attr.name),
                    message: "required attribute is missing".to_string(),
                });
            }
        }

        for group in &self.exactly_one_of {
            let set = group.iter().filter(|name| is_set(map, name)).count();
            if set != 1 {
                let found = if set == 0 { "none" } else { "several" };
                out.push(Violation {
                    path: path.to_string(),
                    message: format!(
                        "exactly one of {} must be set, found {found}",
                        group.join(", ")
                    ),
                });
            }
        }
    }

    /// Treat empty optional strings as unset, recursively.
    ///
    /// The remote reports an unset optional string as `""`, which reads back
    /// as null. Declarations get the same treatment so the two compare equal.
    pub fn clear_empty(&self, declaration: &mut Value) {
        let Some(map) = declaration.as_object_mut() else {
            return;
        };

        for attr in &self.attributes {
            let Some(field) = map.get_mut(attr.name) else {
                continue;
            };
            let optional = matches!(attr.presence, Presence::Optional | Presence::OptionalComputed);
            if optional && attr.ty == AttrType::String && field.as_str() == Some("") {
                *field = Value::Null;
                continue;
            }

            let Some(nested) = &attr.nested else {
                continue;
            };
            match field {
                Value::Array(items) => {
                    for item in items {
                        nested.clear_empty(item);
                    }
                }
                item => nested.clear_empty(item),
            }
        }
    }

    /// Fill in declared defaults for absent attributes, recursively.
    pub fn apply_defaults(&self, declaration: &mut Value) {
        let Some(map) = declaration.as_object_mut() else {
            return;
        };

        for attr in &self.attributes {
            if let Some(default) = &attr.default {
                if !is_set(map, attr.name) {
                    map.insert(attr.name.to_string(), default.clone());
                }
            }

            let Some(nested) = &attr.nested else {
                continue;
            };
            match map.get_mut(attr.name) {
                Some(Value::Array(items)) => {
                    for item in items {
                        nested.apply_defaults(item);
                    }
                }
                Some(item @ Value::Object(_)) => nested.apply_defaults(item),
                _ => {}
            }
        }
    }
}

impl Attribute {
    fn validate_value(&self, path: &str, value: &Value, out: &mut Vec<Violation>) {
        if !self.ty.accepts(value) {
            out.push(Violation {
                path: path.to_string(),
                message: format!("expected {}", self.ty),
            });
            return;
        }

        if !self.one_of.is_empty() {
            if let Some(s) = value.as_str() {
                if !self.one_of.contains(&s) {
                    out.push(Violation {
                        path: path.to_string(),
                        message: format!(
                            "{s:?} is not one of {}",
                            self.one_of.join(", ")
                        ),
                    });
                }
            }
        }

        let Some(nested) = &self.nested else {
            return;
        };
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    nested.validate_at(&format!("{path}[{index}]"), item, out);
                }
            }
            item => nested.validate_at(path, item, out),
        }
    }
}
