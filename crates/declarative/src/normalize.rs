//! Field normalization rules shared by every resource kind.

use crate::error::{Error, Result};

/// A closed set of enumerated names with two casings.
///
/// Declarations and tracked state use the upper-case display form; the
/// remote API expects lower case. Values outside the whitelist are rejected
/// before anything is sent.
#[derive(Debug, Clone, Copy)]
pub struct Whitelist {
    pub field: &'static str,
    pub values: &'static [&'static str],
}

impl Whitelist {
    pub const fn new(field: &'static str, values: &'static [&'static str]) -> Self {
        Self { field, values }
    }

    /// Declared value to wire casing.
    pub fn to_wire(&self, kind: &'static str, value: &str) -> Result<String> {
        if self.values.contains(&value) {
            Ok(value.to_lowercase())
        } else {
            Err(self.reject(kind, value))
        }
    }

    /// Wire value to display casing.
    pub fn from_wire(&self, kind: &'static str, value: &str) -> Result<String> {
        let display = value.to_uppercase();
        if self.values.contains(&display.as_str()) {
            Ok(display)
        } else {
            Err(self.reject(kind, value))
        }
    }

    fn reject(&self, kind: &'static str, value: &str) -> Error {
        Error::UnsupportedAdapter {
            kind,
            field: self.field.to_string(),
            value: value.to_string(),
            expected: self.values.join(", "),
        }
    }
}

/// Render an indexed child path, e.g. `steps[2].action`.
pub fn child_path(list: &str, index: usize, field: &str) -> String {
    if field.is_empty() {
        format!("{list}[{index}]")
    } else {
        format!("{list}[{index}].{field}")
    }
}
