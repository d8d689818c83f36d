//! Variant action codec.
//!
//! Remote APIs describe a closed union as one flat record: a discriminant
//! string plus the superset of every case's fields, unused fields left at
//! their zero value. Inside the engine the union is a real enum. This module
//! is the only boundary between the two shapes.

use crate::error::{Error, Result};

/// A closed family of mutually exclusive variants with a flat wire shape.
///
/// Implementors only describe the per-case field copies; the checks that
/// every family needs live in [`encode`], [`decode`] and [`exactly_one`].
pub trait VariantCodec: Sized {
    /// The flattened wire payload.
    type Flat;

    /// Every discriminant this family understands.
    const TAGS: &'static [&'static str];

    /// The discriminant for this case.
    fn tag(&self) -> &'static str;

    /// Copy this case's fields into a zeroed flat payload.
    fn to_flat(&self) -> Self::Flat;

    /// Rebuild the case named by the payload's tag, ignoring fields that
    /// belong to other cases. `None` if the tag is not one of [`Self::TAGS`].
    fn from_flat(flat: &Self::Flat) -> Option<Self>;

    /// Read the discriminant from a flat payload.
    fn flat_tag(flat: &Self::Flat) -> &str;
}

/// Encode a variant into its flat wire payload.
pub fn encode<V: VariantCodec>(variant: &V) -> V::Flat {
    variant.to_flat()
}

/// Decode a flat payload, surfacing unknown discriminants.
///
/// A silently dropped case would desynchronize tracked state, so an
/// unrecognized tag is always an error.
pub fn decode<V: VariantCodec>(kind: &'static str, field: &str, flat: &V::Flat) -> Result<V> {
    V::from_flat(flat).ok_or_else(|| Error::UnknownVariantTag {
        kind,
        field: field.to_string(),
        tag: V::flat_tag(flat).to_string(),
        expected: V::TAGS.join(", "),
    })
}

/// Collapse a set of optional declaration blocks into exactly one case.
///
/// `slots` pairs each block's declared name with its value, if set. Fails
/// with `InvalidVariant` when none or several are populated.
pub fn exactly_one<V>(
    kind: &'static str,
    field: &str,
    slots: impl IntoIterator<Item = (&'static str, Option<V>)>,
) -> Result<V> {
    let mut names = Vec::new();
    let mut populated = Vec::new();

    for (name, slot) in slots {
        names.push(name);
        if let Some(value) = slot {
            populated.push((name, value));
        }
    }

    if populated.len() == 1 {
        if let Some((_, value)) = populated.pop() {
            return Ok(value);
        }
    }

    let message = if populated.is_empty() {
        format!("exactly one of {} must be set, none is", names.join(", "))
    } else {
        let set: Vec<&str> = populated.iter().map(|(name, _)| *name).collect();
        format!(
            "exactly one of {} must be set, found {}",
            names.join(", "),
            set.join(" and ")
        )
    };

    Err(Error::invalid_variant(kind, field, message))
}
