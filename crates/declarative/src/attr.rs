//! Tri-state attribute values.
//!
//! A declared attribute is either not yet computed ([`Attr::Unknown`]),
//! explicitly absent ([`Attr::Null`]), or a concrete value ([`Attr::Known`]).
//! Remote objects have no such distinction: they carry zero values instead.
//! The helpers here are the only place the two worlds meet.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A declared or tracked attribute value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Attr<T> {
    /// Not yet computed (e.g. an identifier before the remote assigns one).
    Unknown,
    /// Explicitly absent.
    #[default]
    Null,
    /// A concrete value.
    Known(T),
}

impl<T> Attr<T> {
    /// Check if this is a concrete value
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Check if this is explicitly absent
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this is not yet computed
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Borrow the concrete value, if any
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown | Self::Null => None,
        }
    }

    /// Convert into an `Option`, collapsing `Unknown` and `Null`
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown | Self::Null => None,
        }
    }

    pub fn as_ref(&self) -> Attr<&T> {
        match self {
            Self::Unknown => Attr::Unknown,
            Self::Null => Attr::Null,
            Self::Known(value) => Attr::Known(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Self::Unknown => Attr::Unknown,
            Self::Null => Attr::Null,
            Self::Known(value) => Attr::Known(f(value)),
        }
    }

    /// Keep a concrete value, otherwise fall back to `other`.
    ///
    /// Used to carry computed values forward from tracked state.
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Known(_) => self,
            Self::Unknown | Self::Null => other,
        }
    }
}

impl<T: Clone> Attr<T> {
    /// Concrete value or the supplied fallback
    pub fn value_or(&self, fallback: T) -> T {
        self.known().cloned().unwrap_or(fallback)
    }
}

impl<T: Clone + Default> Attr<T> {
    /// Concrete value or the zero value of `T`, as sent on the wire
    pub fn value_or_zero(&self) -> T {
        self.known().cloned().unwrap_or_default()
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }
}

impl Attr<String> {
    /// Map a wire string to an attribute: the empty string is "unset".
    pub fn from_wire(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Null
        } else {
            Self::Known(value)
        }
    }

    /// Map an attribute back to its wire string.
    ///
    /// Lossy but stable: `from_wire(to_wire(a)) == a` for every `a` that came
    /// from `from_wire`.
    pub fn to_wire(&self) -> String {
        self.known().cloned().unwrap_or_default()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.known().map(String::as_str)
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => value.serialize(serializer),
            Self::Unknown | Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}
