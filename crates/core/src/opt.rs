//! Tri-state optional values for partial updates.
//!
//! `Option<T>` cannot tell "the caller did not mention this field" apart from
//! "the caller cleared this field". Patch forms need both, so [`Opt`] has
//! three states. With serde, a missing key deserializes to [`Opt::Unset`]
//! (pair the field with `#[serde(default)]`), an explicit `null` to
//! [`Opt::Null`], anything else to [`Opt::Value`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Opt<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Opt<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Opt::Unset)
    }

    pub fn is_present(&self) -> bool {
        !self.is_unset()
    }

    pub fn as_ref(&self) -> Opt<&T> {
        match self {
            Opt::Unset => Opt::Unset,
            Opt::Null => Opt::Null,
            Opt::Value(v) => Opt::Value(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Opt<U> {
        match self {
            Opt::Unset => Opt::Unset,
            Opt::Null => Opt::Null,
            Opt::Value(v) => Opt::Value(f(v)),
        }
    }

    /// Collapse to a plain `Option`, treating `Unset` as `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Opt::Value(v) => Some(v),
            Opt::Unset | Opt::Null => None,
        }
    }

    /// Apply this patch onto an optional slot: `Unset` keeps the slot,
    /// `Null` clears it, `Value` replaces it.
    pub fn merge_into(self, slot: &mut Option<T>) {
        match self {
            Opt::Unset => {}
            Opt::Null => *slot = None,
            Opt::Value(v) => *slot = Some(v),
        }
    }

    /// Apply this patch onto a required slot. `Null` cannot clear a required
    /// value and is ignored, same as `Unset`.
    pub fn assign_to(self, slot: &mut T) {
        if let Opt::Value(v) = self {
            *slot = v;
        }
    }
}

impl<T> From<Option<T>> for Opt<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Opt::Value(v),
            None => Opt::Null,
        }
    }
}

impl<T: Serialize> Serialize for Opt<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Opt::Value(v) => serializer.serialize_some(v),
            Opt::Unset | Opt::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Opt<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Opt::from)
    }
}
