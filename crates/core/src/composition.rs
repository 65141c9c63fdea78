//! Bit-flag classifications for metadata entities and image state.
//!
//! Each classification is a fixed-width newtype over `u32` with single-bit
//! flags and named combinations. Membership (`contains`), union (`|`),
//! intersection (`&`) and overlap (`intersects`) come from `bitflags`;
//! the helpers here add name lookup and the "exported" decomposition used
//! when rendering a value back to text.

use bitflags::Flags;
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Structural classification of a tag. A tag may be an address (it
    /// can appear as a path segment) and a group at the same time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TagFlags: u32 {
        const ADDRESS = 1 << 0;
        const VIRTUAL = 1 << 1;
        const GROUP = 1 << 2;
        const SEQUENCE = 1 << 3;
        const FORCE = 1 << 4;

        const VIRTUAL_ADDRESS = Self::ADDRESS.bits() | Self::VIRTUAL.bits();
        const SEQUENCE_GROUP = Self::GROUP.bits() | Self::SEQUENCE.bits();
        const FORCE_GROUP = Self::GROUP.bits() | Self::FORCE.bits();
        const FORCE_SEQUENCE_GROUP = Self::GROUP.bits() | Self::SEQUENCE.bits() | Self::FORCE.bits();
    }
}

bitflags::bitflags! {
    /// What a topic or author is. Topics carry bits from `TOPIC`, authors
    /// from `AUTHOR`; `TAG` marks annotations that apply to tags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MetaTarget: u32 {
        const TAG = 1 << 0;
        const ARTIST = 1 << 1;
        const STUDIO = 1 << 2;
        const PUBLISH = 1 << 3;
        const COPYRIGHT = 1 << 4;
        const IP = 1 << 5;
        const CHARACTER = 1 << 6;

        const AUTHOR = Self::ARTIST.bits() | Self::STUDIO.bits() | Self::PUBLISH.bits();
        const TOPIC = Self::COPYRIGHT.bits() | Self::IP.bits() | Self::CHARACTER.bits();
    }
}

bitflags::bitflags! {
    /// Which kinds of metadata an image is still waiting on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Tagme: u32 {
        const TAG = 1 << 0;
        const AUTHOR = 1 << 1;
        const TOPIC = 1 << 2;
        const SOURCE = 1 << 3;
    }
}

impl TagFlags {
    pub fn is_group(&self) -> bool {
        self.contains(TagFlags::GROUP)
    }

    /// Members of a sequence group are ordered.
    pub fn is_sequence_group(&self) -> bool {
        self.contains(TagFlags::SEQUENCE_GROUP)
    }

    /// Address tags may appear as non-final segments of a dotted path.
    pub fn is_address(&self) -> bool {
        self.contains(TagFlags::ADDRESS)
    }
}

impl MetaTarget {
    pub fn is_author(&self) -> bool {
        self.intersects(MetaTarget::AUTHOR)
    }

    pub fn is_topic(&self) -> bool {
        self.intersects(MetaTarget::TOPIC)
    }
}

/// Union of every value in `values`; empty input yields the empty set.
pub fn union_all<F: Flags + Copy>(values: impl IntoIterator<Item = F>) -> F {
    values.into_iter().fold(F::empty(), |acc, v| acc.union(v))
}

/// Look up a named flag or combination. Exact names win; otherwise the
/// first case-insensitive match in declaration order.
pub fn parse_flag<F: Flags + Copy>(name: &str) -> Option<F> {
    if let Some(flag) = F::from_name(name) {
        return Some(flag);
    }
    F::FLAGS
        .iter()
        .find(|f| f.name().eq_ignore_ascii_case(name))
        .map(|f| *f.value())
}

/// Names of the single-bit flags declared for `F`, in declaration order.
pub fn base_names<F: Flags<Bits = u32>>() -> Vec<&'static str> {
    F::FLAGS
        .iter()
        .filter(|f| f.value().bits().count_ones() == 1)
        .map(|f| f.name())
        .collect()
}

/// Decompose `value` into named parts: named combinations first, widest
/// first (each taken only if fully covered, consuming its bits), then the
/// remaining single bits.
pub fn exported_names<F: Flags<Bits = u32>>(value: F) -> Vec<&'static str> {
    let mut remaining = value.bits();
    let mut names = Vec::new();
    let mut combined: Vec<_> = F::FLAGS
        .iter()
        .filter(|f| f.value().bits().count_ones() > 1)
        .collect();
    combined.sort_by_key(|f| std::cmp::Reverse(f.value().bits().count_ones()));
    let single = F::FLAGS
        .iter()
        .filter(|f| f.value().bits().count_ones() == 1);
    for flag in combined.into_iter().chain(single) {
        let bits = flag.value().bits();
        if bits & !remaining == 0 {
            remaining &= !bits;
            names.push(flag.name());
        }
    }
    names
}
