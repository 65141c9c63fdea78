//! Static alias tables: canonical keys and the names a user may type.

/// One typed name. `source` marks names that only match when the item is
/// written with the `^` source qualifier (`^id` vs `id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    pub name: &'static str,
    pub source: bool,
}

impl Alias {
    pub const fn plain(name: &'static str) -> Self {
        Alias {
            name,
            source: false,
        }
    }

    pub const fn source(name: &'static str) -> Self {
        Alias { name, source: true }
    }

    pub fn matches(&self, name: &str, source: bool) -> bool {
        self.source == source && self.name.eq_ignore_ascii_case(name)
    }

    /// The name as typed in a query, with its qualifier.
    pub fn display(&self) -> String {
        if self.source {
            format!("^{}", self.name)
        } else {
            self.name.to_string()
        }
    }
}

/// A canonical key with its aliases. The first alias is the preferred
/// spelling when rendering.
#[derive(Debug, Clone, Copy)]
pub struct FieldAlias<K: 'static> {
    pub key: K,
    pub aliases: &'static [Alias],
}

impl<K: Copy> FieldAlias<K> {
    pub fn preferred(&self) -> Alias {
        self.aliases[0]
    }
}

/// Resolve a typed name against a table.
pub fn find<K: Copy>(table: &[FieldAlias<K>], name: &str, source: bool) -> Option<K> {
    table
        .iter()
        .find(|entry| entry.aliases.iter().any(|a| a.matches(name, source)))
        .map(|entry| entry.key)
}

/// Whether any entry knows `name` under either qualifier.
pub fn knows<K: Copy>(table: &[FieldAlias<K>], name: &str) -> bool {
    table
        .iter()
        .any(|entry| entry.aliases.iter().any(|a| a.name.eq_ignore_ascii_case(name)))
}

/// Preferred spelling for `key`.
pub fn preferred<K: Copy + PartialEq>(table: &[FieldAlias<K>], key: K) -> Option<Alias> {
    table
        .iter()
        .find(|entry| entry.key == key)
        .map(|entry| entry.preferred())
}

/// Every alias in the table, qualifier included, in declaration order.
pub fn all_names<K: Copy>(table: &[FieldAlias<K>]) -> Vec<String> {
    table
        .iter()
        .flat_map(|entry| entry.aliases.iter().map(Alias::display))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Key {
        Id,
        SourceId,
        Score,
    }

    const TABLE: &[FieldAlias<Key>] = &[
        FieldAlias {
            key: Key::Id,
            aliases: &[Alias::plain("id")],
        },
        FieldAlias {
            key: Key::SourceId,
            aliases: &[Alias::source("id"), Alias::plain("source-id")],
        },
        FieldAlias {
            key: Key::Score,
            aliases: &[Alias::plain("score"), Alias::plain("s")],
        },
    ];

    #[test]
    fn qualifier_selects_entry() {
        assert_eq!(find(TABLE, "id", false), Some(Key::Id));
        assert_eq!(find(TABLE, "id", true), Some(Key::SourceId));
        assert_eq!(find(TABLE, "source-id", false), Some(Key::SourceId));
        assert_eq!(find(TABLE, "source-id", true), None);
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(find(TABLE, "SCORE", false), Some(Key::Score));
        assert!(knows(TABLE, "S"));
        assert!(!knows(TABLE, "size"));
    }

    #[test]
    fn preferred_spelling_keeps_qualifier() {
        assert_eq!(preferred(TABLE, Key::SourceId).map(|a| a.display()).as_deref(), Some("^id"));
        assert_eq!(all_names(TABLE), vec!["id", "^id", "source-id", "score", "s"]);
    }
}
