//! Read-only table of embedded files.
//!
//! Generated code declares one `static` [`EmbeddedFiles`] per variable,
//! built from byte literals at compile time. The table is never mutated
//! afterwards.

/// An immutable name-to-bytes table backed by a static slice.
///
/// Names are looked up linearly and the first match wins. The generator
/// inserts new entries at the top of a block, so the most recently spliced
/// entry shadows older ones with the same name.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedFiles {
    entries: &'static [(&'static str, &'static [u8])],
}

impl EmbeddedFiles {
    /// Creates a table over the given entries
    pub const fn new(entries: &'static [(&'static str, &'static [u8])]) -> Self {
        Self { entries }
    }

    /// Returns the contents of `name`, if embedded
    pub fn get(&self, name: &str) -> Option<&'static [u8]> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, data)| *data)
    }

    /// Returns true if `name` is embedded
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of entries, shadowed ones included
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entry names in table order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Iterates over `(name, contents)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static [u8])> + '_ {
        self.entries.iter().copied()
    }
}
