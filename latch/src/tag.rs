//! Tagged value tree used by the serialization codec.
//!
//! Holder persistence hands the codec an opaque tagged tree compatible with the
//! host's persistence format. [`Tag`] is that tree: a small set of primitive
//! variants plus ordered lists and string-keyed compounds. Compounds keep their
//! keys in a [`BTreeMap`] so that encoding the same container twice produces
//! the same tree, byte for byte.

use std::collections::BTreeMap;
use std::collections::btree_map;

/// A single node in a tagged value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// An ordered, heterogeneous list of tags.
    List(Vec<Tag>),
    /// A string-keyed mapping of tags.
    Compound(Compound),
}

impl Tag {
    /// Get the string value, if this tag is a string.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer value, if this tag is an int.
    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Tag::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the long value, if this tag is a long.
    #[inline]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Tag::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the list elements, if this tag is a list.
    #[inline]
    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the compound value, if this tag is a compound.
    #[inline]
    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(c) => Some(c),
            _ => None,
        }
    }
}

impl From<Compound> for Tag {
    #[inline]
    fn from(value: Compound) -> Self {
        Tag::Compound(value)
    }
}

impl From<&str> for Tag {
    #[inline]
    fn from(value: &str) -> Self {
        Tag::String(value.to_owned())
    }
}

/// A string-keyed mapping of tags with deterministic key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    entries: BTreeMap<String, Tag>,
}

impl Compound {
    /// Create a new, empty compound.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert a tag under the given key, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, tag: impl Into<Tag>) -> Option<Tag> {
        self.entries.insert(key.into(), tag.into())
    }

    /// Get the tag mapped to the given key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    /// Check whether the compound has a mapping for the given key.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove and return the tag mapped to the given key.
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.entries.remove(key)
    }

    /// Number of entries in the compound.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the compound has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in key order.
    #[inline]
    pub fn iter(&self) -> btree_map::Iter<'_, String, Tag> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Compound {
    type Item = (&'a String, &'a Tag);
    type IntoIter = btree_map::Iter<'a, String, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
