use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A globally unique, human-readable component identifier.
///
/// Identifiers are namespaced strings matching `([a-z0-9_.-]+:)?[a-z0-9/._-]+`:
/// an optional lowercase namespace, a single `:` separator, and a lowercase
/// path. They are validated on construction and immutable afterwards.
///
/// ```
/// use latch::component::Identifier;
///
/// let id = Identifier::new("mymod:health").unwrap();
/// assert_eq!(id.namespace(), Some("mymod"));
/// assert_eq!(id.path(), "health");
/// assert!(Identifier::new("MyMod:Health").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier {
    full: Box<str>,
    /// Byte offset of the path within `full` (0 when there is no namespace).
    path_start: usize,
}

impl Identifier {
    /// Parse and validate an identifier string.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::Identifier {
            raw: raw.to_owned(),
        };

        let (namespace, path, path_start) = match raw.find(':') {
            Some(split) => (Some(&raw[..split]), &raw[split + 1..], split + 1),
            None => (None, raw, 0),
        };

        if let Some(namespace) = namespace
            && (namespace.is_empty() || !namespace.bytes().all(is_namespace_byte))
        {
            return Err(malformed());
        }
        if path.is_empty() || !path.bytes().all(is_path_byte) {
            return Err(malformed());
        }

        Ok(Self {
            full: raw.into(),
            path_start,
        })
    }

    /// The full identifier string, namespace included.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// The namespace, if the identifier has one.
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        match self.path_start {
            0 => None,
            split => Some(&self.full[..split - 1]),
        }
    }

    /// The path portion of the identifier.
    #[inline]
    pub fn path(&self) -> &str {
        &self.full[self.path_start..]
    }
}

/// Namespace characters: `[a-z0-9_.-]`.
#[inline]
fn is_namespace_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'.' | b'-')
}

/// Path characters: `[a-z0-9/._-]`.
#[inline]
fn is_path_byte(b: u8) -> bool {
    is_namespace_byte(b) || b == b'/'
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for Identifier {
    type Err = ValidationError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
