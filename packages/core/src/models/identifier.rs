//! Record Identifiers
//!
//! Every record in a graph is addressed by a [`RecordId`]. Identifiers live in
//! one of several key namespaces:
//!
//! - **Ordinary**: plain decimal integers (`"1"`, `"42"`). These are the only
//!   identifiers that survive export.
//! - **Parent-child**: `"parentChild:<n>"`, reserved for synthesized
//!   parent-child edges.
//! - **Other**: any other prefixed key (`"modal:rename"`, `"component:bus"`)
//!   restored from a document. The graph never generates these.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Prefix of the key namespace used by synthesized parent-child edges
pub const PARENT_CHILD_PREFIX: &str = "parentChild";

/// Key namespace of a [`RecordId`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyNamespace {
    /// Plain decimal identifiers
    Ordinary,
    /// `parentChild:<n>` identifiers
    ParentChild,
    /// Any other prefixed identifier, carrying its prefix
    Other(String),
}

/// Unique, immutable identifier of a record within a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Identifier in the ordinary namespace
    pub fn ordinary(ordinal: u64) -> Self {
        Self(ordinal.to_string())
    }

    /// Identifier in the parent-child namespace
    pub fn parent_child(ordinal: u64) -> Self {
        Self(format!("{}:{}", PARENT_CHILD_PREFIX, ordinal))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify this identifier into its key namespace
    pub fn namespace(&self) -> KeyNamespace {
        if self.0.parse::<u64>().is_ok() {
            return KeyNamespace::Ordinary;
        }
        match self.0.split_once(':') {
            Some((PARENT_CHILD_PREFIX, rest)) if rest.parse::<u64>().is_ok() => {
                KeyNamespace::ParentChild
            }
            Some((prefix, _)) => KeyNamespace::Other(prefix.to_string()),
            None => KeyNamespace::Other(self.0.clone()),
        }
    }

    /// Numeric ordinal within the identifier's own namespace
    ///
    /// Returns `None` for identifiers in the `Other` namespace.
    pub fn ordinal(&self) -> Option<u64> {
        match self.namespace() {
            KeyNamespace::Ordinary => self.0.parse().ok(),
            KeyNamespace::ParentChild => self
                .0
                .split_once(':')
                .and_then(|(_, rest)| rest.parse().ok()),
            KeyNamespace::Other(_) => None,
        }
    }

    pub fn is_ordinary(&self) -> bool {
        self.namespace() == KeyNamespace::Ordinary
    }

    pub fn is_parent_child(&self) -> bool {
        self.namespace() == KeyNamespace::ParentChild
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
