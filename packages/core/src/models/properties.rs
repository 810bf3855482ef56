//! Namespaced Record Properties
//!
//! Record properties are split into four fixed namespaces. A record carries a
//! subset of them; the set of namespaces is closed, so an unknown namespace
//! cannot be expressed at all and a namespace the record does not carry is a
//! recoverable lookup failure.
//!
//! | Namespace      | Wire key       | Contents                                   |
//! |----------------|----------------|--------------------------------------------|
//! | `Core`         | `core`         | identifier and other engine metadata       |
//! | `Editable`     | `editable`     | domain attributes (`name`, `from`, `to`…)  |
//! | `FormInputs`   | `formInputs`   | values collected by modal forms            |
//! | `UrlEndpoints` | `urlEndpoints` | endpoint descriptors used by modal submits |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Property bag of a single namespace
pub type PropertyMap = serde_json::Map<String, Value>;

/// Well-known property keys
pub mod keys {
    /// Core: the record identifier (read-only)
    pub const IDENTIFIER: &str = "identifier";
    /// Editable: display name, the target of all textual references
    pub const NAME: &str = "name";
    /// Editable: object-type tag (`bus`, `line`, `recorder`, …)
    pub const OBJECT: &str = "object";
    /// Editable: name of an edge's source
    pub const FROM: &str = "from";
    /// Editable: name of an edge's target
    pub const TO: &str = "to";
    /// Editable: name of a child's parent
    pub const PARENT: &str = "parent";
    /// Editable: sub-type tag (`parentChild` on synthesized edges)
    pub const TYPE: &str = "type";
    /// Editable: phase count
    pub const PHASES: &str = "phases";

    /// Keys whose values name another record
    pub const REFERENCES: [&str; 3] = [FROM, TO, PARENT];
}

/// The four fixed property namespaces
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Namespace {
    Core,
    /// Default namespace for property access
    #[default]
    Editable,
    FormInputs,
    UrlEndpoints,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Core,
        Namespace::Editable,
        Namespace::FormInputs,
        Namespace::UrlEndpoints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Core => "core",
            Namespace::Editable => "editable",
            Namespace::FormInputs => "formInputs",
            Namespace::UrlEndpoints => "urlEndpoints",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .into_iter()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| format!("Unknown property namespace: {}", s))
    }
}

/// Namespaced property storage of one record
///
/// A fresh `Properties` carries the `Core` and `Editable` namespaces. The
/// form and URL namespaces exist only on records that opt into them (modal
/// pseudo-records, configuration objects loaded with them).
#[derive(Debug, Clone, PartialEq)]
pub struct Properties {
    namespaces: BTreeMap<Namespace, PropertyMap>,
}

impl Default for Properties {
    fn default() -> Self {
        let mut namespaces = BTreeMap::new();
        namespaces.insert(Namespace::Core, PropertyMap::new());
        namespaces.insert(Namespace::Editable, PropertyMap::new());
        Self { namespaces }
    }
}

impl Properties {
    /// Properties carrying only the `Core` namespace
    pub fn core_only() -> Self {
        let mut namespaces = BTreeMap::new();
        namespaces.insert(Namespace::Core, PropertyMap::new());
        Self { namespaces }
    }

    /// Make sure `namespace` is carried, creating it empty if needed
    pub fn ensure_namespace(&mut self, namespace: Namespace) -> &mut PropertyMap {
        self.namespaces.entry(namespace).or_default()
    }

    pub fn has_namespace(&self, namespace: Namespace) -> bool {
        self.namespaces.contains_key(&namespace)
    }

    pub fn namespace(&self, namespace: Namespace) -> Option<&PropertyMap> {
        self.namespaces.get(&namespace)
    }

    pub(crate) fn namespace_mut(&mut self, namespace: Namespace) -> Option<&mut PropertyMap> {
        self.namespaces.get_mut(&namespace)
    }

    /// Namespaces carried, in declaration order
    pub fn namespaces(&self) -> impl Iterator<Item = Namespace> + '_ {
        self.namespaces.keys().copied()
    }

    pub fn get(&self, key: &str, namespace: Namespace) -> Option<&Value> {
        self.namespaces.get(&namespace).and_then(|map| map.get(key))
    }

    /// String value of `key`, if present and a string
    pub fn text(&self, key: &str, namespace: Namespace) -> Option<&str> {
        self.get(key, namespace).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str, namespace: Namespace) -> bool {
        self.get(key, namespace).is_some()
    }
}
