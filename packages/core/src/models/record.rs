//! Network Records
//!
//! A [`Record`] is one element of a feeder model: a node (bus, meter, load…),
//! a connecting edge (line, switch, transformer…), a synthesized parent-child
//! edge, or a non-spatial configuration object. A record holds namespaced
//! properties and optional geometry and knows nothing about the graph that
//! owns it.
//!
//! # Kinds
//!
//! The kind of a record is derived, never stored:
//!
//! - no geometry → [`RecordKind::Configuration`]
//! - identifier in the `parentChild` namespace → [`RecordKind::ParentChildEdge`]
//! - both `from` and `to` present → [`RecordKind::Edge`]
//! - otherwise → [`RecordKind::Node`]
//!
//! # Two roles
//!
//! Records are observable (external [`RecordObserver`]s register on them) and
//! they answer dependency questions as observers of other records
//! ([`Record::handle_updated_coordinates`], [`Record::handle_updated_property`]).
//! The graph asks those questions and applies the answers, so a record never
//! needs a pointer to the graph or to another record.

use crate::models::properties::keys;
use crate::models::{Geometry, Namespace, Properties, PropertyMap, RecordId, RecordObserver};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a single record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Record '{id}' does not have the namespace '{namespace}'")]
    NamespaceNotFound { id: RecordId, namespace: Namespace },

    #[error("Property '{key}' could not be found in namespace '{namespace}' of record '{id}'")]
    PropertyNotFound {
        id: RecordId,
        key: String,
        namespace: Namespace,
    },

    #[error("Property '{key}' of record '{id}' cannot be changed or deleted")]
    ProtectedProperty { id: RecordId, key: String },

    #[error("Invalid geometry for record '{id}': {reason}")]
    InvalidGeometry { id: RecordId, reason: String },

    /// The observable has no relationship with the observer that was asked to follow it
    #[error("Record '{observable}' is not connected to record '{observer}'")]
    NotConnected {
        observable: RecordId,
        observer: RecordId,
    },
}

impl RecordError {
    pub fn namespace_not_found(id: &RecordId, namespace: Namespace) -> Self {
        Self::NamespaceNotFound {
            id: id.clone(),
            namespace,
        }
    }

    pub fn property_not_found(id: &RecordId, key: impl Into<String>, namespace: Namespace) -> Self {
        Self::PropertyNotFound {
            id: id.clone(),
            key: key.into(),
            namespace,
        }
    }

    pub fn protected_property(id: &RecordId, key: impl Into<String>) -> Self {
        Self::ProtectedProperty {
            id: id.clone(),
            key: key.into(),
        }
    }

    pub fn invalid_geometry(id: &RecordId, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            id: id.clone(),
            reason: reason.into(),
        }
    }

    pub fn not_connected(observable: &RecordId, observer: &RecordId) -> Self {
        Self::NotConnected {
            observable: observable.clone(),
            observer: observer.clone(),
        }
    }
}

/// Derived classification of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Node,
    Edge,
    ParentChildEdge,
    Configuration,
}

impl RecordKind {
    pub fn derive(
        identifier: Option<&RecordId>,
        geometry: Option<&Geometry>,
        properties: &Properties,
    ) -> Self {
        if geometry.is_none() {
            RecordKind::Configuration
        } else if identifier.is_some_and(RecordId::is_parent_child) {
            RecordKind::ParentChildEdge
        } else if properties.contains(keys::FROM, Namespace::Editable)
            && properties.contains(keys::TO, Namespace::Editable)
        {
            RecordKind::Edge
        } else {
            RecordKind::Node
        }
    }

    /// Nodes and edges have a spatial presence; configuration objects do not
    pub fn is_spatial(self) -> bool {
        !matches!(self, RecordKind::Configuration)
    }

    pub fn is_node(self) -> bool {
        matches!(self, RecordKind::Node)
    }

    /// Ordinary or parent-child edge
    pub fn is_edge_like(self) -> bool {
        matches!(self, RecordKind::Edge | RecordKind::ParentChildEdge)
    }
}

/// Deep copy of a record's data
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSnapshot {
    pub geometry: Option<Geometry>,
    pub properties: Properties,
}

/// A record that has not been inserted into a graph yet
///
/// Drafts have no identifier; the graph assigns one on insertion.
///
/// ```rust
/// use feederspace_core::models::{RecordDraft, RecordKind};
///
/// let bus = RecordDraft::node([-80.1, 35.2])
///     .with_property("name", "bus_1")
///     .with_property("object", "bus");
/// assert_eq!(bus.kind(), RecordKind::Node);
///
/// let line = RecordDraft::edge("bus_1", "bus_2").with_property("name", "line_1");
/// assert_eq!(line.kind(), RecordKind::Edge);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordDraft {
    pub(crate) identifier: Option<RecordId>,
    geometry: Option<Geometry>,
    properties: Properties,
}

impl RecordDraft {
    /// A node positioned at `position`
    pub fn node(position: [f64; 2]) -> Self {
        Self {
            identifier: None,
            geometry: Some(Geometry::Point(position)),
            properties: Properties::default(),
        }
    }

    /// An edge between the records named `from` and `to`
    ///
    /// The geometry is a placeholder until the edge is drawn between its
    /// endpoints.
    pub fn edge(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            identifier: None,
            geometry: Some(Geometry::line([0.0, 0.0], [0.0, 0.0])),
            properties: Properties::default(),
        }
        .with_property(keys::FROM, Value::String(from.into()))
        .with_property(keys::TO, Value::String(to.into()))
    }

    /// A configuration object (no geometry)
    pub fn configuration() -> Self {
        Self {
            identifier: None,
            geometry: None,
            properties: Properties::default(),
        }
    }

    pub fn with_geometry(mut self, geometry: Option<Geometry>) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set an editable property
    pub fn with_property(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_property_in(Namespace::Editable, key, value)
    }

    /// Set a property in `namespace`, carrying the namespace if needed
    pub fn with_property_in(
        mut self,
        namespace: Namespace,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.properties
            .ensure_namespace(namespace)
            .insert(key.into(), value.into());
        self
    }

    /// Carry `namespace` even if it stays empty
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.properties.ensure_namespace(namespace);
        self
    }

    pub(crate) fn with_identifier(mut self, identifier: RecordId) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub(crate) fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    pub fn kind(&self) -> RecordKind {
        RecordKind::derive(
            self.identifier.as_ref(),
            self.geometry.as_ref(),
            &self.properties,
        )
    }

    /// Editable string property
    pub fn text(&self, key: &str) -> Option<&str> {
        self.properties.text(key, Namespace::Editable)
    }
}

/// Answer of an edge asked to follow a coordinate change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateResponse {
    /// Recompute both points from the endpoints
    Redraw,
    /// Nothing to do (a sibling edge moved)
    Ignore,
}

/// One network element owned by a graph
pub struct Record {
    id: RecordId,
    geometry: Option<Geometry>,
    properties: Properties,
    observers: Vec<Arc<dyn RecordObserver>>,
    original: RecordSnapshot,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("geometry", &self.geometry)
            .field("properties", &self.properties)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Record {
    /// Build a record from a draft, stamping the identifier into `core`
    ///
    /// An identifier already present in `core` keeps its JSON form when it
    /// denotes `id`, so a numeric `7` stays numeric. The original snapshot is
    /// taken here, after the identifier is set.
    pub(crate) fn from_draft(id: RecordId, draft: RecordDraft) -> Self {
        let RecordDraft {
            geometry,
            mut properties,
            ..
        } = draft;
        let core = properties.ensure_namespace(Namespace::Core);
        let keeps_form = match core.get(keys::IDENTIFIER) {
            Some(Value::String(s)) => s.as_str() == id.as_str(),
            Some(Value::Number(n)) => n.to_string() == id.as_str(),
            _ => false,
        };
        if !keeps_form {
            core.insert(keys::IDENTIFIER.to_string(), Value::String(id.to_string()));
        }

        let original = RecordSnapshot {
            geometry: geometry.clone(),
            properties: properties.clone(),
        };

        Self {
            id,
            geometry,
            properties,
            observers: Vec::new(),
            original,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn kind(&self) -> RecordKind {
        RecordKind::derive(Some(&self.id), self.geometry.as_ref(), &self.properties)
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn has_coordinates(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Editable string property
    pub fn text(&self, key: &str) -> Option<&str> {
        self.properties.text(key, Namespace::Editable)
    }

    pub fn name(&self) -> Option<&str> {
        self.text(keys::NAME)
    }

    /// Object-type tag (`bus`, `line`, `recorder`…)
    pub fn object(&self) -> Option<&str> {
        self.text(keys::OBJECT)
    }

    /// Whether this record is attached to a parent
    pub fn is_child(&self) -> bool {
        self.properties.contains(keys::PARENT, Namespace::Editable)
    }

    /// Data as it was when the record was created
    pub fn original(&self) -> &RecordSnapshot {
        &self.original
    }

    /// Deep copy of the current data
    pub fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            geometry: self.geometry.clone(),
            properties: self.properties.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn get_property(&self, key: &str, namespace: Namespace) -> Result<&Value, RecordError> {
        self.namespace_map(namespace)?
            .get(key)
            .ok_or_else(|| RecordError::property_not_found(&self.id, key, namespace))
    }

    /// Whether `key` exists in `namespace`; `false` when the namespace is absent
    pub fn has_property(&self, key: &str, namespace: Namespace) -> bool {
        self.properties.contains(key, namespace)
    }

    /// All properties of one namespace
    pub fn properties_in(&self, namespace: Namespace) -> Result<&PropertyMap, RecordError> {
        self.namespace_map(namespace)
    }

    fn namespace_map(&self, namespace: Namespace) -> Result<&PropertyMap, RecordError> {
        self.properties
            .namespace(namespace)
            .ok_or_else(|| RecordError::namespace_not_found(&self.id, namespace))
    }

    /// Create or replace a property, then notify observers
    ///
    /// Returns the previous value (`None` when the key was created). Fails
    /// without mutation when the namespace is not carried or the key is the
    /// identifier.
    pub fn set_property(
        &mut self,
        key: &str,
        value: Value,
        namespace: Namespace,
    ) -> Result<Option<Value>, RecordError> {
        if namespace == Namespace::Core && key == keys::IDENTIFIER {
            return Err(RecordError::protected_property(&self.id, key));
        }
        let map = self
            .properties
            .namespace_mut(namespace)
            .ok_or_else(|| RecordError::namespace_not_found(&self.id, namespace))?;
        let old_value = map.insert(key.to_string(), value);

        tracing::trace!("Record {} set {}.{}", self.id, namespace, key);
        for observer in &self.observers {
            observer.handle_updated_property(self, key, old_value.as_ref(), namespace);
        }
        Ok(old_value)
    }

    /// Remove a property, then notify observers with the removed value
    pub fn delete_property(&mut self, key: &str, namespace: Namespace) -> Result<Value, RecordError> {
        if namespace == Namespace::Core && key == keys::IDENTIFIER {
            return Err(RecordError::protected_property(&self.id, key));
        }
        let map = self
            .properties
            .namespace_mut(namespace)
            .ok_or_else(|| RecordError::namespace_not_found(&self.id, namespace))?;
        let old_value = map
            .remove(key)
            .ok_or_else(|| RecordError::property_not_found(&self.id, key, namespace))?;

        tracing::trace!("Record {} deleted {}.{}", self.id, namespace, key);
        for observer in &self.observers {
            observer.handle_updated_property(self, key, Some(&old_value), namespace);
        }
        Ok(old_value)
    }

    // ------------------------------------------------------------------
    // Coordinates
    // ------------------------------------------------------------------

    /// Replace the geometry, then notify observers
    ///
    /// The new geometry must match the record's kind (one point for nodes,
    /// two for edges). Returns the previous geometry.
    pub fn set_coordinates(&mut self, geometry: Geometry) -> Result<Option<Geometry>, RecordError> {
        geometry
            .validate_for(self.kind())
            .into_result(|reason| RecordError::invalid_geometry(&self.id, reason))?;
        let old_geometry = self.geometry.replace(geometry);

        for observer in &self.observers {
            observer.handle_updated_coordinates(self, old_geometry.as_ref());
        }
        Ok(old_geometry)
    }

    // ------------------------------------------------------------------
    // Observable side
    // ------------------------------------------------------------------

    pub fn register_observer(&mut self, observer: Arc<dyn RecordObserver>) {
        self.observers.push(observer);
    }

    /// Deregister `observer`; returns whether it was registered
    pub fn remove_observer(&mut self, observer: &Arc<dyn RecordObserver>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|ob| !Arc::ptr_eq(ob, observer));
        let removed = self.observers.len() != before;
        if !removed {
            tracing::debug!("Observer was not registered on record {}", self.id);
        }
        removed
    }

    pub fn observers(&self) -> &[Arc<dyn RecordObserver>] {
        &self.observers
    }

    /// Tell every observer this record is going away
    pub(crate) fn notify_deleted(&self) {
        for observer in &self.observers {
            observer.handle_deleted_observable(self);
        }
    }

    // ------------------------------------------------------------------
    // Observer side
    // ------------------------------------------------------------------

    /// Decide how this record follows a coordinate change of `observable`
    ///
    /// Only edges follow coordinates. An edge redraws when `observable` is one
    /// of its endpoints and ignores a sibling edge that shares a vertex with
    /// it. Anything else means the two records were never related.
    pub fn handle_updated_coordinates(
        &self,
        observable: &Record,
    ) -> Result<CoordinateResponse, RecordError> {
        if !self.kind().is_edge_like() {
            return Err(RecordError::not_connected(&observable.id, &self.id));
        }
        let is_endpoint = observable
            .name()
            .is_some_and(|name| self.text(keys::FROM) == Some(name) || self.text(keys::TO) == Some(name));
        if is_endpoint {
            Ok(CoordinateResponse::Redraw)
        } else if observable.kind().is_edge_like() {
            Ok(CoordinateResponse::Ignore)
        } else {
            Err(RecordError::not_connected(&observable.id, &self.id))
        }
    }

    /// Reference rewrites this record needs after `observable` changed `key`
    ///
    /// When `observable` was renamed, every `from`/`to`/`parent` that held the
    /// old name must now hold the new one. The caller applies the rewrites
    /// through the normal property path so they propagate in turn.
    pub fn handle_updated_property(
        &self,
        observable: &Record,
        key: &str,
        old_value: Option<&Value>,
    ) -> Vec<(&'static str, Value)> {
        if key != keys::NAME {
            return Vec::new();
        }
        let (Some(old_name), Some(new_name)) = (old_value.and_then(Value::as_str), observable.name())
        else {
            return Vec::new();
        };
        keys::REFERENCES
            .into_iter()
            .filter(|reference| self.text(reference) == Some(old_name))
            .map(|reference| (reference, Value::String(new_name.to_string())))
            .collect()
    }
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
