//! Feeder Graph
//!
//! The [`Graph`] owns every [`Record`] of a model and keeps three views of
//! them consistent:
//!
//! - **by identifier** - exclusive ownership, one entry per record
//! - **by name** - name → identifiers in insertion order (names are how
//!   records reference each other)
//! - **adjacency** - an undirected multigraph where every node and every edge
//!   record is a vertex, and each edge vertex is linked to the two vertices
//!   its `from`/`to` name
//!
//! # Architecture
//!
//! ```text
//! Controller ──▶ Graph::insert / set_property / set_coordinates / delete
//!                  │
//!                  ├── Record (mutate + notify external observers)
//!                  └── propagation (ask neighbors, apply answers, continue wave)
//! ```
//!
//! Records never hold pointers to each other or to the graph. When a record
//! changes, the graph asks the affected records how they follow the change
//! and applies their answers, all within one [`PropagationWave`].
//!
//! Insertion order matters: nodes and configuration objects first, then edges
//! (whose endpoints must already exist), then parent-child edges. The
//! [`Controller`](crate::services::Controller) enforces that order.

pub mod adjacency;
pub mod error;
mod propagation;
pub mod wave;

pub use adjacency::{Adjacency, LinkId};
pub use error::{GraphError, Result};
pub use wave::{PropagationWave, WaveReport};

use crate::config::{GraphConfig, ADDED_NAME_SUFFIX};
use crate::models::{
    keys, Coordinate, Geometry, KeyNamespace, Namespace, Record, RecordDraft, RecordError,
    RecordId, RecordKind, RecordObserver,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct Graph {
    config: GraphConfig,
    records: HashMap<RecordId, Record>,
    /// Insertion sequence → identifier, and the reverse for removal
    insertion_order: BTreeMap<u64, RecordId>,
    sequence: HashMap<RecordId, u64>,
    next_sequence: u64,
    /// Ordinal → number of records using it, per key namespace
    ordinals: HashMap<KeyNamespace, BTreeMap<u64, usize>>,
    by_name: HashMap<String, Vec<RecordId>>,
    adjacency: Adjacency,
}

impl Graph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn record(&self, id: &RecordId) -> Result<&Record> {
        self.records
            .get(id)
            .ok_or_else(|| GraphError::record_not_found(id))
    }

    pub(crate) fn record_mut(&mut self, id: &RecordId) -> Result<&mut Record> {
        self.records
            .get_mut(id)
            .ok_or_else(|| GraphError::record_not_found(id))
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order
    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.insertion_order
            .values()
            .filter_map(|id| self.records.get(id))
    }

    /// Records accepted by `predicate`, in insertion order
    pub fn records_matching<F>(&self, predicate: F) -> Vec<&Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.records().filter(|record| predicate(*record)).collect()
    }

    /// Identifiers currently indexed under `name`
    pub fn ids_named(&self, name: &str) -> &[RecordId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adjacent vertices of `id`, one entry per link
    pub fn neighbors(&self, id: &RecordId) -> Vec<RecordId> {
        self.adjacency.neighbors(id)
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// Largest ordinal in a key namespace, `0` when it is empty
    pub fn max_identifier(&self, namespace: &KeyNamespace) -> u64 {
        self.ordinals
            .get(namespace)
            .and_then(|ordinals| ordinals.last_key_value())
            .map_or(0, |(ordinal, _)| *ordinal)
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn register_observer(
        &mut self,
        id: &RecordId,
        observer: Arc<dyn RecordObserver>,
    ) -> Result<()> {
        self.record_mut(id)?.register_observer(observer);
        Ok(())
    }

    pub fn remove_observer(
        &mut self,
        id: &RecordId,
        observer: &Arc<dyn RecordObserver>,
    ) -> Result<bool> {
        Ok(self.record_mut(id)?.remove_observer(observer))
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert a draft and return the identifier it was stored under
    ///
    /// Every check runs before the graph is touched, so a rejected draft
    /// leaves no trace:
    ///
    /// 1. an explicit identifier must be free; otherwise the next ordinary
    ///    identifier is assigned
    /// 2. unnamed recorders/players and `!CMD` objects get a synthesized name
    /// 3. geometry must match the record's kind, and spatial records must be named
    /// 4. a spatial name must not be taken (when names are unique)
    /// 5. `from`/`to` of an edge must resolve to existing vertices
    pub fn insert(&mut self, draft: RecordDraft) -> Result<RecordId> {
        let id = match draft.identifier.clone() {
            Some(id) if self.records.contains_key(&id) => {
                return Err(GraphError::duplicate_identifier(&id));
            }
            Some(id) => id,
            None => RecordId::ordinary(self.max_identifier(&KeyNamespace::Ordinary) + 1),
        };
        let mut draft = draft;
        self.synthesize_name(&id, &mut draft);

        let kind = draft.kind();
        if let Some(geometry) = draft.geometry() {
            geometry
                .validate_for(kind)
                .into_result(|reason| RecordError::invalid_geometry(&id, reason))?;
        }
        if draft.properties().contains(keys::NAME, Namespace::Editable)
            && draft.text(keys::NAME).is_none()
        {
            return Err(GraphError::invalid_property_value(
                keys::NAME,
                "names must be strings",
            ));
        }
        if kind.is_spatial() {
            let name = draft.text(keys::NAME).ok_or_else(|| {
                GraphError::invalid_property_value(keys::NAME, format!("record {} has no name", id))
            })?;
            self.check_name_available(name, None)?;
        }

        let endpoints = if kind.is_edge_like() {
            Some(self.resolve_edge_endpoints(&id, &draft)?)
        } else {
            None
        };

        let record = Record::from_draft(id.clone(), draft);
        if let Some(name) = record.name() {
            self.by_name
                .entry(name.to_string())
                .or_default()
                .push(id.clone());
        }
        if kind.is_spatial() {
            self.adjacency.add_vertex(id.clone());
        }
        if let Some((source, target)) = endpoints {
            self.adjacency.link(&source, &id)?;
            self.adjacency.link(&id, &target)?;
        }
        self.records.insert(id.clone(), record);
        self.insertion_order.insert(self.next_sequence, id.clone());
        self.sequence.insert(id.clone(), self.next_sequence);
        self.next_sequence += 1;
        if let Some(ordinal) = id.ordinal() {
            *self
                .ordinals
                .entry(id.namespace())
                .or_default()
                .entry(ordinal)
                .or_default() += 1;
        }

        debug!("Inserted {:?} record {}", kind, id);
        Ok(id)
    }

    fn synthesize_name(&self, id: &RecordId, draft: &mut RecordDraft) {
        let Some(object) = draft.text(keys::OBJECT).map(str::to_string) else {
            return;
        };
        let synthesized = format!("{}:{}:{}", object, id, ADDED_NAME_SUFFIX);
        let editable = draft.properties_mut().ensure_namespace(Namespace::Editable);

        if self.config.is_command(Some(&object)) {
            if let Some(command) = editable.remove(keys::NAME) {
                editable.insert(self.config.command_property.clone(), command);
            }
            editable.insert(keys::NAME.to_string(), Value::String(synthesized));
        } else if self.config.synthesizes_name(Some(&object)) && !editable.contains_key(keys::NAME) {
            editable.insert(keys::NAME.to_string(), Value::String(synthesized));
        }
    }

    /// Fail when another spatial record (other than `except`) is named `name`
    pub(crate) fn check_name_available(&self, name: &str, except: Option<&RecordId>) -> Result<()> {
        if !self.config.unique_spatial_names {
            return Ok(());
        }
        let taken = self.ids_named(name).iter().find(|other| {
            Some(*other) != except
                && self
                    .records
                    .get(*other)
                    .is_some_and(|record| record.kind().is_spatial())
        });
        match taken {
            Some(existing) => Err(GraphError::duplicate_name(name, existing)),
            None => Ok(()),
        }
    }

    fn resolve_edge_endpoints(
        &self,
        id: &RecordId,
        draft: &RecordDraft,
    ) -> Result<(RecordId, RecordId)> {
        let reference = |key: &str| {
            draft.text(key).ok_or_else(|| {
                GraphError::invalid_property_value(key, format!("edge {} needs a string '{}'", id, key))
            })
        };
        let (from, to) = (reference(keys::FROM)?, reference(keys::TO)?);
        let asker = draft.text(keys::OBJECT);
        let target = self.resolve_for(to, asker)?;

        if draft.kind() != RecordKind::ParentChildEdge {
            return Ok((self.resolve_for(from, asker)?, target));
        }
        // The parent is looked up the way the child looks up its own parent
        let child = self.record(&target)?;
        let source = self.resolve_for(from, child.object())?;
        let source_record = self.record(&source)?;
        if source_record.is_child() && source_record.text(keys::PARENT) == Some(to) {
            // A parent-child edge always runs parent → child
            return Err(RecordError::not_connected(&source, id).into());
        }
        Ok((source, target))
    }

    /// Object type a reference held by `record` is resolved on behalf of
    ///
    /// A parent-child edge's `from` is resolved for its child, everything
    /// else for the record itself.
    pub(crate) fn asker_object<'a>(&'a self, record: &'a Record, key: &str) -> Option<&'a str> {
        if record.kind() == RecordKind::ParentChildEdge && key == keys::FROM {
            let child = record
                .text(keys::TO)
                .and_then(|to| self.ids_named(to).first())
                .and_then(|child_id| self.records.get(child_id));
            if let Some(child) = child {
                return child.object();
            }
        }
        record.object()
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    /// Resolve `name` to one identifier on behalf of the record `asking_id`
    ///
    /// Names are not guaranteed unique (legacy models, disabled uniqueness),
    /// so ties are broken by who is asking:
    ///
    /// - line-preferring askers (recorders) take the first same-name edge
    /// - others take the single same-name node, else the first node whose
    ///   object is the primary node object (`bus`), else the first node
    /// - anything left falls back to the first candidate
    pub fn resolve_key(&self, name: &str, asking_id: &RecordId) -> Result<RecordId> {
        let asker = self.record(asking_id)?;
        self.resolve_for(name, asker.object())
    }

    pub(crate) fn resolve_for(&self, name: &str, asker_object: Option<&str>) -> Result<RecordId> {
        let candidates: Vec<&Record> = self
            .ids_named(name)
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|record| record.kind().is_spatial())
            .collect();

        match candidates.as_slice() {
            [] => Err(GraphError::reference_not_found(name)),
            [only] => Ok(only.id().clone()),
            _ => Ok(self.break_tie(name, &candidates, asker_object)),
        }
    }

    fn break_tie(&self, name: &str, candidates: &[&Record], asker_object: Option<&str>) -> RecordId {
        if self.config.prefers_line(asker_object) {
            let edges: Vec<&&Record> = candidates
                .iter()
                .filter(|record| record.kind().is_edge_like())
                .collect();
            if let Some(first) = edges.first() {
                if edges.len() > 1 {
                    warn!("{} edges are named '{}', picking {}", edges.len(), name, first.id());
                }
                return first.id().clone();
            }
        }

        let nodes: Vec<&&Record> = candidates
            .iter()
            .filter(|record| record.kind().is_node())
            .collect();
        if let [only] = nodes.as_slice() {
            return only.id().clone();
        }
        let primary = nodes
            .iter()
            .find(|record| record.object() == Some(self.config.primary_node_object.as_str()));
        let picked = primary
            .or_else(|| nodes.first())
            .map_or_else(|| candidates[0].id(), |record| record.id());
        warn!(
            "{} records are named '{}', picking {}",
            candidates.len(),
            name,
            picked
        );
        picked.clone()
    }

    // ========================================================================
    // Positions and parent-child edges
    // ========================================================================

    /// Point a record is drawn at: a node's point, or the midpoint of an edge
    pub fn position_of(&self, id: &RecordId) -> Result<Coordinate> {
        let record = self.record(id)?;
        record
            .geometry()
            .and_then(Geometry::position)
            .ok_or_else(|| RecordError::invalid_geometry(id, "record has no position").into())
    }

    /// Positions of a line running from `source` to `target`
    pub fn line_endpoints(
        &self,
        source: &RecordId,
        target: &RecordId,
    ) -> Result<(Coordinate, Coordinate)> {
        Ok((self.position_of(source)?, self.position_of(target)?))
    }

    /// Vertex an edge's `from` or `to` currently points at
    ///
    /// Prefers the linked neighbor carrying the name, so the answer agrees
    /// with adjacency even when the name is ambiguous.
    pub(crate) fn endpoint_of(&self, edge: &Record, key: &str) -> Result<RecordId> {
        let name = edge
            .text(key)
            .ok_or_else(|| RecordError::property_not_found(edge.id(), key, Namespace::Editable))?;
        let linked = self
            .adjacency
            .neighbors(edge.id())
            .into_iter()
            .find(|neighbor| self.records.get(neighbor).and_then(Record::name) == Some(name));
        match linked {
            Some(id) => Ok(id),
            None => self.resolve_for(name, self.asker_object(edge, key)),
        }
    }

    /// Geometry an edge should have given where its endpoints are now
    pub fn edge_geometry(&self, edge_id: &RecordId) -> Result<Geometry> {
        let edge = self.record(edge_id)?;
        let source = self.endpoint_of(edge, keys::FROM)?;
        let target = self.endpoint_of(edge, keys::TO)?;
        let (a, b) = self.line_endpoints(&source, &target)?;
        Ok(Geometry::line(a, b))
    }

    /// Draft of the parent-child edge attaching `child_id` to `parent_id`
    ///
    /// The edge takes the next `parentChild:<n>` identifier, is named after
    /// that identifier and is drawn from the parent to the child.
    pub fn parent_child_draft(&self, parent_id: &RecordId, child_id: &RecordId) -> Result<RecordDraft> {
        let (source, target) = self.line_endpoints(parent_id, child_id)?;
        let parent_name = self.record(parent_id)?.name().unwrap_or_default().to_string();
        let child_name = self.record(child_id)?.name().unwrap_or_default().to_string();
        let id = RecordId::parent_child(self.max_identifier(&KeyNamespace::ParentChild) + 1);

        Ok(RecordDraft::edge(parent_name, child_name)
            .with_geometry(Some(Geometry::line(source, target)))
            .with_property(keys::NAME, id.as_str())
            .with_property(keys::OBJECT, self.config.parent_child_object.as_str())
            .with_property(keys::PHASES, self.config.parent_child_phases)
            .with_property(keys::TYPE, self.config.parent_child_type.as_str())
            .with_identifier(id))
    }

    /// The parent-child edge that attaches `child_id`, if any
    pub fn parent_child_edge_of(&self, child_id: &RecordId) -> Result<Option<RecordId>> {
        let child = self.record(child_id)?;
        let mut edges: Vec<RecordId> = self
            .adjacency
            .neighbors(child_id)
            .into_iter()
            .filter(|neighbor| {
                self.records.get(neighbor).is_some_and(|record| {
                    record.kind() == RecordKind::ParentChildEdge
                        && record.text(keys::TO).is_some()
                        && record.text(keys::TO) == child.name()
                })
            })
            .collect();
        edges.dedup();
        match edges.len() {
            0 => Ok(None),
            1 => Ok(edges.pop()),
            count => Err(GraphError::ambiguous_reference(
                child.name().unwrap_or(child_id.as_str()),
                count,
            )),
        }
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Drop a record from every index; cascading is the caller's job
    fn detach(&mut self, id: &RecordId) -> Option<Record> {
        let record = self.records.remove(id)?;
        self.adjacency.remove_vertex(id);
        if let Some(name) = record.name() {
            self.unindex_name(name, id);
        }
        if let Some(sequence) = self.sequence.remove(id) {
            self.insertion_order.remove(&sequence);
        }
        if let (Some(ordinal), Some(ordinals)) = (id.ordinal(), self.ordinals.get_mut(&id.namespace())) {
            if let Some(count) = ordinals.get_mut(&ordinal) {
                *count -= 1;
                if *count == 0 {
                    ordinals.remove(&ordinal);
                }
            }
        }
        debug!("Removed record {}", id);
        Some(record)
    }

    fn unindex_name(&mut self, name: &str, id: &RecordId) {
        if let Some(ids) = self.by_name.get_mut(name) {
            ids.retain(|other| other != id);
            if ids.is_empty() {
                self.by_name.remove(name);
            }
        }
    }

    fn index_name(&mut self, name: &str, id: &RecordId) {
        let ids = self.by_name.entry(name.to_string()).or_default();
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "graph_test.rs"]
mod graph_test;
