//! Controller
//!
//! The [`Controller`] is the only entry point views and import code use to
//! change a model. It owns the [`Graph`], validates a whole batch before
//! touching anything, and runs each batch in a single [`PropagationWave`].
//!
//! # Batches
//!
//! - `add_records` / `load_document` insert nodes and configuration objects
//!   first, then edges, then one synthesized parent-child edge per child
//! - `set_coordinates`, `set_property`, `delete_property` and `delete_records`
//!   share one wave across every identifier in the batch, so a record reached
//!   from two members of the batch is acted on once
//! - `reset_records` applies each difference in a wave of its own, because a
//!   rename followed by a move must redraw the same edges twice
//! - after a `from`/`to` edit the edge is redrawn; after a `parent` edit the
//!   child's parent-child edge is redrawn, or synthesized if it is missing

use crate::config::GraphConfig;
use crate::document::ModelDocument;
use crate::graph::{Graph, GraphError, PropagationWave, Result, WaveReport};
use crate::models::{
    keys, Geometry, Namespace, RecordDraft, RecordId, RecordKind, RecordObserver,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Controller {
    graph: Graph,
}

impl Controller {
    /// Create a controller over an empty graph
    pub fn new(config: GraphConfig) -> Result<Self> {
        config
            .validate()
            .into_result(|reason| GraphError::invalid_config(reason))?;
        Ok(Self {
            graph: Graph::new(config),
        })
    }

    pub fn with_graph(graph: Graph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    // ========================================================================
    // Loading and exporting
    // ========================================================================

    /// Add user-created records and return their identifiers
    ///
    /// Edges are drawn between their endpoints as they are inserted, so the
    /// placeholder geometry of [`RecordDraft::edge`] never survives.
    pub fn add_records(&mut self, drafts: Vec<RecordDraft>) -> Result<Vec<RecordId>> {
        if drafts.is_empty() {
            return Err(GraphError::invalid_argument("at least one record is required"));
        }
        self.insert_batch(drafts, true)
    }

    /// Load every element of a document, keeping persisted identifiers and geometry
    pub fn load_document(&mut self, document: &ModelDocument) -> Result<Vec<RecordId>> {
        let inserted = self.insert_batch(document.to_drafts(), false)?;
        info!(
            "Loaded {} elements into {} records",
            document.len(),
            inserted.len()
        );
        Ok(inserted)
    }

    pub fn export_document(&self) -> ModelDocument {
        let document = ModelDocument::from_graph(&self.graph);
        info!("Exported {} of {} records", document.len(), self.graph.len());
        document
    }

    fn insert_batch(&mut self, drafts: Vec<RecordDraft>, redraw_edges: bool) -> Result<Vec<RecordId>> {
        let (edges, others): (Vec<RecordDraft>, Vec<RecordDraft>) = drafts
            .into_iter()
            .partition(|draft| draft.kind().is_edge_like());

        let mut inserted = Vec::with_capacity(edges.len() + others.len());
        for draft in others {
            inserted.push(self.graph.insert(draft)?);
        }
        for draft in edges {
            let id = self.graph.insert(draft)?;
            if redraw_edges {
                self.graph.redraw_edge(&id, &mut PropagationWave::new())?;
            }
            inserted.push(id);
        }

        let mut orphans = Vec::new();
        for id in &inserted {
            if self.needs_parent_edge(id)? {
                orphans.push(id.clone());
            }
        }
        for child in orphans {
            inserted.push(self.attach_to_parent(&child)?);
        }
        Ok(inserted)
    }

    fn needs_parent_edge(&self, id: &RecordId) -> Result<bool> {
        let record = self.graph.record(id)?;
        let kind = record.kind();
        Ok(kind.is_spatial()
            && kind != RecordKind::ParentChildEdge
            && record.is_child()
            && self.graph.parent_child_edge_of(id)?.is_none())
    }

    /// Synthesize and insert the parent-child edge of `child_id`
    fn attach_to_parent(&mut self, child_id: &RecordId) -> Result<RecordId> {
        let parent_name = self
            .graph
            .record(child_id)?
            .text(keys::PARENT)
            .ok_or_else(|| {
                GraphError::invalid_property_value(keys::PARENT, format!("record {} has no parent", child_id))
            })?
            .to_string();
        let parent_id = self.graph.resolve_key(&parent_name, child_id)?;
        let draft = self.graph.parent_child_draft(&parent_id, child_id)?;
        let edge_id = self.graph.insert(draft)?;
        debug!("Attached {} to parent {} via {}", child_id, parent_id, edge_id);
        Ok(edge_id)
    }

    // ========================================================================
    // Mutation batches
    // ========================================================================

    fn check_batch(&self, ids: &[RecordId]) -> Result<()> {
        if ids.is_empty() {
            return Err(GraphError::invalid_argument("at least one identifier is required"));
        }
        match ids.iter().find(|id| !self.graph.contains(id)) {
            Some(missing) => Err(GraphError::record_not_found(missing)),
            None => Ok(()),
        }
    }

    /// Delete records with everything that depends on them
    ///
    /// Records already removed by an earlier cascade of the same batch are
    /// skipped. The report lists every deleted record.
    pub fn delete_records(&mut self, ids: &[RecordId]) -> Result<WaveReport> {
        self.check_batch(ids)?;
        let mut wave = PropagationWave::new();
        for id in ids {
            if !self.graph.contains(id) {
                debug!("Record {} was already removed by this batch", id);
                continue;
            }
            self.graph.delete(id, &mut wave)?;
        }
        let report = wave.finish();
        info!("Deleted {} records", report.visited.len());
        Ok(report)
    }

    pub fn set_coordinates(&mut self, ids: &[RecordId], geometry: Geometry) -> Result<WaveReport> {
        self.check_batch(ids)?;
        let mut wave = PropagationWave::new();
        for id in ids {
            self.graph.set_coordinates(id, geometry.clone(), &mut wave)?;
        }
        Ok(wave.finish())
    }

    pub fn set_property(
        &mut self,
        ids: &[RecordId],
        key: &str,
        value: Value,
        namespace: Namespace,
    ) -> Result<WaveReport> {
        self.check_batch(ids)?;
        let mut wave = PropagationWave::new();
        for id in ids {
            self.set_one(id, key, value.clone(), namespace, &mut wave)?;
        }
        Ok(wave.finish())
    }

    fn set_one(
        &mut self,
        id: &RecordId,
        key: &str,
        value: Value,
        namespace: Namespace,
        wave: &mut PropagationWave,
    ) -> Result<()> {
        self.graph.set_property(id, key, value, namespace, wave)?;
        if namespace != Namespace::Editable {
            return Ok(());
        }
        let kind = self.graph.record(id)?.kind();
        match key {
            keys::FROM | keys::TO if kind.is_edge_like() => self.graph.redraw_edge(id, wave),
            keys::PARENT if kind.is_spatial() && kind != RecordKind::ParentChildEdge => {
                match self.graph.parent_child_edge_of(id)? {
                    Some(edge) => self.graph.redraw_edge(&edge, wave),
                    None => self.attach_to_parent(id).map(|_| ()),
                }
            }
            _ => Ok(()),
        }
    }

    /// Delete `key` from every record of the batch that has it
    pub fn delete_property(
        &mut self,
        ids: &[RecordId],
        key: &str,
        namespace: Namespace,
    ) -> Result<WaveReport> {
        self.check_batch(ids)?;
        let mut wave = PropagationWave::new();
        for id in ids {
            if self.graph.record(id)?.has_property(key, namespace) {
                self.graph.delete_property(id, key, namespace, &mut wave)?;
            }
        }
        Ok(wave.finish())
    }

    /// Whether any record of the batch has `key`
    pub fn has_property(&self, ids: &[RecordId], key: &str, namespace: Namespace) -> Result<bool> {
        self.check_batch(ids)?;
        let mut records = ids.iter().filter_map(|id| self.graph.record(id).ok());
        Ok(records.any(|record| record.has_property(key, namespace)))
    }

    /// Restore records to the state they were created in
    ///
    /// Differences are applied through the normal operations so they
    /// propagate: the name first, then the remaining properties, then the
    /// position of nodes. Edges follow their endpoints and are not restored
    /// point by point.
    pub fn reset_records(&mut self, ids: &[RecordId]) -> Result<WaveReport> {
        self.check_batch(ids)?;
        let mut report = WaveReport::default();
        for id in ids {
            if self.graph.contains(id) {
                report.merge(self.reset_one(id)?);
            }
        }
        Ok(report)
    }

    fn reset_one(&mut self, id: &RecordId) -> Result<WaveReport> {
        let record = self.graph.record(id)?;
        let original = record.original().clone();
        let current = record.snapshot();
        let kind = record.kind();
        let mut report = WaveReport::default();
        if original == current {
            return Ok(report);
        }

        let mut writes: Vec<(Namespace, String, Value)> = Vec::new();
        let mut deletes: Vec<(Namespace, String)> = Vec::new();
        for namespace in original.properties.namespaces() {
            let (Some(before), Some(after)) = (
                original.properties.namespace(namespace),
                current.properties.namespace(namespace),
            ) else {
                continue;
            };
            for (key, value) in before {
                if namespace == Namespace::Core && key == keys::IDENTIFIER {
                    continue;
                }
                if after.get(key) != Some(value) {
                    writes.push((namespace, key.clone(), value.clone()));
                }
            }
            for key in after.keys().filter(|key| !before.contains_key(*key)) {
                deletes.push((namespace, key.clone()));
            }
        }
        writes.sort_by_key(|(namespace, key, _)| {
            !(*namespace == Namespace::Editable && key == keys::NAME)
        });

        debug!(
            "Resetting {}: {} writes, {} deletes",
            id,
            writes.len(),
            deletes.len()
        );
        for (namespace, key, value) in writes {
            let mut wave = PropagationWave::new();
            self.set_one(id, &key, value, namespace, &mut wave)?;
            report.merge(wave.finish());
        }
        for (namespace, key) in deletes {
            let mut wave = PropagationWave::new();
            self.graph.delete_property(id, &key, namespace, &mut wave)?;
            report.merge(wave.finish());
        }
        if kind.is_node() && current.geometry != original.geometry {
            if let Some(geometry) = original.geometry {
                let mut wave = PropagationWave::new();
                self.graph.set_coordinates(id, geometry, &mut wave)?;
                report.merge(wave.finish());
            }
        }
        Ok(report)
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn register_observer(
        &mut self,
        ids: &[RecordId],
        observer: Arc<dyn RecordObserver>,
    ) -> Result<()> {
        self.check_batch(ids)?;
        for id in ids {
            self.graph.register_observer(id, observer.clone())?;
        }
        Ok(())
    }

    /// Deregister `observer` from every record of the batch that still exists
    ///
    /// Returns how many registrations were removed.
    pub fn remove_observer(
        &mut self,
        ids: &[RecordId],
        observer: &Arc<dyn RecordObserver>,
    ) -> Result<usize> {
        if ids.is_empty() {
            return Err(GraphError::invalid_argument("at least one identifier is required"));
        }
        let mut removed = 0;
        for id in ids {
            if !self.graph.contains(id) {
                debug!("Record {} is gone, nothing to deregister", id);
                continue;
            }
            if self.graph.remove_observer(id, observer)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
