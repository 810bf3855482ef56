//! Change propagation
//!
//! Every mutation that can affect other records goes through the graph, which
//! applies it to the record and then walks the affected records:
//!
//! - **property change** - a rename rewrites every `from`/`to`/`parent` that
//!   held the old name; a `from`/`to`/`parent` change moves the matching link
//! - **coordinate change** - adjacent edges that name the moved record redraw
//!   themselves from their endpoints, which moves them in turn
//! - **deletion** - a node takes its edges with it, a parent-child edge takes
//!   its child, an ordinary edge takes edges attached to it
//!
//! Each record is acted on at most once per [`PropagationWave`]. Errors abort
//! the whole wave; they are never swallowed per neighbor.

use super::{Graph, GraphError, PropagationWave, Result};
use crate::models::{keys, CoordinateResponse, Geometry, Namespace, RecordError, RecordId, RecordKind};
use serde_json::Value;
use tracing::{debug, trace};

impl Graph {
    // ========================================================================
    // Properties
    // ========================================================================

    /// Create or replace a property and propagate the change
    ///
    /// Returns the previous value. References (`from`, `to`, `parent`) must
    /// resolve and names must be free before anything is written.
    pub fn set_property(
        &mut self,
        id: &RecordId,
        key: &str,
        value: Value,
        namespace: Namespace,
        wave: &mut PropagationWave,
    ) -> Result<Option<Value>> {
        self.check_property_write(id, key, &value, namespace)?;
        let old_value = self.record_mut(id)?.set_property(key, value, namespace)?;
        self.on_property_changed(id, key, old_value.as_ref(), namespace, wave)?;
        Ok(old_value)
    }

    /// Remove a property and propagate the change
    ///
    /// Properties that hold the graph together cannot be deleted: a spatial
    /// record's name, an edge's `from`/`to` and the `parent` of an attached
    /// child.
    pub fn delete_property(
        &mut self,
        id: &RecordId,
        key: &str,
        namespace: Namespace,
        wave: &mut PropagationWave,
    ) -> Result<Value> {
        self.check_property_delete(id, key, namespace)?;
        let old_value = self.record_mut(id)?.delete_property(key, namespace)?;
        self.on_property_changed(id, key, Some(&old_value), namespace, wave)?;
        Ok(old_value)
    }

    fn check_property_write(
        &self,
        id: &RecordId,
        key: &str,
        value: &Value,
        namespace: Namespace,
    ) -> Result<()> {
        let record = self.record(id)?;
        if namespace != Namespace::Editable {
            return Ok(());
        }
        let kind = record.kind();
        match key {
            keys::NAME => {
                let name = value
                    .as_str()
                    .ok_or_else(|| GraphError::invalid_property_value(key, "names must be strings"))?;
                if kind.is_spatial() {
                    self.check_name_available(name, Some(id))?;
                }
            }
            keys::FROM | keys::TO | keys::PARENT => {
                let name = value.as_str().ok_or_else(|| {
                    GraphError::invalid_property_value(key, "references must be names")
                })?;
                if kind.is_node() && key != keys::PARENT {
                    let other = if key == keys::FROM { keys::TO } else { keys::FROM };
                    if record.has_property(other, Namespace::Editable) {
                        return Err(GraphError::invalid_property_value(
                            key,
                            format!("setting '{}' would turn node {} into an edge", key, id),
                        ));
                    }
                } else if kind.is_spatial() {
                    let target = self.resolve_for(name, self.asker_object(record, key))?;
                    if &target == id {
                        return Err(GraphError::self_loop(id));
                    }
                    // A parent-child edge always runs parent → child
                    let target_parent = self.record(&target)?.text(keys::PARENT);
                    if key == keys::PARENT && target_parent.is_some() && target_parent == record.name() {
                        return Err(GraphError::invalid_property_value(
                            key,
                            format!("'{}' is a child of record {}", name, id),
                        ));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn check_property_delete(&self, id: &RecordId, key: &str, namespace: Namespace) -> Result<()> {
        let record = self.record(id)?;
        if namespace != Namespace::Editable {
            return Ok(());
        }
        let kind = record.kind();
        let protected = match key {
            keys::NAME => kind.is_spatial(),
            keys::FROM | keys::TO => kind.is_edge_like(),
            keys::PARENT => self.parent_child_edge_of(id)?.is_some(),
            _ => false,
        };
        if protected {
            return Err(RecordError::protected_property(id, key).into());
        }
        Ok(())
    }

    fn on_property_changed(
        &mut self,
        id: &RecordId,
        key: &str,
        old_value: Option<&Value>,
        namespace: Namespace,
        wave: &mut PropagationWave,
    ) -> Result<()> {
        wave.visit(id);
        if namespace != Namespace::Editable {
            return Ok(());
        }
        match key {
            keys::NAME => self.on_renamed(id, old_value, wave),
            keys::FROM | keys::TO => self.rewire_endpoint(id, key, old_value),
            keys::PARENT => self.rewire_parent(id, old_value, wave),
            _ => Ok(()),
        }
    }

    /// Reindex the name and rewrite every reference to the old one
    fn on_renamed(
        &mut self,
        id: &RecordId,
        old_value: Option<&Value>,
        wave: &mut PropagationWave,
    ) -> Result<()> {
        let old_name = old_value.and_then(Value::as_str);
        let new_name = self.record(id)?.name().map(str::to_string);
        if let Some(old_name) = old_name {
            self.unindex_name(old_name, id);
        }
        if let Some(new_name) = &new_name {
            self.index_name(new_name, id);
        }
        debug!("Renamed record {} from {:?} to {:?}", id, old_name, new_name);

        let renamed = self.record(id)?;
        let rewrites: Vec<(RecordId, &'static str, Value)> = self
            .records()
            .flat_map(|other| {
                other
                    .handle_updated_property(renamed, keys::NAME, old_value)
                    .into_iter()
                    .map(|(key, value)| (other.id().clone(), key, value))
            })
            .collect();

        for (target, key, value) in rewrites {
            trace!("Rewriting {}.{} after rename of {}", target, key, id);
            self.set_property(&target, key, value, Namespace::Editable, wave)?;
        }
        Ok(())
    }

    /// Move the link of an edge's `from` or `to` to the newly named vertex
    ///
    /// Only the first link whose far end carries the old name moves, so a
    /// looped edge (`from == to`) keeps its other link.
    fn rewire_endpoint(&mut self, id: &RecordId, key: &str, old_value: Option<&Value>) -> Result<()> {
        let record = self.record(id)?;
        if !record.kind().is_edge_like() {
            return Ok(());
        }
        let (Some(old_name), Some(new_name)) = (old_value.and_then(Value::as_str), record.text(key))
        else {
            return Ok(());
        };
        let target = self.resolve_for(new_name, self.asker_object(record, key))?;

        let link = self.adjacency.links_of(id).into_iter().find(|link| {
            self.adjacency
                .opposite(id, *link)
                .and_then(|far| self.records.get(far))
                .and_then(|far| far.name())
                == Some(old_name)
        });
        if let Some(link) = link {
            self.adjacency.unlink(link);
            self.adjacency.link(id, &target)?;
            trace!("Rewired {}.{} to {}", id, key, target);
        }
        Ok(())
    }

    /// Reattach a child's parent-child edge after its `parent` changed
    fn rewire_parent(
        &mut self,
        child_id: &RecordId,
        old_value: Option<&Value>,
        wave: &mut PropagationWave,
    ) -> Result<()> {
        let child = self.record(child_id)?;
        if !child.kind().is_spatial() {
            return Ok(());
        }
        let (Some(old_name), Some(new_name)) =
            (old_value.and_then(Value::as_str), child.text(keys::PARENT))
        else {
            return Ok(());
        };
        let new_name = new_name.to_string();
        let Some(edge_id) = self.parent_child_edge_of(child_id)? else {
            return Ok(());
        };

        let edge = self.record(&edge_id)?;
        let stale: Vec<&'static str> = [keys::FROM, keys::TO]
            .into_iter()
            .filter(|key| edge.text(key) == Some(old_name))
            .collect();
        for key in stale {
            self.set_property(&edge_id, key, Value::String(new_name.clone()), Namespace::Editable, wave)?;
        }
        Ok(())
    }

    // ========================================================================
    // Coordinates
    // ========================================================================

    /// Replace a record's geometry and redraw the edges that follow it
    ///
    /// Returns the previous geometry.
    pub fn set_coordinates(
        &mut self,
        id: &RecordId,
        geometry: Geometry,
        wave: &mut PropagationWave,
    ) -> Result<Option<Geometry>> {
        let old_geometry = self.record_mut(id)?.set_coordinates(geometry)?;
        self.on_coordinates_changed(id, wave)?;
        Ok(old_geometry)
    }

    /// Recompute an edge's two points from where its endpoints are now
    pub fn redraw_edge(&mut self, edge_id: &RecordId, wave: &mut PropagationWave) -> Result<()> {
        let geometry = self.edge_geometry(edge_id)?;
        self.set_coordinates(edge_id, geometry, wave)?;
        Ok(())
    }

    fn on_coordinates_changed(&mut self, id: &RecordId, wave: &mut PropagationWave) -> Result<()> {
        wave.visit(id);
        for neighbor_id in self.adjacency.neighbors(id) {
            if wave.is_visited(&neighbor_id) {
                continue;
            }
            let moved = self.record(id)?;
            let neighbor = self.record(&neighbor_id)?;
            if moved.kind().is_node() && neighbor.kind().is_node() {
                return Err(GraphError::not_an_edge(id, &neighbor_id));
            }
            if !neighbor.kind().is_edge_like() {
                continue;
            }
            match neighbor.handle_updated_coordinates(moved)? {
                CoordinateResponse::Redraw => self.redraw_edge(&neighbor_id, wave)?,
                CoordinateResponse::Ignore => {}
            }
        }
        Ok(())
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Delete a record and everything that cannot exist without it
    ///
    /// - node: every adjacent edge
    /// - parent-child edge: the child it points at
    /// - ordinary edge: every adjacent edge, including edges that merely
    ///   start or end on it
    pub fn delete(&mut self, id: &RecordId, wave: &mut PropagationWave) -> Result<()> {
        let record = self.record(id)?;
        record.notify_deleted();
        let kind = record.kind();
        let child_name = record.text(keys::TO).map(str::to_string);
        wave.visit(id);

        for neighbor_id in self.adjacency.neighbors(id) {
            if wave.is_visited(&neighbor_id) {
                continue;
            }
            let Some(neighbor) = self.records.get(&neighbor_id) else {
                continue;
            };
            let cascade = match kind {
                RecordKind::Node => {
                    if neighbor.kind().is_node() {
                        return Err(GraphError::not_an_edge(id, &neighbor_id));
                    }
                    neighbor.kind().is_edge_like()
                }
                RecordKind::ParentChildEdge => {
                    child_name.is_some() && neighbor.name() == child_name.as_deref()
                }
                RecordKind::Edge => neighbor.kind().is_edge_like(),
                RecordKind::Configuration => false,
            };
            if cascade {
                trace!("Deleting {} takes {} with it", id, neighbor_id);
                self.delete(&neighbor_id, wave)?;
            }
        }

        self.detach(id);
        Ok(())
    }
}
