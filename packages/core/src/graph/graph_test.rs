//! Tests for Graph insertion, lookup and name resolution
//!
//! Propagation through larger models is covered by the integration tests in
//! `tests/`; these tests pin down the single-record rules.

#[cfg(test)]
mod tests {
    use crate::config::GraphConfig;
    use crate::graph::{Graph, GraphError, PropagationWave};
    use crate::models::{
        Geometry, KeyNamespace, Namespace, RecordDraft, RecordError, RecordId, RecordKind,
    };
    use serde_json::json;

    fn bus(name: &str, x: f64, y: f64) -> RecordDraft {
        RecordDraft::node([x, y])
            .with_property("name", name)
            .with_property("object", "bus")
    }

    fn line(name: &str, from: &str, to: &str) -> RecordDraft {
        RecordDraft::edge(from, to)
            .with_property("name", name)
            .with_property("object", "overhead_line")
    }

    fn lenient() -> Graph {
        Graph::new(GraphConfig {
            unique_spatial_names: false,
            ..Default::default()
        })
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    #[test]
    fn test_identifiers_are_assigned_sequentially() {
        let mut graph = Graph::default();
        let a = graph.insert(bus("A", 0.0, 0.0)).unwrap();
        let b = graph.insert(bus("B", 1.0, 0.0)).unwrap();
        assert_eq!(a, RecordId::ordinary(1));
        assert_eq!(b, RecordId::ordinary(2));
        assert_eq!(graph.max_identifier(&KeyNamespace::Ordinary), 2);
        assert_eq!(graph.max_identifier(&KeyNamespace::ParentChild), 0);
    }

    #[test]
    fn test_max_identifier_follows_deletions() {
        let mut graph = Graph::default();
        let a = graph.insert(bus("A", 0.0, 0.0)).unwrap();
        graph
            .insert(bus("B", 1.0, 0.0).with_identifier(RecordId::ordinary(7)))
            .unwrap();
        graph
            .insert(bus("C", 2.0, 0.0).with_identifier(RecordId::from("modal:3")))
            .unwrap();
        assert_eq!(graph.max_identifier(&KeyNamespace::Ordinary), 7);

        graph
            .delete(&RecordId::ordinary(7), &mut PropagationWave::new())
            .unwrap();
        assert_eq!(graph.max_identifier(&KeyNamespace::Ordinary), 1);
        let d = graph.insert(bus("D", 3.0, 0.0)).unwrap();
        assert_eq!(d, RecordId::ordinary(2));

        let order: Vec<&RecordId> = graph.records().map(|record| record.id()).collect();
        assert_eq!(order, vec![&a, &RecordId::from("modal:3"), &d]);
    }

    #[test]
    fn test_explicit_identifier_is_kept_and_checked() {
        let mut graph = Graph::default();
        graph
            .insert(bus("A", 0.0, 0.0).with_identifier(RecordId::ordinary(10)))
            .unwrap();
        let next = graph.insert(bus("B", 0.0, 0.0)).unwrap();
        assert_eq!(next, RecordId::ordinary(11));

        let result = graph.insert(bus("C", 0.0, 0.0).with_identifier(RecordId::ordinary(10)));
        let err = result.unwrap_err();
        assert!(matches!(err, GraphError::DuplicateIdentifier { .. }));
        assert!(err.is_fatal());
        assert_eq!(graph.len(), 2);
    }

    // ========================================================================
    // Insertion checks
    // ========================================================================

    #[test]
    fn test_edge_endpoints_must_exist() {
        let mut graph = Graph::default();
        graph.insert(bus("A", 0.0, 0.0)).unwrap();
        let result = graph.insert(line("L", "A", "missing"));
        assert!(matches!(result, Err(GraphError::ReferenceNotFound { ref name }) if name == "missing"));
        assert_eq!(graph.len(), 1);
        assert!(graph.ids_named("L").is_empty());
    }

    #[test]
    fn test_edge_is_linked_to_both_endpoints() {
        let mut graph = Graph::default();
        let a = graph.insert(bus("A", 0.0, 0.0)).unwrap();
        let b = graph.insert(bus("B", 2.0, 0.0)).unwrap();
        let l = graph.insert(line("L", "A", "B")).unwrap();

        assert_eq!(graph.record(&l).unwrap().kind(), RecordKind::Edge);
        assert_eq!(graph.neighbors(&l), vec![a.clone(), b.clone()]);
        assert_eq!(graph.neighbors(&a), vec![l.clone()]);
        assert_eq!(graph.edge_geometry(&l).unwrap(), Geometry::line([0.0, 0.0], [2.0, 0.0]));
    }

    #[test]
    fn test_looped_edge_has_two_links() {
        let mut graph = Graph::default();
        let a = graph.insert(bus("A", 0.0, 0.0)).unwrap();
        let l = graph.insert(line("L", "A", "A")).unwrap();
        assert_eq!(graph.neighbors(&l), vec![a.clone(), a.clone()]);
        assert_eq!(graph.adjacency().degree(&a), 2);
    }

    #[test]
    fn test_duplicate_spatial_name_rejected() {
        let mut graph = Graph::default();
        graph.insert(bus("A", 0.0, 0.0)).unwrap();
        let result = graph.insert(bus("A", 1.0, 1.0));
        assert!(matches!(result, Err(GraphError::DuplicateName { .. })));

        // configuration objects may share names with anything
        graph
            .insert(RecordDraft::configuration().with_property("name", "A"))
            .unwrap();
        assert_eq!(graph.ids_named("A").len(), 2);
    }

    #[test]
    fn test_spatial_records_need_a_name() {
        let mut graph = Graph::default();
        let result = graph.insert(RecordDraft::node([0.0, 0.0]).with_property("object", "meter"));
        assert!(matches!(result, Err(GraphError::InvalidPropertyValue { .. })));
    }

    #[test]
    fn test_geometry_shape_checked_on_insert() {
        let mut graph = Graph::default();
        let draft = bus("A", 0.0, 0.0).with_geometry(Some(Geometry::LineString(vec![[0.0, 0.0]])));
        let result = graph.insert(draft);
        assert!(matches!(
            result,
            Err(GraphError::Record(RecordError::InvalidGeometry { .. }))
        ));
    }

    // ========================================================================
    // Name synthesis
    // ========================================================================

    #[test]
    fn test_unnamed_recorder_gets_synthesized_name() {
        let mut graph = Graph::default();
        let id = graph
            .insert(RecordDraft::node([0.0, 0.0]).with_property("object", "recorder"))
            .unwrap();
        let record = graph.record(&id).unwrap();
        assert_eq!(record.name(), Some("recorder:1:addedName"));
        assert_eq!(graph.ids_named("recorder:1:addedName"), &[id.clone()]);
    }

    #[test]
    fn test_command_name_moves_to_command_property() {
        let mut graph = Graph::default();
        let id = graph
            .insert(
                RecordDraft::configuration()
                    .with_property("object", "!CMD")
                    .with_property("name", "purge_model"),
            )
            .unwrap();
        let record = graph.record(&id).unwrap();
        assert_eq!(record.name(), Some("!CMD:1:addedName"));
        assert_eq!(record.text("CMD_command"), Some("purge_model"));
        // the snapshot is taken after synthesis
        assert_eq!(
            record.original().properties.text("CMD_command", Namespace::Editable),
            Some("purge_model")
        );
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    #[test]
    fn test_resolve_single_candidate() {
        let mut graph = Graph::default();
        let a = graph.insert(bus("A", 0.0, 0.0)).unwrap();
        assert_eq!(graph.resolve_key("A", &a).unwrap(), a);
        assert!(matches!(
            graph.resolve_key("nope", &a),
            Err(GraphError::ReferenceNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_prefers_bus_among_nodes() {
        let mut graph = lenient();
        graph
            .insert(
                RecordDraft::node([0.0, 0.0])
                    .with_property("name", "feeder")
                    .with_property("object", "circuit"),
            )
            .unwrap();
        let bus_id = graph.insert(bus("feeder", 1.0, 1.0)).unwrap();
        let asker = graph.insert(bus("other", 2.0, 2.0)).unwrap();

        assert_eq!(graph.resolve_key("feeder", &asker).unwrap(), bus_id);
    }

    #[test]
    fn test_resolve_recorder_prefers_line() {
        let mut graph = lenient();
        graph.insert(bus("A", 0.0, 0.0)).unwrap();
        graph.insert(bus("B", 1.0, 0.0)).unwrap();
        graph.insert(bus("tap", 0.5, 0.5)).unwrap();
        let edge = graph.insert(line("tap", "A", "B")).unwrap();
        let recorder = graph
            .insert(
                RecordDraft::node([0.2, 0.2])
                    .with_property("object", "recorder")
                    .with_property("parent", "tap"),
            )
            .unwrap();
        let meter = graph
            .insert(
                RecordDraft::node([0.3, 0.3])
                    .with_property("name", "m1")
                    .with_property("object", "meter"),
            )
            .unwrap();

        assert_eq!(graph.resolve_key("tap", &recorder).unwrap(), edge);
        let node = graph.resolve_key("tap", &meter).unwrap();
        assert_eq!(graph.record(&node).unwrap().kind(), RecordKind::Node);
    }

    #[test]
    fn test_resolve_falls_back_to_first_node() {
        let mut graph = lenient();
        let first = graph
            .insert(
                RecordDraft::node([0.0, 0.0])
                    .with_property("name", "dup")
                    .with_property("object", "meter"),
            )
            .unwrap();
        graph
            .insert(
                RecordDraft::node([1.0, 0.0])
                    .with_property("name", "dup")
                    .with_property("object", "meter"),
            )
            .unwrap();
        assert_eq!(graph.resolve_key("dup", &first).unwrap(), first);
    }

    // ========================================================================
    // Parent-child edges
    // ========================================================================

    #[test]
    fn test_parent_child_draft() {
        let mut graph = Graph::default();
        let a = graph.insert(bus("A", 0.0, 0.0)).unwrap();
        let c = graph
            .insert(
                RecordDraft::node([4.0, 2.0])
                    .with_property("name", "C")
                    .with_property("object", "meter")
                    .with_property("parent", "A"),
            )
            .unwrap();

        let draft = graph.parent_child_draft(&a, &c).unwrap();
        assert_eq!(draft.kind(), RecordKind::ParentChildEdge);
        assert_eq!(draft.text("from"), Some("A"));
        assert_eq!(draft.text("to"), Some("C"));
        assert_eq!(draft.text("name"), Some("parentChild:1"));
        assert_eq!(draft.text("type"), Some("parentChild"));
        assert_eq!(draft.properties().get("phases", Namespace::Editable), Some(&json!(1)));

        let pc = graph.insert(draft).unwrap();
        assert_eq!(pc, RecordId::parent_child(1));
        assert_eq!(graph.parent_child_edge_of(&c).unwrap(), Some(pc.clone()));
        assert_eq!(graph.parent_child_edge_of(&a).unwrap(), None);
        // ordinary identifiers are unaffected by the parent-child namespace
        assert_eq!(graph.max_identifier(&KeyNamespace::Ordinary), 2);
    }

    #[test]
    fn test_parent_child_edge_of_child_of_target_rejected() {
        let mut graph = Graph::default();
        let a = graph.insert(bus("A", 0.0, 0.0)).unwrap();
        let c = graph
            .insert(
                RecordDraft::node([1.0, 1.0])
                    .with_property("name", "C")
                    .with_property("parent", "A"),
            )
            .unwrap();
        // drawn backwards: from the child to its own parent
        let backwards = graph.parent_child_draft(&c, &a).unwrap();
        let err = graph.insert(backwards).unwrap_err();
        assert!(matches!(err, GraphError::Record(RecordError::NotConnected { .. })));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_child_of_line_attaches_at_midpoint() {
        let mut graph = Graph::default();
        graph.insert(bus("A", 0.0, 0.0)).unwrap();
        graph.insert(bus("B", 4.0, 0.0)).unwrap();
        let l = graph.insert(line("L", "A", "B")).unwrap();
        let mut wave = PropagationWave::new();
        graph.redraw_edge(&l, &mut wave).unwrap();

        assert_eq!(graph.position_of(&l).unwrap(), [2.0, 0.0]);
        let rec = graph
            .insert(
                RecordDraft::node([2.0, 1.0])
                    .with_property("object", "recorder")
                    .with_property("parent", "L"),
            )
            .unwrap();
        let (source, target) = graph.line_endpoints(&l, &rec).unwrap();
        assert_eq!(source, [2.0, 0.0]);
        assert_eq!(target, [2.0, 1.0]);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[test]
    fn test_records_matching_keeps_insertion_order() {
        let mut graph = Graph::default();
        graph.insert(bus("A", 0.0, 0.0)).unwrap();
        graph
            .insert(RecordDraft::configuration().with_property("object", "clock"))
            .unwrap();
        graph.insert(bus("B", 0.0, 0.0)).unwrap();

        let buses: Vec<&str> = graph
            .records_matching(|r| r.object() == Some("bus"))
            .iter()
            .filter_map(|r| r.name())
            .collect();
        assert_eq!(buses, vec!["A", "B"]);
        assert_eq!(graph.records().count(), 3);
    }
}
