//! Shared fixtures for the integration tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use feederspace_core::{Controller, Coordinate, Geometry, GraphConfig, RecordDraft, RecordId};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness; `RUST_LOG=debug` shows propagation
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn controller() -> Result<Controller> {
    init_tracing();
    Ok(Controller::new(GraphConfig::default())?)
}

pub fn bus(name: &str, lon: f64, lat: f64) -> RecordDraft {
    RecordDraft::node([lon, lat])
        .with_property("name", name)
        .with_property("object", "bus")
}

pub fn meter(name: &str, parent: &str, lon: f64, lat: f64) -> RecordDraft {
    RecordDraft::node([lon, lat])
        .with_property("name", name)
        .with_property("object", "meter")
        .with_property("parent", parent)
}

pub fn line(name: &str, from: &str, to: &str) -> RecordDraft {
    RecordDraft::edge(from, to)
        .with_property("name", name)
        .with_property("object", "overhead_line")
}

/// Nodes `A` at (0, 0) and `B` at (10, 0) joined by line `E1`
///
/// Returns `[A, B, E1]`.
pub fn two_buses_and_a_line(controller: &mut Controller) -> Result<[RecordId; 3]> {
    let ids = controller.add_records(vec![
        bus("A", 0.0, 0.0),
        bus("B", 10.0, 0.0),
        line("E1", "A", "B"),
    ])?;
    Ok([ids[0].clone(), ids[1].clone(), ids[2].clone()])
}

pub fn endpoints(controller: &Controller, id: &RecordId) -> Result<(Coordinate, Coordinate)> {
    controller
        .graph()
        .record(id)?
        .geometry()
        .and_then(Geometry::endpoints)
        .ok_or_else(|| anyhow!("record {} is not drawn as a line", id))
}

pub fn text(controller: &Controller, id: &RecordId, key: &str) -> Result<Option<String>> {
    Ok(controller
        .graph()
        .record(id)?
        .text(key)
        .map(str::to_string))
}
