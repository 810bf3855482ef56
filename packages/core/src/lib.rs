//! FeederSpace Core
//!
//! Consistency engine for interactive editing of electrical feeder models.
//! Every network element (bus, meter, line, switch, recorder, configuration
//! object…) is stored as an observable record in a graph that propagates
//! edits to dependent records and keeps references intact.
//!
//! # Architecture
//!
//! - **Records**: namespaced properties plus optional point/line geometry; the
//!   kind (node, edge, parent-child edge, configuration) is derived, never stored
//! - **Graph**: owns the records, a name index and an undirected multigraph;
//!   implements rename propagation, edge redraws and cascading deletes
//! - **Propagation waves**: one wave per user action, so each record is acted
//!   on at most once and cycles terminate
//! - **Controller**: the single mutation entry point, working in batches
//!
//! # Modules
//!
//! - [`models`] - Records, identifiers, properties, geometry, observers
//! - [`graph`] - Graph store, adjacency, propagation and errors
//! - [`services`] - The batch `Controller`
//! - [`document`] - Persisted `FeatureCollection` documents
//! - [`config`] - Naming and tie-break conventions

pub mod config;
pub mod document;
pub mod graph;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::GraphConfig;
pub use document::{Element, ModelDocument};
pub use graph::{Graph, GraphError, PropagationWave, WaveReport};
pub use models::*;
pub use services::*;
