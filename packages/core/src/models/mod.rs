//! Data Models
//!
//! This module contains the data structures of a feeder model:
//!
//! - `Record` - One network element (node, edge, parent-child edge, configuration object)
//! - `RecordId` - Identifiers and their key namespaces
//! - `Properties` - The four fixed property namespaces of a record
//! - `Geometry` - Point / two-point line geometry
//! - `Validity` - Recoverable validation outcomes
//! - `RecordObserver` - External dependents of a record

mod geometry;
mod identifier;
mod observer;
pub mod properties;
mod record;
mod validity;

pub use geometry::{Coordinate, Geometry};
pub use identifier::{KeyNamespace, RecordId, PARENT_CHILD_PREFIX};
pub use observer::{EventLog, RecordEvent, RecordObserver};
pub use properties::{keys, Namespace, Properties, PropertyMap};
pub use record::{
    CoordinateResponse, Record, RecordDraft, RecordError, RecordKind, RecordSnapshot,
};
pub use validity::Validity;
