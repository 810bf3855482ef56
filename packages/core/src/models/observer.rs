//! Record Observers
//!
//! External dependents (map layers, tables, modal views) watch records through
//! the [`RecordObserver`] trait. Observers are notified after every change a
//! record accepts:
//!
//! 1. `handle_updated_property` - a property was created, changed or deleted
//! 2. `handle_updated_coordinates` - the geometry was replaced
//! 3. `handle_deleted_observable` - the record is about to leave the graph
//!
//! Record-to-record dependencies never go through this trait; the graph
//! mediates them. `Record` deliberately does not implement `RecordObserver`,
//! so a record can never be registered as an observer of another record.
//!
//! An observer must call `remove_observer` before it is discarded. Removing an
//! observer that is no longer registered is tolerated.

use crate::models::{Geometry, Namespace, Record, RecordId};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

/// Dependent of a record, notified synchronously on every change
pub trait RecordObserver: Send + Sync {
    /// The observed record is being deleted
    fn handle_deleted_observable(&self, observable: &Record);

    /// The observed record's geometry changed from `old_geometry`
    fn handle_updated_coordinates(&self, observable: &Record, old_geometry: Option<&Geometry>);

    /// A property of the observed record changed
    ///
    /// `old_value` is `None` when the property was just created.
    fn handle_updated_property(
        &self,
        observable: &Record,
        key: &str,
        old_value: Option<&Value>,
        namespace: Namespace,
    );
}

/// One observed change, as captured by [`EventLog`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    /// A record was deleted
    Deleted { id: RecordId },

    /// A record's geometry changed
    CoordinatesUpdated {
        id: RecordId,
        old: Option<Geometry>,
        new: Option<Geometry>,
    },

    /// A record's property changed
    PropertyUpdated {
        id: RecordId,
        key: String,
        old: Option<Value>,
        new: Option<Value>,
        namespace: Namespace,
    },
}

impl RecordEvent {
    pub fn event_type(&self) -> &str {
        match self {
            RecordEvent::Deleted { .. } => "record:deleted",
            RecordEvent::CoordinatesUpdated { .. } => "record:coordinates",
            RecordEvent::PropertyUpdated { .. } => "record:property",
        }
    }

    pub fn record_id(&self) -> &RecordId {
        match self {
            RecordEvent::Deleted { id }
            | RecordEvent::CoordinatesUpdated { id, .. }
            | RecordEvent::PropertyUpdated { id, .. } => id,
        }
    }
}

/// Observer that appends every notification to an in-memory log
///
/// Useful as a view adapter stand-in and for asserting propagation order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<RecordEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events captured so far
    pub fn events(&self) -> Vec<RecordEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the captured events
    pub fn take(&self) -> Vec<RecordEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, event: RecordEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl RecordObserver for EventLog {
    fn handle_deleted_observable(&self, observable: &Record) {
        self.push(RecordEvent::Deleted {
            id: observable.id().clone(),
        });
    }

    fn handle_updated_coordinates(&self, observable: &Record, old_geometry: Option<&Geometry>) {
        self.push(RecordEvent::CoordinatesUpdated {
            id: observable.id().clone(),
            old: old_geometry.cloned(),
            new: observable.geometry().cloned(),
        });
    }

    fn handle_updated_property(
        &self,
        observable: &Record,
        key: &str,
        old_value: Option<&Value>,
        namespace: Namespace,
    ) {
        self.push(RecordEvent::PropertyUpdated {
            id: observable.id().clone(),
            key: key.to_string(),
            old: old_value.cloned(),
            new: observable.properties().get(key, namespace).cloned(),
            namespace,
        });
    }
}
