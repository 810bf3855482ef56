//! Graph Error Types
//!
//! Errors raised while inserting, resolving, propagating through and deleting
//! records. Most variants are recoverable answers to a bad request and leave
//! the graph untouched. A few indicate that the graph itself has become
//! inconsistent; see [`GraphError::is_fatal`].

use crate::models::{RecordError, RecordId};
use thiserror::Error;

/// Graph operation errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// A single record rejected the operation
    #[error(transparent)]
    Record(#[from] RecordError),

    /// A name used as a reference matches no record
    #[error("The record named '{name}' could not be found")]
    ReferenceNotFound { name: String },

    /// No record has this identifier
    #[error("Record not found: {id}")]
    RecordNotFound { id: RecordId },

    /// A value has the wrong type for its key
    #[error("Invalid value for property '{key}': {reason}")]
    InvalidPropertyValue { key: String, reason: String },

    /// A caller passed an argument that can never succeed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An explicit identifier is already taken
    #[error("Duplicate identifier: {id}")]
    DuplicateIdentifier { id: RecordId },

    /// A spatial record already has this name
    #[error("The name '{name}' is already taken by record {existing}")]
    DuplicateName { name: String, existing: RecordId },

    /// Two nodes are directly adjacent
    #[error("Records {a} and {b} are adjacent but neither is an edge")]
    NotAnEdge { a: RecordId, b: RecordId },

    /// An edge references the same vertex on both ends
    #[error("Record {id} cannot be linked to itself")]
    SelfLoop { id: RecordId },

    /// A reference matched several candidates where exactly one is required
    #[error("The name '{name}' matches {count} records")]
    AmbiguousReference { name: String, count: usize },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File system failure while reading or writing a document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub fn reference_not_found(name: impl Into<String>) -> Self {
        Self::ReferenceNotFound { name: name.into() }
    }

    pub fn record_not_found(id: &RecordId) -> Self {
        Self::RecordNotFound { id: id.clone() }
    }

    pub fn invalid_property_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPropertyValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn duplicate_identifier(id: &RecordId) -> Self {
        Self::DuplicateIdentifier { id: id.clone() }
    }

    pub fn duplicate_name(name: impl Into<String>, existing: &RecordId) -> Self {
        Self::DuplicateName {
            name: name.into(),
            existing: existing.clone(),
        }
    }

    pub fn not_an_edge(a: &RecordId, b: &RecordId) -> Self {
        Self::NotAnEdge {
            a: a.clone(),
            b: b.clone(),
        }
    }

    pub fn self_loop(id: &RecordId) -> Self {
        Self::SelfLoop { id: id.clone() }
    }

    pub fn ambiguous_reference(name: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousReference {
            name: name.into(),
            count,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the error reveals a corrupted graph rather than a bad request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GraphError::DuplicateIdentifier { .. }
                | GraphError::NotAnEdge { .. }
                | GraphError::SelfLoop { .. }
                | GraphError::Record(RecordError::NotConnected { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
