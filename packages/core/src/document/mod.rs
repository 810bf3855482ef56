//! Model Documents
//!
//! A [`ModelDocument`] is the persisted and exchanged form of a feeder model:
//! a GeoJSON-style `FeatureCollection` whose features carry namespaced
//! properties.
//!
//! ```json
//! {
//!   "type": "FeatureCollection",
//!   "features": [{
//!     "type": "Feature",
//!     "geometry": {"type": "Point", "coordinates": [-80.1, 35.2]},
//!     "properties": {
//!       "core": {"identifier": "1"},
//!       "editable": {"name": "bus_1", "object": "bus"}
//!     }
//!   }]
//! }
//! ```
//!
//! Export keeps only records with ordinary numeric identifiers (synthesized
//! parent-child edges are rebuilt on load) and reverses name synthesis, so a
//! load → export round trip reproduces the input.

use crate::config::{GraphConfig, ADDED_NAME_SUFFIX};
use crate::graph::{Graph, GraphError, Result};
use crate::models::{keys, Geometry, Namespace, Properties, PropertyMap, Record, RecordDraft, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

const FEATURE_COLLECTION: &str = "FeatureCollection";
const FEATURE: &str = "Feature";

fn feature_collection() -> String {
    FEATURE_COLLECTION.to_string()
}

fn feature() -> String {
    FEATURE.to_string()
}

/// A whole model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(rename = "type", default = "feature_collection")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Element>,
}

impl Default for ModelDocument {
    fn default() -> Self {
        Self {
            kind: feature_collection(),
            features: Vec::new(),
        }
    }
}

/// One record of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type", default = "feature")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: ElementProperties,
}

/// Namespaced properties of one element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementProperties {
    #[serde(default)]
    pub core: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_inputs: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_endpoints: Option<PropertyMap>,
}

impl ElementProperties {
    fn slot(&self, namespace: Namespace) -> Option<&PropertyMap> {
        match namespace {
            Namespace::Core => Some(&self.core),
            Namespace::Editable => self.editable.as_ref(),
            Namespace::FormInputs => self.form_inputs.as_ref(),
            Namespace::UrlEndpoints => self.url_endpoints.as_ref(),
        }
    }

    fn to_properties(&self) -> Properties {
        let mut properties = Properties::core_only();
        for namespace in Namespace::ALL {
            if let Some(map) = self.slot(namespace) {
                properties.ensure_namespace(namespace).extend(map.clone());
            }
        }
        properties
    }

    fn from_properties(properties: &Properties) -> Self {
        let mut element = ElementProperties::default();
        for namespace in properties.namespaces() {
            let Some(map) = properties.namespace(namespace) else {
                continue;
            };
            match namespace {
                Namespace::Core => element.core = map.clone(),
                Namespace::Editable => element.editable = Some(map.clone()),
                Namespace::FormInputs => element.form_inputs = Some(map.clone()),
                Namespace::UrlEndpoints => element.url_endpoints = Some(map.clone()),
            }
        }
        element
    }
}

impl Element {
    /// Identifier stored in `core.identifier`, if any
    pub fn identifier(&self) -> Option<RecordId> {
        self.properties
            .core
            .get(keys::IDENTIFIER)
            .and_then(|value| match value {
                Value::String(s) => Some(RecordId::from(s.as_str())),
                Value::Number(n) => Some(RecordId::from(n.to_string())),
                _ => None,
            })
    }

    /// Draft that restores this element, keeping its identifier
    pub fn to_draft(&self) -> RecordDraft {
        let draft = RecordDraft::default()
            .with_geometry(self.geometry.clone())
            .with_properties(self.properties.to_properties());
        match self.identifier() {
            Some(id) => draft.with_identifier(id),
            None => draft,
        }
    }

    /// Export form of a record, with name synthesis reversed
    pub fn from_record(record: &Record, config: &GraphConfig) -> Self {
        let mut properties = ElementProperties::from_properties(record.properties());
        if let Some(editable) = properties.editable.as_mut() {
            unsynthesize_name(record, editable, config);
        }
        Element {
            kind: feature(),
            geometry: record.geometry().cloned(),
            properties,
        }
    }
}

fn unsynthesize_name(record: &Record, editable: &mut PropertyMap, config: &GraphConfig) {
    let synthesized = format!(
        "{}:{}:{}",
        record.object().unwrap_or_default(),
        record.id(),
        ADDED_NAME_SUFFIX
    );
    if config.is_command(record.object()) {
        if let Some(command) = editable.remove(&config.command_property) {
            editable.insert(keys::NAME.to_string(), command);
        } else if record.name() == Some(synthesized.as_str()) {
            editable.remove(keys::NAME);
        }
    } else if config.synthesizes_name(record.object()) && record.name() == Some(synthesized.as_str())
    {
        editable.remove(keys::NAME);
    }
}

impl ModelDocument {
    pub fn new(features: Vec<Element>) -> Self {
        Self {
            features,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_drafts(&self) -> Vec<RecordDraft> {
        self.features.iter().map(Element::to_draft).collect()
    }

    /// Export every record with an ordinary identifier, in identifier order
    pub fn from_graph(graph: &Graph) -> Self {
        let mut exported: Vec<&Record> = graph
            .records()
            .filter(|record| record.id().is_ordinary())
            .collect();
        exported.sort_by_key(|record| record.id().ordinal());
        let features = exported
            .into_iter()
            .map(|record| Element::from_record(record, graph.config()))
            .collect();
        Self::new(features)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: ModelDocument = serde_json::from_str(json)?;
        document.check_kind()?;
        Ok(document)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json_string()?)?;
        Ok(())
    }

    fn check_kind(&self) -> Result<()> {
        if self.kind != FEATURE_COLLECTION {
            return Err(GraphError::invalid_argument(format!(
                "expected a {} document, got '{}'",
                FEATURE_COLLECTION, self.kind
            )));
        }
        Ok(())
    }
}
