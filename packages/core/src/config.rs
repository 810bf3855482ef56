/// Configuration for the consistency engine
use crate::models::Validity;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Suffix of names the engine synthesizes for unnamed records
pub const ADDED_NAME_SUFFIX: &str = "addedName";

/// Feeder-model conventions the graph and controller follow
///
/// The defaults describe GridLAB-D style models; every field can be
/// overridden from a JSON file with [`GraphConfig::from_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Object types that resolve an ambiguous name to a same-named line first
    pub line_preferring_objects: Vec<String>,

    /// Object type preferred when a name matches several nodes
    pub primary_node_object: String,

    /// Object types that get `<object>:<id>:addedName` when unnamed
    pub name_synthesized_objects: Vec<String>,

    /// Object type whose `name` holds a command rather than a name
    pub command_object: String,

    /// Property the command text is moved to for `command_object` records
    pub command_property: String,

    /// `object` of synthesized parent-child edges
    pub parent_child_object: String,

    /// `type` of synthesized parent-child edges
    pub parent_child_type: String,

    /// `phases` of synthesized parent-child edges
    pub parent_child_phases: u32,

    /// Reject a new or renamed spatial record whose name is already taken
    pub unique_spatial_names: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            line_preferring_objects: vec!["recorder".to_string()],
            primary_node_object: "bus".to_string(),
            name_synthesized_objects: vec!["recorder".to_string(), "player".to_string()],
            command_object: "!CMD".to_string(),
            command_property: "CMD_command".to_string(),
            parent_child_object: "line".to_string(),
            parent_child_type: "parentChild".to_string(),
            parent_child_phases: 1,
            unique_spatial_names: true,
        }
    }
}

impl GraphConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph config {:?}", path))?;
        let config: GraphConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse graph config {:?}", path))?;
        config
            .validate()
            .into_result(|reason| anyhow::anyhow!("Invalid graph config {:?}: {}", path, reason))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Validity {
        if self.primary_node_object.is_empty() {
            return Validity::invalid("primaryNodeObject cannot be empty");
        }
        if self.parent_child_object.is_empty() || self.parent_child_type.is_empty() {
            return Validity::invalid("parent-child object and type cannot be empty");
        }
        if self.parent_child_phases == 0 {
            return Validity::invalid("parentChildPhases must be greater than 0");
        }
        if self.command_object.is_empty() != self.command_property.is_empty() {
            return Validity::invalid("commandObject and commandProperty must be set together");
        }
        if self.name_synthesized_objects.iter().any(String::is_empty) {
            return Validity::invalid("nameSynthesizedObjects cannot contain an empty object");
        }
        Validity::valid()
    }

    pub fn prefers_line(&self, object: Option<&str>) -> bool {
        object.is_some_and(|object| self.line_preferring_objects.iter().any(|o| o == object))
    }

    pub fn synthesizes_name(&self, object: Option<&str>) -> bool {
        object.is_some_and(|object| self.name_synthesized_objects.iter().any(|o| o == object))
    }

    pub fn is_command(&self, object: Option<&str>) -> bool {
        !self.command_object.is_empty() && object == Some(self.command_object.as_str())
    }
}
