//! Hub elements mapped onto the CAD tree

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cadhub_automation::Color;

use crate::config::ConfigError;
use crate::parameter::{HubParameter, ParameterSet};

/// A hub element associated with a (possibly not yet existing) CAD element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedElement {
    /// Identifier of the element in the hub
    #[serde(default = "Uuid::new_v4")]
    pub iid: Uuid,
    /// Instance name in the CAD tree
    pub name: String,
    /// Instance name of the parent product; the tree root when unset
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub parameters: Vec<HubParameter>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub material: Option<String>,
}

impl MappedElement {
    /// Create an element with a fresh hub ID
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            iid: Uuid::new_v4(),
            name: name.into(),
            parent: None,
            parameters: Vec::new(),
            color: None,
            material: None,
        }
    }

    /// Set the parent element name
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Add a hub parameter
    pub fn with_parameter(mut self, parameter: HubParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Set the body color
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the material name
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    /// Decoded parameter snapshot
    pub fn parameter_set(&self) -> ParameterSet {
        ParameterSet::from_hub(&self.parameters)
    }
}

/// A list of mapped elements stored as RON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingFile {
    pub elements: Vec<MappedElement>,
}

impl MappingFile {
    /// Load a mapping file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        ron::from_str(&content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Save the mapping to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;

    #[test]
    fn test_parse_mapping() {
        let mapping: MappingFile = ron::from_str(
            r#"(
                elements: [
                    (
                        name: "Tank",
                        parent: Some("Chassis"),
                        parameters: [
                            (short_name: "kind", values: ["cylinder"]),
                            (short_name: "position", values: ["1", "2", "3"]),
                        ],
                        color: Some((r: 255, g: 0, b: 0)),
                    ),
                ],
            )"#,
        )
        .unwrap();

        let tank = &mapping.elements[0];
        assert_eq!(tank.parent.as_deref(), Some("Chassis"));
        assert_eq!(tank.color, Some(Color::new(255, 0, 0)));
        assert!(tank.material.is_none());
        let parameters = tank.parameter_set();
        assert_eq!(ShapeKind::from_parameters(&parameters), ShapeKind::Cylinder);
        assert_eq!(parameters.compound("position"), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.ron");
        let mapping = MappingFile {
            elements: vec![
                MappedElement::new("Tank")
                    .with_parameter(HubParameter::scalar("height", "888mm"))
                    .with_material("Steel"),
            ],
        };
        mapping.save(&path).unwrap();
        assert_eq!(MappingFile::load(&path).unwrap(), mapping);
    }
}
