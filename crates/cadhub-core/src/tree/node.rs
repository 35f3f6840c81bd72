//! Mirror tree node types

use std::path::Path;

use serde::{Deserialize, Serialize};

use cadhub_automation::ProductHandle;

use crate::constants::{PART_EXTENSION, PRODUCT_EXTENSION};
use crate::parameter::ParameterSet;
use crate::shape::{Placement, ShapeDescriptor};

/// Index of a node inside its [`ElementTree`](super::ElementTree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Classification of a mirrored element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// A product backed by its own `CATProduct` document
    Assembly,
    /// A product sharing its parent's document (in-place sub-assembly)
    Component,
    /// A product backed by a `CATPart` document
    Part,
    /// Reference geometry synthesized below every part
    Definition,
    /// Backed by anything else
    Invalid,
}

impl ElementKind {
    /// Classify from the backing file name and the parent's backing file name
    pub fn classify(file_name: &str, parent_file_name: Option<&str>) -> Self {
        let extension = Path::new(file_name).extension().and_then(|e| e.to_str());
        match extension {
            Some(ext) if ext.eq_ignore_ascii_case(PART_EXTENSION) => ElementKind::Part,
            Some(ext) if ext.eq_ignore_ascii_case(PRODUCT_EXTENSION) => {
                if parent_file_name == Some(file_name) {
                    ElementKind::Component
                } else {
                    ElementKind::Assembly
                }
            }
            _ => ElementKind::Invalid,
        }
    }

    /// Whether the node stands for a live product in the CAD application
    pub fn is_product(&self) -> bool {
        !matches!(self, ElementKind::Definition | ElementKind::Invalid)
    }
}

/// One element of the mirrored product tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub part_number: String,
    pub description: String,
    /// File name of the backing document
    pub file_name: String,
    pub kind: ElementKind,
    /// Non-owning token resolved against the CAD application on demand
    pub handle: Option<ProductHandle>,
    /// Parameters read from the product
    pub parameters: ParameterSet,
    /// Position relative to the parent product
    pub placement: Option<Placement>,
    /// Shape attached by the synchronizer
    pub shape: Option<ShapeDescriptor>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl TreeNode {
    /// Create an unattached node
    pub fn new(name: impl Into<String>, file_name: impl Into<String>, kind: ElementKind) -> Self {
        let name = name.into();
        Self {
            part_number: name.clone(),
            name,
            description: String::new(),
            file_name: file_name.into(),
            kind,
            handle: None,
            parameters: ParameterSet::new(),
            placement: None,
            shape: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// The reference-geometry child synthesized for a part
    pub fn definition_of(part: &TreeNode) -> Self {
        Self {
            name: format!("{} definition", part.part_number),
            part_number: part.part_number.clone(),
            description: part.description.clone(),
            file_name: part.file_name.clone(),
            kind: ElementKind::Definition,
            handle: None,
            parameters: ParameterSet::new(),
            placement: None,
            shape: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in native order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_part() {
        assert_eq!(ElementKind::classify("Wheel.CATPart", Some("Rover.CATProduct")), ElementKind::Part);
        assert_eq!(ElementKind::classify("wheel.catpart", None), ElementKind::Part);
    }

    #[test]
    fn test_classify_product() {
        assert_eq!(
            ElementKind::classify("Chassis.CATProduct", Some("Rover.CATProduct")),
            ElementKind::Assembly
        );
        assert_eq!(
            ElementKind::classify("Rover.CATProduct", Some("Rover.CATProduct")),
            ElementKind::Component
        );
        assert_eq!(ElementKind::classify("Rover.CATProduct", None), ElementKind::Assembly);
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(ElementKind::classify("drawing.CATDrawing", None), ElementKind::Invalid);
        assert_eq!(ElementKind::classify("", None), ElementKind::Invalid);
    }
}
