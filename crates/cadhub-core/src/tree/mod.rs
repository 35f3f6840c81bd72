//! Mirror of the CAD application's product tree
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. The tree is
//! rebuilt from scratch on every fetch; after construction only shape
//! descriptors get attached.

mod builder;
mod node;

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::shape::ShapeDescriptor;

pub use builder::TreeBuilder;
pub use node::{ElementKind, NodeId, TreeNode};

/// Arena-backed element tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementTree {
    nodes: Vec<TreeNode>,
    root: Option<NodeId>,
    /// The walk was cancelled before it finished
    partial: bool,
}

impl ElementTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Root node, if one was set
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The walk was cancelled before finishing
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub(crate) fn mark_partial(&mut self) {
        self.partial = true;
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    /// Replace the root; any previous nodes are discarded
    pub fn set_root(&mut self, mut node: TreeNode) -> NodeId {
        self.nodes.clear();
        node.parent = None;
        node.children.clear();
        self.nodes.push(node);
        self.root = Some(NodeId(0));
        NodeId(0)
    }

    /// Append `node` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, mut node: TreeNode) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    /// Append a part node together with its synthesized definition child
    pub fn add_part(&mut self, parent: NodeId, node: TreeNode) -> Option<NodeId> {
        let definition = TreeNode::definition_of(&node);
        let id = self.add_child(parent, node)?;
        self.add_child(id, definition);
        Some(id)
    }

    /// Attach a resolved shape, replacing any previous one
    pub fn attach_shape(&mut self, id: NodeId, shape: ShapeDescriptor) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.shape = Some(shape);
        }
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.0)
    }

    /// Child nodes in native order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|child| (*child, &self.nodes[child.0]))
    }

    /// Product child of `parent` with the given instance name
    pub fn find_child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .find(|(_, node)| node.kind.is_product() && node.name == name)
            .map(|(id, _)| id)
    }

    /// First product node with the given name, depth-first
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.depth_first()
            .into_iter()
            .find(|id| self.nodes[id.0].kind.is_product() && self.nodes[id.0].name == name)
    }

    /// All node ids in depth-first pre-order
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut result = Vec::with_capacity(self.nodes.len());
        if let Some(root) = self.root {
            self.collect_depth_first(root, &mut result);
        }
        result
    }

    fn collect_depth_first(&self, id: NodeId, result: &mut Vec<NodeId>) {
        result.push(id);
        for child in &self.nodes[id.0].children {
            self.collect_depth_first(*child, result);
        }
    }

    /// Depth of a node (root = 0)
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent.0].parent;
        }
        depth
    }

    /// Indented text listing, one node per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for id in self.depth_first() {
            let node = &self.nodes[id.0];
            let _ = write!(
                out,
                "{}{} [{:?}] {}",
                "  ".repeat(self.depth(id)),
                node.name,
                node.kind,
                node.file_name
            );
            if let Some(shape) = &node.shape {
                let _ = write!(out, " <{}>", shape.kind);
            }
            if let Some(mass) = node.parameters.mass() {
                let _ = write!(out, " mass={}", mass);
            }
            out.push('\n');
        }
        if self.partial {
            out.push_str("(partial)\n");
        }
        out
    }
}
