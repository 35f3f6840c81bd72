//! Recursive mirroring of the CAD product graph

use cadhub_automation::{AutomationError, CadAutomation, DocumentHandle, ProductHandle};

use super::node::{ElementKind, NodeId, TreeNode};
use super::ElementTree;
use crate::cancel::CancellationToken;
use crate::error::{SyncError, SyncResult};
use crate::parameter::ParameterSet;
use crate::shape::Placement;

/// Why a guarded call did not produce a value
enum Interrupt {
    Cancelled,
    Failed(AutomationError),
}

/// Walks the product graph depth-first and builds an [`ElementTree`]
///
/// A branch whose product or document is transiently unavailable is skipped
/// with a warning. Any other automation failure aborts the walk. On
/// cancellation the walk stops descending and the tree built so far is
/// returned, marked partial.
pub struct TreeBuilder<'a> {
    cad: &'a dyn CadAutomation,
    token: CancellationToken,
}

impl<'a> TreeBuilder<'a> {
    /// Create a builder reading through `cad`
    pub fn new(cad: &'a dyn CadAutomation) -> Self {
        Self {
            cad,
            token: CancellationToken::new(),
        }
    }

    /// Stop the walk once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Mirror the active document
    pub fn build_active(&self) -> SyncResult<ElementTree> {
        let document = self.cad.active_document().map_err(connection_error)?;
        self.build(document)
    }

    /// Mirror the product tree of `document`
    pub fn build(&self, document: DocumentHandle) -> SyncResult<ElementTree> {
        let mut tree = ElementTree::new();

        let root = match self.guarded(|cad| cad.root_product(document)) {
            Ok(root) => root,
            Err(Interrupt::Cancelled) => {
                tree.mark_partial();
                return Ok(tree);
            }
            Err(Interrupt::Failed(e)) => return Err(connection_error(e)),
        };
        let node = match self.read_node(root, None) {
            Ok(node) => node,
            Err(Interrupt::Cancelled) => {
                tree.mark_partial();
                return Ok(tree);
            }
            Err(Interrupt::Failed(e)) => return Err(connection_error(e)),
        };

        self.attach(&mut tree, None, node, root)
            .map_err(connection_error)?;
        tracing::info!(
            "Mirrored {} elements{}",
            tree.len(),
            if tree.is_partial() { " (cancelled)" } else { "" }
        );
        Ok(tree)
    }

    fn guarded<T>(
        &self,
        call: impl FnOnce(&dyn CadAutomation) -> Result<T, AutomationError>,
    ) -> Result<T, Interrupt> {
        if self.token.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        call(self.cad).map_err(Interrupt::Failed)
    }

    fn read_node(
        &self,
        product: ProductHandle,
        parent_file: Option<&str>,
    ) -> Result<TreeNode, Interrupt> {
        let info = self.guarded(|cad| cad.product(product))?;
        let document = self.guarded(|cad| cad.reference_document(product))?;
        let document = self.guarded(|cad| cad.document(document))?;
        let raw = self.guarded(|cad| cad.parameters(product))?;
        let position = self.guarded(|cad| cad.position(product))?;

        let kind = ElementKind::classify(&document.name, parent_file);
        let mut node = TreeNode::new(info.name, document.name, kind);
        node.part_number = info.part_number;
        node.description = info.description;
        node.handle = Some(product);
        node.parameters = ParameterSet::from_raw(raw.iter().map(|p| (p.name.as_str(), p.value.as_str())));
        node.placement = Some(Placement::from_components(&position));
        Ok(node)
    }

    fn walk(
        &self,
        tree: &mut ElementTree,
        parent: NodeId,
        product: ProductHandle,
    ) -> Result<(), AutomationError> {
        let parent_file = tree.get(parent).map(|n| n.file_name.clone());
        match self.read_node(product, parent_file.as_deref()) {
            Ok(node) => self.attach(tree, Some(parent), node, product),
            Err(Interrupt::Cancelled) => {
                tree.mark_partial();
                Ok(())
            }
            Err(Interrupt::Failed(e)) if e.is_transient() => {
                tracing::warn!("Skipping product {:?}: {}", product, e);
                Ok(())
            }
            Err(Interrupt::Failed(e)) => Err(e),
        }
    }

    fn attach(
        &self,
        tree: &mut ElementTree,
        parent: Option<NodeId>,
        node: TreeNode,
        product: ProductHandle,
    ) -> Result<(), AutomationError> {
        tracing::debug!("Mirrored {} ({:?})", node.name, node.kind);
        let kind = node.kind;
        let id = match parent {
            None => {
                let definition = (kind == ElementKind::Part).then(|| TreeNode::definition_of(&node));
                let id = tree.set_root(node);
                if let Some(definition) = definition {
                    tree.add_child(id, definition);
                }
                id
            }
            Some(parent) if kind == ElementKind::Part => match tree.add_part(parent, node) {
                Some(id) => id,
                None => return Ok(()),
            },
            Some(parent) => match tree.add_child(parent, node) {
                Some(id) => id,
                None => return Ok(()),
            },
        };

        if kind == ElementKind::Part {
            return Ok(());
        }

        let children = match self.guarded(|cad| cad.children(product)) {
            Ok(children) => children,
            Err(Interrupt::Cancelled) => {
                tree.mark_partial();
                return Ok(());
            }
            Err(Interrupt::Failed(e)) if e.is_transient() => {
                tracing::warn!("Cannot list children of {:?}: {}", product, e);
                return Ok(());
            }
            Err(Interrupt::Failed(e)) => return Err(e),
        };

        for child in children {
            if self.token.is_cancelled() {
                tree.mark_partial();
                return Ok(());
            }
            self.walk(tree, id, child)?;
        }
        Ok(())
    }
}

fn connection_error(error: AutomationError) -> SyncError {
    match error {
        AutomationError::NotRunning => SyncError::NotConnected,
        other => SyncError::TransientExternalFailure(other),
    }
}
