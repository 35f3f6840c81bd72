//! Add-or-update synchronization of mapped elements
//!
//! Each mapped element is matched by name below its parent in the mirror
//! tree. A match is updated in place, writing only what differs; otherwise a
//! part is instantiated from the shape's template and fully initialized.

mod mapping;
mod report;

use std::path::{Path, PathBuf};
use std::time::Duration;

use cadhub_automation::{AutomationError, AutomationValue, CadAutomation, ProductHandle};

use crate::cancel::CancellationToken;
use crate::color::{ColorService, PropertyColorService};
use crate::error::{SyncError, SyncResult};
use crate::history::{ChangeEntry, ChangeHistory, ChangeLog};
use crate::material::MaterialCatalog;
use crate::parameter::{ParameterSet, ParameterValue};
use crate::shape::{Placement, ShapeDescriptor};
use crate::template::{discard, TemplateLocator};
use crate::tree::{ElementKind, ElementTree, NodeId, TreeNode};

pub use mapping::{MappedElement, MappingFile};
pub use report::{ElementFailure, ElementReport, SyncOutcome, SyncReport};

/// Drives template instantiation and parameter writes for mapped elements
pub struct Synchronizer {
    locator: TemplateLocator,
    project_dir: PathBuf,
    colors: Box<dyn ColorService + Send>,
    materials: Option<MaterialCatalog>,
    material_wait: Duration,
    token: CancellationToken,
}

impl Synchronizer {
    /// Synchronizer installing new parts into `project_dir`
    pub fn new(locator: TemplateLocator, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            locator,
            project_dir: project_dir.into(),
            colors: Box::new(PropertyColorService),
            materials: None,
            material_wait: Duration::ZERO,
            token: CancellationToken::new(),
        }
    }

    /// Use a different color service
    pub fn with_colors(mut self, colors: impl ColorService + Send + 'static) -> Self {
        self.colors = Box::new(colors);
        self
    }

    /// Use `catalog` to validate materials, waiting up to `wait` for the scan
    pub fn with_materials(mut self, catalog: MaterialCatalog, wait: Duration) -> Self {
        self.materials = Some(catalog);
        self.material_wait = wait;
        self
    }

    /// Stop before the next element once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Directory new parts are installed into
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Synchronize every element in order
    ///
    /// Recoverable conditions become [`SyncOutcome::Skipped`], anything else
    /// is recorded as a failure and the run goes on with the next element.
    /// Cancellation stops before the next element; applied changes stay.
    pub fn run(
        &self,
        cad: &mut dyn CadAutomation,
        tree: &mut ElementTree,
        elements: &[MappedElement],
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let mut history = ChangeLog::new();

        for element in elements {
            if self.token.is_cancelled() {
                tracing::warn!("Synchronization cancelled before {}", element.name);
                report.cancelled = true;
                break;
            }
            match self.apply_element(cad, tree, element, &mut history) {
                Ok(outcome) => report.elements.push(ElementReport {
                    iid: element.iid,
                    name: element.name.clone(),
                    outcome,
                }),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Skipping {}: {}", element.name, e);
                    report.elements.push(ElementReport {
                        iid: element.iid,
                        name: element.name.clone(),
                        outcome: SyncOutcome::Skipped {
                            reason: e.to_string(),
                        },
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to synchronize {}: {}", element.name, e);
                    report.failures.push(ElementFailure {
                        iid: element.iid,
                        name: element.name.clone(),
                        error: e,
                    });
                }
            }
        }

        report.history = history;
        report
    }

    /// Add or update one element
    pub fn apply_element(
        &self,
        cad: &mut dyn CadAutomation,
        tree: &mut ElementTree,
        element: &MappedElement,
        history: &mut dyn ChangeHistory,
    ) -> SyncResult<SyncOutcome> {
        let parameters = element.parameter_set();
        let shape = ShapeDescriptor::resolve(&parameters);
        if !shape.is_supported() {
            return Err(SyncError::UnsupportedShape(element.name.clone()));
        }
        let missing = shape.missing_dimensions();
        if !missing.is_empty() {
            tracing::warn!(
                "{} ({}) lacks dimensions: {}",
                element.name,
                shape.kind,
                missing.join(", ")
            );
        }

        let parent = self.parent_of(tree, element);
        match parent.and_then(|p| tree.find_child_by_name(p, &element.name)) {
            Some(existing) => self.update(cad, tree, existing, element, &parameters, shape, history),
            None => {
                let parent = parent.ok_or_else(|| SyncError::MissingParent(element.name.clone()))?;
                self.create(cad, tree, parent, element, &parameters, shape, history)
            }
        }
    }

    fn parent_of(&self, tree: &ElementTree, element: &MappedElement) -> Option<NodeId> {
        match &element.parent {
            Some(name) => tree.find_by_name(name),
            None => tree.root(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        &self,
        cad: &mut dyn CadAutomation,
        tree: &mut ElementTree,
        parent: NodeId,
        element: &MappedElement,
        parameters: &ParameterSet,
        shape: ShapeDescriptor,
        history: &mut dyn ChangeHistory,
    ) -> SyncResult<SyncOutcome> {
        let parent_handle = tree
            .get(parent)
            .filter(|node| node.kind.is_product() && node.kind != ElementKind::Part)
            .and_then(|node| node.handle)
            .ok_or_else(|| SyncError::MissingParent(element.name.clone()))?;

        let mut template = self
            .locator
            .locate(shape.kind)
            .ok_or(SyncError::TemplateNotFound(shape.kind))?;
        let destination = TemplateLocator::destination_for(&self.project_dir, &element.name)?;
        let path = self.locator.install(&mut template, &destination)?;

        // The file is ours until the part is fully initialized
        let initialized =
            self.initialize(cad, parent_handle, &path, element, parameters, &shape, history);
        let product = match initialized {
            Ok(product) => product,
            Err(e) => {
                discard(&path);
                return Err(e);
            }
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let mut node = TreeNode::new(element.name.clone(), file_name, ElementKind::Part);
        node.handle = Some(product);
        node.parameters = parameters.clone();
        node.placement = Some(shape.placement);
        let id = tree
            .add_part(parent, node)
            .ok_or_else(|| SyncError::MissingParent(element.name.clone()))?;
        tree.attach_shape(id, shape);

        Ok(SyncOutcome::Created { path })
    }

    /// Insert the installed file and write its parameters and appearance
    #[allow(clippy::too_many_arguments)]
    fn initialize(
        &self,
        cad: &mut dyn CadAutomation,
        parent: ProductHandle,
        path: &Path,
        element: &MappedElement,
        parameters: &ParameterSet,
        shape: &ShapeDescriptor,
        history: &mut dyn ChangeHistory,
    ) -> SyncResult<ProductHandle> {
        let product = cad.add_component_from_file(parent, path)?;
        tracing::info!("Created {} from {} template", element.name, shape.kind);

        for (name, value) in parameters.iter() {
            write_parameter(cad, product, name, value)?;
            history.record(ChangeEntry::created(&element.name, name, value));
        }
        cad.set_position(product, shape.placement.to_components())?;
        self.apply_appearance(cad, product, element)?;
        Ok(product)
    }

    #[allow(clippy::too_many_arguments)]
    fn update(
        &self,
        cad: &mut dyn CadAutomation,
        tree: &mut ElementTree,
        id: NodeId,
        element: &MappedElement,
        parameters: &ParameterSet,
        shape: ShapeDescriptor,
        history: &mut dyn ChangeHistory,
    ) -> SyncResult<SyncOutcome> {
        let product = tree.get(id).and_then(|node| node.handle).ok_or_else(|| {
            AutomationError::Unavailable(format!("no product bound to {}", element.name))
        })?;

        let raw = cad.parameters(product)?;
        let current = ParameterSet::from_raw(raw.iter().map(|p| (p.name.as_str(), p.value.as_str())));

        let mut changed = 0;
        for (name, value) in parameters.iter() {
            let previous = current.get(name);
            if previous.is_some_and(|p| p.same_as(value)) {
                continue;
            }
            write_parameter(cad, product, name, value)?;
            history.record(ChangeEntry::updated(&element.name, name, previous, value));
            changed += 1;
        }

        let placement = Placement::from_components(&cad.position(product)?);
        if !placement.approx_eq(&shape.placement) {
            cad.set_position(product, shape.placement.to_components())?;
            tracing::info!("Moved {}", element.name);
            changed += 1;
        }
        changed += self.apply_appearance(cad, product, element)?;

        if let Some(node) = tree.get_mut(id) {
            node.parameters = current;
            for (name, value) in parameters.iter() {
                node.parameters.insert(name, value.clone());
            }
            node.placement = Some(shape.placement);
        }
        tree.attach_shape(id, shape);

        if changed == 0 {
            tracing::debug!("{} is up to date", element.name);
            Ok(SyncOutcome::Unchanged)
        } else {
            tracing::info!("Updated {} ({} changes)", element.name, changed);
            Ok(SyncOutcome::Updated { changed })
        }
    }

    /// Apply color and material where they differ; returns the number of writes
    fn apply_appearance(
        &self,
        cad: &mut dyn CadAutomation,
        product: ProductHandle,
        element: &MappedElement,
    ) -> SyncResult<usize> {
        let mut changed = 0;

        if let Some(color) = element.color {
            match cad.main_body(product)? {
                Some(body) => {
                    let document = cad.reference_document(product)?;
                    if self.colors.get_color(&*cad, document, body)? != Some(color) {
                        self.colors.apply_color(cad, document, body, color)?;
                        changed += 1;
                    }
                }
                None => tracing::warn!("{} has no body to color", element.name),
            }
        }

        if let Some(material) = &element.material {
            if self.material_known(material) {
                if cad.material(product)?.as_deref() != Some(material.as_str()) {
                    cad.apply_material(product, material)?;
                    tracing::info!("Applied material {} to {}", material, element.name);
                    changed += 1;
                }
            } else {
                tracing::warn!("Unknown material {} for {}", material, element.name);
            }
        }

        Ok(changed)
    }

    fn material_known(&self, material: &str) -> bool {
        let Some(catalog) = &self.materials else {
            return false;
        };
        if !catalog.contains(material) && !catalog.is_complete() {
            catalog.wait_until_complete(self.material_wait);
        }
        catalog.contains(material)
    }
}

/// Write one typed value onto a product parameter
fn write_parameter(
    cad: &mut dyn CadAutomation,
    product: ProductHandle,
    name: &str,
    value: &ParameterValue,
) -> SyncResult<()> {
    let value = match value {
        ParameterValue::DoubleWithUnit(v) => AutomationValue::Real {
            value: v.value,
            unit: v.unit.clone(),
        },
        ParameterValue::Boolean(b) => AutomationValue::Boolean(*b),
        ParameterValue::Text(t) => AutomationValue::Text(t.clone()),
        ParameterValue::ShapeKindValue(kind) => AutomationValue::Text(kind.tag().to_string()),
    };
    tracing::debug!("{:?}.{} = {}", product, name, value.value_as_string());
    cad.set_parameter(product, name, &value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::HubParameter;
    use crate::tree::TreeBuilder;
    use cadhub_automation::{Color, MemorySession};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        templates: TempDir,
        project: TempDir,
        session: MemorySession,
    }

    fn fixture() -> Fixture {
        let templates = tempfile::tempdir().unwrap();
        for name in ["quadprismtemplate.CATPart", "cylindertemplate.CATPart"] {
            fs::write(templates.path().join(name), name).unwrap();
        }
        let project = tempfile::tempdir().unwrap();
        let mut session = MemorySession::new();
        session.add_document("Rover.CATProduct", project.path());
        Fixture {
            templates,
            project,
            session,
        }
    }

    impl Fixture {
        fn synchronizer(&self) -> Synchronizer {
            Synchronizer::new(TemplateLocator::new(self.templates.path()), self.project.path())
        }

        fn tree(&self) -> ElementTree {
            TreeBuilder::new(&self.session).build_active().unwrap()
        }
    }

    fn tank() -> MappedElement {
        MappedElement::new("Tank")
            .with_parameter(HubParameter::scalar("kind", "cylinder"))
            .with_parameter(HubParameter::scalar("len", "2m"))
            .with_parameter(HubParameter::scalar("wid_diam", "0.5m"))
    }

    #[test]
    fn test_create_writes_parameters_once() {
        let mut f = fixture();
        let mut tree = f.tree();
        let mut history = ChangeLog::new();

        let outcome = f
            .synchronizer()
            .apply_element(&mut f.session, &mut tree, &tank(), &mut history)
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Created { ref path } if path.ends_with("Tank.CATPart")));
        assert_eq!(history.len(), 3);
        let node = tree.get(tree.find_by_name("Tank").unwrap()).unwrap();
        assert_eq!(node.kind, ElementKind::Part);
        assert_eq!(node.shape.as_ref().unwrap().length, Some(2.0));
        assert_eq!(tree.children(tree.find_by_name("Tank").unwrap()).count(), 1);
    }

    #[test]
    fn test_written_values_read_back_equal() {
        let mut f = fixture();
        let root = f.tree().root().unwrap();
        let product = f.tree().get(root).unwrap().handle.unwrap();
        let values = [
            ("len", ParameterValue::decode("len", "12,5 mm")),
            ("kind", ParameterValue::decode("kind", "Cylinder")),
            ("visible", ParameterValue::Boolean(true)),
            ("note", ParameterValue::Text("flat top".into())),
        ];
        for (name, value) in &values {
            write_parameter(&mut f.session, product, name, value).unwrap();
        }

        let raw = f.session.parameters(product).unwrap();
        let read = ParameterSet::from_raw(raw.iter().map(|p| (p.name.as_str(), p.value.as_str())));
        for (name, value) in &values {
            assert!(read.get(name).unwrap().same_as(value), "{} differs", name);
        }
    }

    #[test]
    fn test_unsupported_shape_is_skipped() {
        let mut f = fixture();
        let mut tree = f.tree();
        let element = MappedElement::new("Blob").with_parameter(HubParameter::scalar("len", "1"));

        let report = f.synchronizer().run(&mut f.session, &mut tree, &[element]);
        assert!(matches!(report.outcome("Blob"), Some(SyncOutcome::Skipped { .. })));
        assert!(report.is_success());
        assert_eq!(f.session.mutations(), 0);
    }

    #[test]
    fn test_update_writes_only_differences() {
        let mut f = fixture();
        let mut tree = f.tree();
        let sync = f.synchronizer();
        sync.run(&mut f.session, &mut tree, &[tank()]);

        let mut longer = tank();
        longer.parameters[1] = HubParameter::scalar("len", "3m");
        let report = sync.run(&mut f.session, &mut tree, &[longer]);

        assert_eq!(report.outcome("Tank"), Some(&SyncOutcome::Updated { changed: 1 }));
        assert_eq!(report.history.len(), 1);
        assert_eq!(
            report.history.entries()[0].description,
            "Changed len of Tank from 2m to 3m"
        );
    }

    #[test]
    fn test_color_applied_once() {
        let mut f = fixture();
        let mut tree = f.tree();
        let sync = f.synchronizer();
        let red = tank().with_color(Color::new(255, 0, 0));

        sync.run(&mut f.session, &mut tree, &[red.clone()]);
        let report = sync.run(&mut f.session, &mut tree, &[red]);
        assert_eq!(report.outcome("Tank"), Some(&SyncOutcome::Unchanged));
    }

    #[test]
    fn test_material_requires_catalog_entry() {
        let mut f = fixture();
        f.session
            .add_material_library("/lib/metals", vec!["Steel".to_string()]);
        let mut tree = f.tree();
        let sync = f
            .synchronizer()
            .with_materials(MaterialCatalog::from_names(["Steel"]), Duration::ZERO);

        let steel = tank().with_material("Steel");
        sync.run(&mut f.session, &mut tree, &[steel]);
        let product = tree.get(tree.find_by_name("Tank").unwrap()).unwrap().handle.unwrap();
        assert_eq!(f.session.material(product).unwrap().as_deref(), Some("Steel"));

        let unknown = tank().with_material("Unobtainium");
        let report = sync.run(&mut f.session, &mut tree, &[unknown]);
        assert_eq!(report.outcome("Tank"), Some(&SyncOutcome::Unchanged));
        assert_eq!(f.session.material(product).unwrap().as_deref(), Some("Steel"));
    }

    #[test]
    fn test_failed_create_leaves_no_file_behind() {
        let mut f = fixture();
        let sync = f.synchronizer();
        let mut tree = f.tree();
        f.session.offline = true;

        let report = sync.run(&mut f.session, &mut tree, &[tank()]);
        assert!(matches!(
            report.failure("Tank"),
            Some(SyncError::TransientExternalFailure(AutomationError::NotRunning))
        ));
        assert!(!f.project.path().join("Tank.CATPart").exists());

        f.session.offline = false;
        let mut tree = f.tree();
        let report = sync.run(&mut f.session, &mut tree, &[tank()]);
        assert!(matches!(report.outcome("Tank"), Some(SyncOutcome::Created { .. })));
        assert!(f.project.path().join("Tank.CATPart").exists());
    }

    #[test]
    fn test_escaping_name_is_rejected() {
        let mut f = fixture();
        let mut tree = f.tree();
        let mut element = tank();
        element.name = "../Tank".into();

        let report = f.synchronizer().run(&mut f.session, &mut tree, &[element]);
        assert!(matches!(
            report.failure("../Tank"),
            Some(SyncError::InvalidElementName(_))
        ));
        assert_eq!(f.session.mutations(), 0);
    }

    #[test]
    fn test_cancelled_run_stops_before_elements() {
        let mut f = fixture();
        let mut tree = f.tree();
        let token = CancellationToken::new();
        token.cancel();

        let report = f
            .synchronizer()
            .with_cancellation(token)
            .run(&mut f.session, &mut tree, &[tank()]);
        assert!(report.cancelled);
        assert!(report.elements.is_empty());
        assert!(!f.project.path().join("Tank.CATPart").exists());
    }
}
