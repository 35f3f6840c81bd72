//! Mirror, resolve, install and apply against an in-memory session

use std::fs;
use std::path::Path;
use std::time::Duration;

use approx::assert_relative_eq;
use tempfile::TempDir;

use cadhub_automation::{ApartmentThread, CadAutomation, Color, MemorySession};
use cadhub_core::{
    ElementKind, ElementTree, HubParameter, MappedElement, MappingFile, MaterialCatalog,
    ShapeKind, SyncConfig, SyncError, SyncOutcome, Synchronizer, TemplateLocator, TreeBuilder,
};

fn template_root() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    let primitives = root.path().join("primitives");
    fs::create_dir_all(&primitives).unwrap();
    for name in ["QuadPrismTemplate.CATPart", "cylindertemplate.CATPart"] {
        fs::write(primitives.join(name), name).unwrap();
    }
    root
}

fn rover(project: &Path) -> MemorySession {
    let mut session = MemorySession::new();
    let rover = session.add_document("Rover.CATProduct", project);
    let root = session.root_of(rover).unwrap();
    let chassis = session.add_document("Chassis.CATProduct", project);
    session.add_product(root, "Chassis", chassis);
    session
}

fn mirror(session: &MemorySession) -> ElementTree {
    TreeBuilder::new(session).build_active().unwrap()
}

fn tank() -> MappedElement {
    MappedElement::new("Tank")
        .with_parent("Chassis")
        .with_parameter(HubParameter::scalar("kind", "quadprism"))
        .with_parameter(HubParameter::scalar("height", "888mm"))
        .with_parameter(HubParameter::scalar("ext_shape", "56,4"))
        .with_parameter(HubParameter::compound("position", &["100", "0", "-25,5"]))
        .with_parameter(HubParameter::compound(
            "orientation",
            &["0", "-1", "0", "1", "0", "0", "0", "0", "1"],
        ))
}

#[test]
fn test_quadprism_created_end_to_end() {
    let templates = template_root();
    let project = tempfile::tempdir().unwrap();
    let mut session = rover(project.path());
    let mut tree = mirror(&session);

    let sync = Synchronizer::new(TemplateLocator::new(templates.path()), project.path());
    let report = sync.run(&mut session, &mut tree, &[tank()]);

    assert!(report.is_success(), "{}", report);
    let installed = project.path().join("Tank.CATPart");
    assert_eq!(
        report.outcome("Tank"),
        Some(&SyncOutcome::Created {
            path: installed.clone()
        })
    );
    assert_eq!(fs::read(&installed).unwrap(), b"QuadPrismTemplate.CATPart");
    assert_eq!(report.history.len(), 3);

    let id = tree.find_by_name("Tank").unwrap();
    let node = tree.get(id).unwrap();
    assert_eq!(node.kind, ElementKind::Part);
    assert_eq!(tree.get(node.parent().unwrap()).unwrap().name, "Chassis");

    let shape = node.shape.as_ref().unwrap();
    assert_eq!(shape.kind, ShapeKind::Box);
    assert!(shape.is_supported());
    assert_eq!(shape.height, Some(888.0));
    assert_eq!(shape.external_shape.as_deref(), Some("56.4"));

    let product = node.handle.unwrap();
    let position = session.position(product).unwrap();
    assert_relative_eq!(position[9], 100.0);
    assert_relative_eq!(position[11], -25.5);
    // First axis of a row-major orientation is its first column
    assert_relative_eq!(position[0], 0.0);
    assert_relative_eq!(position[1], 1.0);
}

#[test]
fn test_existing_destination_is_never_overwritten() {
    let templates = template_root();
    let project = tempfile::tempdir().unwrap();
    let destination = project.path().join("Tank.CATPart");
    fs::write(&destination, b"authored part").unwrap();
    let mut session = rover(project.path());
    let mut tree = mirror(&session);

    let sync = Synchronizer::new(TemplateLocator::new(templates.path()), project.path());
    let report = sync.run(&mut session, &mut tree, &[tank()]);

    assert!(matches!(
        report.failure("Tank"),
        Some(SyncError::AlreadyExists(path)) if *path == destination
    ));
    assert_eq!(fs::read(&destination).unwrap(), b"authored part");
    assert_eq!(session.mutations(), 0);
    assert!(report.history.is_empty());
}

#[test]
fn test_update_twice_changes_nothing_the_second_time() {
    let templates = template_root();
    let project = tempfile::tempdir().unwrap();
    let mut session = rover(project.path());
    let sync = Synchronizer::new(TemplateLocator::new(templates.path()), project.path());

    let mut tree = mirror(&session);
    sync.run(&mut session, &mut tree, &[tank()]);

    let mut taller = tank().with_color(Color::new(0, 128, 255));
    taller.parameters[1] = HubParameter::scalar("height", "900mm");

    let mut tree = mirror(&session);
    let first = sync.run(&mut session, &mut tree, &[taller.clone()]);
    assert_eq!(first.outcome("Tank"), Some(&SyncOutcome::Updated { changed: 2 }));
    assert_eq!(first.history.len(), 1);
    let after_first = session.mutations();

    let mut tree = mirror(&session);
    let second = sync.run(&mut session, &mut tree, &[taller]);
    assert_eq!(second.outcome("Tank"), Some(&SyncOutcome::Unchanged));
    assert!(second.history.is_empty());
    assert_eq!(session.mutations(), after_first);
}

#[test]
fn test_missing_parent_fails_element() {
    let templates = template_root();
    let project = tempfile::tempdir().unwrap();
    let mut session = rover(project.path());
    let mut tree = mirror(&session);

    let orphan = tank().with_parent("Lander");
    let sync = Synchronizer::new(TemplateLocator::new(templates.path()), project.path());
    let report = sync.run(&mut session, &mut tree, &[orphan]);

    assert!(matches!(report.failure("Tank"), Some(SyncError::MissingParent(_))));
    assert!(!project.path().join("Tank.CATPart").exists());
}

#[test]
fn test_missing_template_skips_element_only() {
    let templates = template_root();
    let project = tempfile::tempdir().unwrap();
    let mut session = rover(project.path());
    let mut tree = mirror(&session);

    let ball = MappedElement::new("Ball")
        .with_parameter(HubParameter::scalar("kind", "sphere"))
        .with_parameter(HubParameter::scalar("wid_diam", "0.3m"));
    let sync = Synchronizer::new(TemplateLocator::new(templates.path()), project.path());
    let report = sync.run(&mut session, &mut tree, &[ball, tank()]);

    assert!(matches!(report.outcome("Ball"), Some(SyncOutcome::Skipped { .. })));
    assert!(matches!(report.outcome("Tank"), Some(SyncOutcome::Created { .. })));
    assert!(report.is_success());
    assert!(!project.path().join("Ball.CATPart").exists());
}

#[test]
fn test_sync_on_apartment_thread_with_material_scan() {
    let templates = template_root();
    let project = tempfile::tempdir().unwrap();
    let project_dir = project.path().to_path_buf();

    let apartment = ApartmentThread::spawn("cad", move || {
        let mut session = rover(&project_dir);
        session.add_material_library("/lib/metals", vec!["Steel".into()]);
        session
    })
    .unwrap();

    let catalog = MaterialCatalog::new();
    let scan = catalog.populate(apartment.handle(), "/lib/metals".into());
    // The scan runs on the apartment too; let it finish before the sync occupies it.
    assert!(catalog.wait_until_complete(Duration::from_secs(5)));
    scan.join().unwrap();

    let sync = Synchronizer::new(TemplateLocator::new(templates.path()), project.path())
        .with_materials(catalog, Duration::ZERO);
    let element = tank().with_material("Steel");
    let report = apartment
        .call(move |session| {
            let mut tree = mirror(session);
            sync.run(session, &mut tree, &[element])
        })
        .unwrap();
    assert!(report.is_success(), "{}", report);

    let session = apartment.join().unwrap();
    let tree = mirror(&session);
    let product = tree
        .find_by_name("Tank")
        .and_then(|id| tree.get(id))
        .and_then(|node| node.handle)
        .unwrap();
    assert_eq!(session.material(product).unwrap().as_deref(), Some("Steel"));
}

#[test]
fn test_demo_files_load() {
    let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");

    let session = MemorySession::load(demos.join("rover.ron")).unwrap();
    let tree = mirror(&session);
    assert_eq!(tree.len(), 2);
    let chassis = tree.get(tree.find_by_name("Chassis").unwrap()).unwrap();
    assert_eq!(chassis.parameters.mass(), Some(42.0));

    let mapping = MappingFile::load(demos.join("mapping.ron")).unwrap();
    assert_eq!(mapping.elements.len(), 2);
    let config = SyncConfig::load(demos.join("cadhub.ron")).unwrap();
    assert!(TemplateLocator::new(demos.join("templates")).any_available());
    assert!(config.material_library.is_some());
}
