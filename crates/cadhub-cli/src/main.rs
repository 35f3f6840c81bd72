//! cadhub CLI - drive the CAD hub bridge against a session snapshot
//!
//! Sessions are RON snapshots of the CAD application state; every
//! automation call runs on a dedicated apartment thread.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cadhub_automation::{ApartmentThread, CadAutomation, MemorySession};
use cadhub_core::{
    ConnectionMonitor, MappingFile, MaterialCatalog, SyncConfig, Synchronizer, TemplateLocator,
    TreeBuilder,
};

const DEFAULT_LOG_FILTER: &str = "cadhub_core=info,cadhub_cli=info";

#[derive(Parser)]
#[command(name = "cadhub")]
#[command(about = "Keep a CAD product tree in step with hub parameters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the mirrored product tree of the active document
    Tree {
        /// Session snapshot (.ron)
        session: PathBuf,
    },
    /// Check that templates are available for every shape kind
    Check {
        /// Settings file (.ron)
        config: PathBuf,
    },
    /// Add or update the mapped elements and save the session
    Sync {
        /// Session snapshot (.ron), rewritten after synchronization
        session: PathBuf,
        /// Mapped elements (.ron)
        mapping: PathBuf,
        /// Settings file (.ron); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Tree { session } => {
            init_tracing(None);
            show_tree(&session)?;
        }
        Commands::Check { config } => {
            let config = SyncConfig::load(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            init_tracing(config.log_filter.as_deref());
            check_templates(&config)?;
        }
        Commands::Sync {
            session,
            mapping,
            config,
        } => {
            let config = match config {
                Some(path) => SyncConfig::load(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => SyncConfig::default(),
            };
            init_tracing(config.log_filter.as_deref());
            synchronize(&session, &mapping, &config)?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured filter
fn init_tracing(configured: Option<&str>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fallback = configured.unwrap_or(DEFAULT_LOG_FILTER).to_string();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_session(path: &Path) -> Result<ApartmentThread<MemorySession>> {
    let session = MemorySession::load(path)
        .with_context(|| format!("Failed to load session {}", path.display()))?;
    tracing::debug!("Loaded session {}", path.display());
    Ok(ApartmentThread::spawn("cad-automation", move || session)?)
}

fn show_tree(path: &Path) -> Result<()> {
    let apartment = open_session(path)?;
    let rendered = apartment.call(|cad| {
        TreeBuilder::new(&*cad)
            .build_active()
            .map(|tree| tree.render())
    })??;
    print!("{}", rendered);
    Ok(())
}

fn check_templates(config: &SyncConfig) -> Result<()> {
    let locator = TemplateLocator::new(&config.template_root);
    if !locator.any_available() {
        anyhow::bail!("No templates below {}", config.template_root.display());
    }
    let missing = locator.missing_kinds();
    if missing.is_empty() {
        println!("All templates available in {}", config.template_root.display());
    } else {
        let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
        println!("Missing templates: {}", names.join(", "));
    }
    Ok(())
}

fn synchronize(session_path: &Path, mapping_path: &Path, config: &SyncConfig) -> Result<()> {
    let mapping = MappingFile::load(mapping_path)
        .with_context(|| format!("Failed to load mapping {}", mapping_path.display()))?;
    let locator = TemplateLocator::new(&config.template_root);
    if !locator.any_available() {
        anyhow::bail!("No templates below {}", config.template_root.display());
    }

    let apartment = open_session(session_path)?;

    let mut monitor = ConnectionMonitor::new();
    let events = monitor.subscribe();
    let context = apartment.call(move |cad| monitor.refresh(&*cad))??;
    for event in events.try_iter() {
        tracing::info!("{:?}", event);
    }

    let catalog = MaterialCatalog::new();
    if let Some(library) = &config.material_library {
        catalog.populate(apartment.handle(), library.clone());
        // The scan needs the apartment; wait here rather than inside the sync.
        if !catalog.wait_until_complete(config.material_wait()) {
            tracing::warn!("Material scan still running; using {} known materials", catalog.len());
        }
    }

    let synchronizer = Synchronizer::new(locator, config.project_dir_for(&context))
        .with_materials(catalog, config.material_wait());
    let document = context.document;
    let elements = mapping.elements;
    let report = apartment.call(move |cad| {
        let mut tree = TreeBuilder::new(&*cad).build(document)?;
        tracing::info!("Synchronizing {} elements into {}", elements.len(), cad.name());
        Ok::<_, cadhub_core::SyncError>(synchronizer.run(cad, &mut tree, &elements))
    })??;

    println!("{}", report);

    let session = apartment.join()?;
    session
        .save(session_path)
        .with_context(|| format!("Failed to save session {}", session_path.display()))?;

    if !report.is_success() {
        anyhow::bail!("{} elements failed to synchronize", report.failures.len());
    }
    Ok(())
}
