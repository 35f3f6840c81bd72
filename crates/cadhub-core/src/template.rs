//! Template artifact lookup and installation

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::constants::{PART_EXTENSION, TEMPLATE_SUFFIX};
use crate::error::{SyncError, SyncResult};
use crate::shape::ShapeKind;

/// A template artifact backing one shape kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub shape_kind: ShapeKind,
    pub source_path: PathBuf,
    /// Set once the artifact has been copied into a project directory
    pub installed_path: Option<PathBuf>,
}

/// Finds template artifacts below a root folder
#[derive(Debug, Clone)]
pub struct TemplateLocator {
    root: PathBuf,
}

impl TemplateLocator {
    /// Create a locator searching below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Template root folder
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Template files below the root, in a stable order
    fn artifacts(&self) -> impl Iterator<Item = PathBuf> {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
    }

    /// Find the first artifact whose file name contains `<tag>template`
    pub fn locate(&self, kind: ShapeKind) -> Option<TemplateDescriptor> {
        if kind == ShapeKind::None {
            return None;
        }
        let needle = format!("{}{}", kind.tag(), TEMPLATE_SUFFIX);
        let found = self.artifacts().find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.to_lowercase().contains(&needle))
        });

        match found {
            Some(source_path) => {
                tracing::debug!("Template for {} found at {}", kind, source_path.display());
                Some(TemplateDescriptor {
                    shape_kind: kind,
                    source_path,
                    installed_path: None,
                })
            }
            None => {
                tracing::warn!(
                    "No template for {} below {}",
                    kind,
                    self.root.display()
                );
                None
            }
        }
    }

    /// The template root exists and holds at least one file
    pub fn any_available(&self) -> bool {
        self.root.is_dir() && self.artifacts().next().is_some()
    }

    /// Kinds without any matching artifact
    pub fn missing_kinds(&self) -> Vec<ShapeKind> {
        ShapeKind::TEMPLATED
            .into_iter()
            .filter(|kind| self.locate(*kind).is_none())
            .collect()
    }

    /// Every templated kind has at least one artifact
    pub fn all_available(&self) -> bool {
        self.missing_kinds().is_empty()
    }

    /// Destination path an element's part file is expected at
    ///
    /// The element name must be a plain file stem; names that would leave
    /// `directory` fail with [`SyncError::InvalidElementName`].
    pub fn destination_for(directory: &Path, element_name: &str) -> SyncResult<PathBuf> {
        let escapes = element_name.is_empty()
            || element_name == "."
            || element_name == ".."
            || element_name.contains(['/', '\\']);
        if escapes {
            return Err(SyncError::InvalidElementName(element_name.to_string()));
        }
        Ok(directory.join(format!("{}.{}", element_name, PART_EXTENSION)))
    }

    /// Copy the artifact to `destination`
    ///
    /// Never overwrites: an existing file at `destination` fails with
    /// [`SyncError::AlreadyExists`].
    pub fn install(
        &self,
        template: &mut TemplateDescriptor,
        destination: &Path,
    ) -> SyncResult<PathBuf> {
        let mut source =
            fs::File::open(&template.source_path).map_err(|e| SyncError::Io(e.to_string()))?;
        let mut target = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => SyncError::AlreadyExists(destination.to_path_buf()),
                _ => SyncError::Io(e.to_string()),
            })?;
        if let Err(e) = io::copy(&mut source, &mut target) {
            drop(target);
            discard(destination);
            return Err(SyncError::Io(e.to_string()));
        }

        tracing::info!(
            "Installed {} template to {}",
            template.shape_kind,
            destination.display()
        );
        template.installed_path = Some(destination.to_path_buf());
        Ok(destination.to_path_buf())
    }
}

/// Remove a file this process just installed
pub(crate) fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}
