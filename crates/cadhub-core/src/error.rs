//! Synchronization errors

use std::path::PathBuf;

use cadhub_automation::{ApartmentError, AutomationError};

use crate::shape::ShapeKind;

/// Errors surfaced by mirroring and synchronization
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    #[error("No running CAD application found")]
    NotConnected,

    #[error("Unsupported shape for element '{0}'")]
    UnsupportedShape(String),

    #[error("No template found for shape kind '{0}'")]
    TemplateNotFound(ShapeKind),

    #[error("Destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Element name '{0}' is not a valid part file name")]
    InvalidElementName(String),

    #[error("No parent context for element '{0}'")]
    MissingParent(String),

    #[error("CAD interface call failed: {0}")]
    TransientExternalFailure(#[from] AutomationError),

    #[error("Automation thread unavailable: {0}")]
    Apartment(#[from] ApartmentError),

    #[error("IO error: {0}")]
    Io(String),
}

impl SyncError {
    /// Whether the condition is absorbed with a warning instead of failing
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::UnsupportedShape(_) | SyncError::TemplateNotFound(_)
        )
    }
}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
