//! Outcome of a synchronization run

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::error::SyncError;
use crate::history::ChangeLog;

/// What happened to one mapped element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SyncOutcome {
    /// A new part was instantiated from a template at `path`
    Created { path: PathBuf },
    /// The existing element was brought in line; `changed` writes were needed
    Updated { changed: usize },
    /// The existing element already matched
    Unchanged,
    /// A recoverable condition prevented synchronization
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementReport {
    pub iid: Uuid,
    pub name: String,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone)]
pub struct ElementFailure {
    pub iid: Uuid,
    pub name: String,
    pub error: SyncError,
}

/// Per-element outcomes, failures and recorded history of one run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub elements: Vec<ElementReport>,
    pub failures: Vec<ElementFailure>,
    pub history: ChangeLog,
    /// The run stopped early on cancellation
    pub cancelled: bool,
}

impl SyncReport {
    /// Outcome of the element named `name`
    pub fn outcome(&self, name: &str) -> Option<&SyncOutcome> {
        self.elements
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.outcome)
    }

    /// Failure of the element named `name`
    pub fn failure(&self, name: &str) -> Option<&SyncError> {
        self.failures
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.error)
    }

    /// No element failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    fn count(&self, matches: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.elements.iter().filter(|e| matches(&e.outcome)).count()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            match &element.outcome {
                SyncOutcome::Created { path } => {
                    writeln!(f, "created   {} ({})", element.name, path.display())?
                }
                SyncOutcome::Updated { changed } => {
                    writeln!(f, "updated   {} ({} changes)", element.name, changed)?
                }
                SyncOutcome::Unchanged => writeln!(f, "unchanged {}", element.name)?,
                SyncOutcome::Skipped { reason } => {
                    writeln!(f, "skipped   {}: {}", element.name, reason)?
                }
            }
        }
        for failure in &self.failures {
            writeln!(f, "FAILED    {}: {}", failure.name, failure.error)?;
        }
        write!(
            f,
            "{} created, {} updated, {} unchanged, {} skipped, {} failed, {} history entries",
            self.count(|o| matches!(o, SyncOutcome::Created { .. })),
            self.count(|o| matches!(o, SyncOutcome::Updated { .. })),
            self.count(|o| matches!(o, SyncOutcome::Unchanged)),
            self.count(|o| matches!(o, SyncOutcome::Skipped { .. })),
            self.failures.len(),
            self.history.len()
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}
