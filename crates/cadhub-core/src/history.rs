//! Change history sink
//!
//! Every parameter write performed by the synchronizer is reported here
//! exactly once, with a human-readable description.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a recorded change did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The parameter was written onto a newly created element
    Created,
    /// An existing parameter value was overwritten
    Updated,
}

/// One recorded parameter write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub id: Uuid,
    pub element: String,
    pub parameter: String,
    pub kind: ChangeKind,
    pub description: String,
}

impl ChangeEntry {
    /// Entry for a parameter written on a new part
    pub fn created(element: &str, parameter: &str, value: impl std::fmt::Display) -> Self {
        Self {
            id: Uuid::new_v4(),
            element: element.to_string(),
            parameter: parameter.to_string(),
            kind: ChangeKind::Created,
            description: format!("Set {} of {} to {}", parameter, element, value),
        }
    }

    /// Entry for a parameter changed on an existing part
    pub fn updated(
        element: &str,
        parameter: &str,
        previous: Option<impl std::fmt::Display>,
        value: impl std::fmt::Display,
    ) -> Self {
        let description = match previous {
            Some(previous) => format!(
                "Changed {} of {} from {} to {}",
                parameter, element, previous, value
            ),
            None => format!("Added {} to {} with {}", parameter, element, value),
        };
        Self {
            id: Uuid::new_v4(),
            element: element.to_string(),
            parameter: parameter.to_string(),
            kind: ChangeKind::Updated,
            description,
        }
    }
}

/// Receiver of change entries
pub trait ChangeHistory {
    fn record(&mut self, entry: ChangeEntry);
}

/// In-memory history, oldest entry first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeLog {
    entries: Vec<ChangeEntry>,
}

impl ChangeLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded entries in order
    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Nothing recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries recorded for one element
    pub fn for_element<'a>(&'a self, element: &'a str) -> impl Iterator<Item = &'a ChangeEntry> {
        self.entries.iter().filter(move |e| e.element == element)
    }
}

impl ChangeHistory for ChangeLog {
    fn record(&mut self, entry: ChangeEntry) {
        tracing::debug!("History: {}", entry.description);
        self.entries.push(entry);
    }
}
