//! Connection to the running CAD application
//!
//! The live connection is an explicit [`CadContext`] value passed to the
//! operations that need it. [`ConnectionMonitor`] keeps the current
//! [`ConnectionStatus`] and publishes every change to its observers.

use std::path::PathBuf;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use cadhub_automation::{AutomationError, CadAutomation, DocumentHandle};

use crate::error::{SyncError, SyncResult};

/// Active document of a connected application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadContext {
    pub document: DocumentHandle,
    pub document_name: String,
    /// Directory new part files are installed into
    pub project_dir: PathBuf,
}

impl CadContext {
    /// Resolve the context of the currently active document
    pub fn resolve(cad: &dyn CadAutomation) -> SyncResult<Self> {
        if !cad.is_running() {
            return Err(SyncError::NotConnected);
        }
        let document = cad.active_document().map_err(not_connected)?;
        let info = cad.document(document).map_err(not_connected)?;
        tracing::debug!("Active document {}", info.full_name().display());
        Ok(Self {
            document,
            document_name: info.name,
            project_dir: info.path,
        })
    }
}

fn not_connected(error: AutomationError) -> SyncError {
    match error {
        AutomationError::NotRunning => SyncError::NotConnected,
        other => SyncError::TransientExternalFailure(other),
    }
}

/// Check `current` and re-resolve it against the running application
///
/// A transient failure drops the context and retries once; if the retry
/// fails too the application counts as not connected.
pub fn reconnect(cad: &dyn CadAutomation, current: Option<&CadContext>) -> SyncResult<CadContext> {
    match CadContext::resolve(cad) {
        Ok(context) => {
            if current.is_some_and(|c| c.document != context.document) {
                tracing::info!("Active document changed to {}", context.document_name);
            }
            Ok(context)
        }
        Err(SyncError::TransientExternalFailure(e)) => {
            tracing::warn!("Connection check failed, retrying once: {}", e);
            CadContext::resolve(cad).map_err(|e| {
                tracing::warn!("Reconnect failed: {}", e);
                SyncError::NotConnected
            })
        }
        Err(e) => Err(e),
    }
}

/// Change published to connection observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected(CadContext),
    DocumentChanged(CadContext),
    Disconnected,
}

/// Current connection state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected(CadContext),
}

impl ConnectionStatus {
    /// Next state after a connect attempt, with the event it produces
    pub fn transition(
        &self,
        attempt: &SyncResult<CadContext>,
    ) -> (ConnectionStatus, Option<ConnectionEvent>) {
        match (self, attempt) {
            (ConnectionStatus::Disconnected, Ok(context)) => (
                ConnectionStatus::Connected(context.clone()),
                Some(ConnectionEvent::Connected(context.clone())),
            ),
            (ConnectionStatus::Connected(previous), Ok(context)) if previous == context => {
                (self.clone(), None)
            }
            (ConnectionStatus::Connected(_), Ok(context)) => (
                ConnectionStatus::Connected(context.clone()),
                Some(ConnectionEvent::DocumentChanged(context.clone())),
            ),
            (ConnectionStatus::Connected(_), Err(_)) => {
                (ConnectionStatus::Disconnected, Some(ConnectionEvent::Disconnected))
            }
            (ConnectionStatus::Disconnected, Err(_)) => (ConnectionStatus::Disconnected, None),
        }
    }

    /// Context of the connected application
    pub fn context(&self) -> Option<&CadContext> {
        match self {
            ConnectionStatus::Connected(context) => Some(context),
            ConnectionStatus::Disconnected => None,
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected(_))
    }
}

/// Tracks the connection and notifies observers over channels
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    status: ConnectionStatus,
    observers: Vec<mpsc::Sender<ConnectionEvent>>,
}

impl ConnectionMonitor {
    /// Create a disconnected monitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Register an observer
    pub fn subscribe(&mut self) -> mpsc::Receiver<ConnectionEvent> {
        let (sender, receiver) = mpsc::channel();
        self.observers.push(sender);
        receiver
    }

    /// Check the connection, reconnecting if needed
    pub fn refresh(&mut self, cad: &dyn CadAutomation) -> SyncResult<CadContext> {
        let attempt = reconnect(cad, self.status.context());
        self.apply(&attempt);
        attempt
    }

    /// Drop the connection
    pub fn disconnect(&mut self) {
        self.apply(&Err(SyncError::NotConnected));
    }

    fn apply(&mut self, attempt: &SyncResult<CadContext>) {
        let (status, event) = self.status.transition(attempt);
        self.status = status;
        if let Some(event) = event {
            tracing::debug!("Connection event: {:?}", event);
            self.observers.retain(|observer| observer.send(event.clone()).is_ok());
        }
    }
}
