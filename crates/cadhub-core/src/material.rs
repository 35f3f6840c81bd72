//! Available materials, scanned in the background
//!
//! The catalog is the one structure shared across threads: a background
//! scan fills it while the synchronizer reads it. Readers either poll
//! [`MaterialCatalog::contains`] or block on
//! [`MaterialCatalog::wait_until_complete`].

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};

use cadhub_automation::{ApartmentHandle, CadAutomation};

#[derive(Default)]
struct CatalogState {
    names: RwLock<BTreeSet<String>>,
    complete: Mutex<bool>,
    finished: Condvar,
}

/// Shared, progressively populated set of material names
#[derive(Clone, Default)]
pub struct MaterialCatalog {
    state: Arc<CatalogState>,
}

impl MaterialCatalog {
    /// Create an empty, incomplete catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog that is already complete
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let catalog = Self::new();
        catalog.extend(names);
        catalog.finish();
        catalog
    }

    /// Scan `library` on a background thread through the apartment
    pub fn populate<A>(&self, cad: ApartmentHandle<A>, library: PathBuf) -> JoinHandle<()>
    where
        A: CadAutomation + 'static,
    {
        let catalog = self.clone();
        std::thread::spawn(move || {
            let library_name = library.display().to_string();
            match cad.call(move |cad| cad.material_library(&library)) {
                Ok(Ok(names)) => {
                    tracing::info!("Loaded {} materials from {}", names.len(), library_name);
                    for name in names {
                        catalog.insert(name);
                    }
                }
                Ok(Err(e)) => tracing::warn!("Failed to read material library {}: {}", library_name, e),
                Err(e) => tracing::warn!("Material scan aborted: {}", e),
            }
            catalog.finish();
        })
    }

    /// Add a material name
    pub fn insert(&self, name: impl Into<String>) {
        self.state.names.write().insert(name.into());
    }

    /// Add several material names
    pub fn extend<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut guard = self.state.names.write();
        guard.extend(names.into_iter().map(Into::into));
    }

    /// Mark the scan as finished and wake waiting readers
    pub fn finish(&self) {
        let mut complete = self.state.complete.lock();
        *complete = true;
        self.state.finished.notify_all();
    }

    /// The scan has finished
    pub fn is_complete(&self) -> bool {
        *self.state.complete.lock()
    }

    /// Check if a material is known (case-sensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.state.names.read().contains(name)
    }

    /// Number of known materials
    pub fn len(&self) -> usize {
        self.state.names.read().len()
    }

    /// No material known yet
    pub fn is_empty(&self) -> bool {
        self.state.names.read().is_empty()
    }

    /// Names known so far, sorted
    pub fn snapshot(&self) -> Vec<String> {
        self.state.names.read().iter().cloned().collect()
    }

    /// Block until the scan finished or `timeout` elapsed
    ///
    /// Returns whether the catalog is complete.
    pub fn wait_until_complete(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut complete = self.state.complete.lock();
        while !*complete {
            if self
                .state
                .finished
                .wait_until(&mut complete, deadline)
                .timed_out()
            {
                break;
            }
        }
        *complete
    }
}

impl std::fmt::Debug for MaterialCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialCatalog")
            .field("len", &self.len())
            .field("complete", &self.is_complete())
            .finish()
    }
}
