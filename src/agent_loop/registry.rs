//! Process-wide registry of active runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use super::context::DiagnosticContext;
use super::driver::{RunControl, RunDriver};
use super::types::{RunId, RunResult};

/// Maps run ids to their control surfaces while the runs are alive.
///
/// Only control handles are shared; every run keeps its own controller.
#[derive(Clone, Default)]
pub struct RunRegistry {
    runs: Arc<Mutex<HashMap<RunId, RunControl>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<RunId, RunControl>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `driver` on the runtime. The run is registered before this
    /// returns and removed when it ends.
    pub fn launch(&self, driver: RunDriver, context: DiagnosticContext) -> JoinHandle<RunResult> {
        let run_id = driver.run_id();
        self.runs().insert(run_id, driver.control());
        let registry = self.clone();
        tokio::spawn(async move {
            let result = driver.run(context).await;
            registry.runs().remove(&run_id);
            result
        })
    }

    pub fn get(&self, run_id: RunId) -> Option<RunControl> {
        self.runs().get(&run_id).cloned()
    }

    pub fn active(&self) -> Vec<RunId> {
        self.runs().keys().copied().collect()
    }

    /// Ask every active run to stop.
    pub fn stop_all(&self) -> usize {
        let controls: Vec<RunControl> = self.runs().values().cloned().collect();
        controls.iter().filter(|control| control.stop()).count()
    }
}

impl std::fmt::Debug for RunRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRegistry")
            .field("active", &self.active())
            .finish()
    }
}
