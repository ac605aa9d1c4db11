use std::sync::{mpsc::Receiver, Arc};

use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    domain::events::BackendEvent,
    firebase::FirebaseBackend,
    infra::{config::AppConfig, contracts::SessionStore, storage_layout::StorageLayout},
};

pub struct AppContext {
    pub config: AppConfig,
    pub layout: StorageLayout,
    pub session_store: Arc<dyn SessionStore>,
    pub backend: Arc<FirebaseBackend>,
    /// Taken once by the UI event source.
    pub backend_events: Option<Receiver<BackendEvent>>,
    _log_guard: Option<WorkerGuard>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        layout: StorageLayout,
        session_store: Arc<dyn SessionStore>,
        backend: FirebaseBackend,
        backend_events: Receiver<BackendEvent>,
        log_guard: Option<WorkerGuard>,
    ) -> Self {
        Self {
            config,
            layout,
            session_store,
            backend: Arc::new(backend),
            backend_events: Some(backend_events),
            _log_guard: log_guard,
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("layout", &self.layout)
            .field("backend_events_taken", &self.backend_events.is_none())
            .finish_non_exhaustive()
    }
}
