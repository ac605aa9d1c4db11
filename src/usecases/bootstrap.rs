use std::{
    path::Path,
    sync::{mpsc, Arc},
};

use anyhow::{Context, Result};

use crate::{
    firebase::FirebaseBackend,
    infra::{
        self,
        config::{AppConfig, FileConfigAdapter},
        contracts::{ConfigAdapter, SessionStore},
        opener::SystemOpener,
        session_store::FileSessionStore,
        storage_layout::StorageLayout,
    },
    ui::CrosstermEventSource,
    usecases::{
        context::AppContext,
        contracts::{AppEventSource, ShellOrchestrator},
        shell::DefaultShellOrchestrator,
    },
};

pub struct ShellComposition {
    pub event_source: Box<dyn AppEventSource>,
    pub orchestrator: Box<dyn ShellOrchestrator>,
}

/// Loads config, starts file logging and builds the backend client.
pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext> {
    let config = load_config(config_path)?;
    let layout = StorageLayout::resolve()?;
    layout.ensure_dirs()?;
    let log_guard = infra::logging::init(&config.logging, &layout.log_dir)?;

    tracing::debug!(
        config_dir = %layout.config_dir.display(),
        project_id = %config.firebase.project_id,
        "bootstrap configuration resolved"
    );

    let session_store: Arc<dyn SessionStore> =
        Arc::new(FileSessionStore::new(layout.session_file()));
    let (events_tx, events_rx) = mpsc::channel();
    let backend = FirebaseBackend::new(&config, Arc::clone(&session_store), events_tx)?;

    Ok(AppContext::new(
        config,
        layout,
        session_store,
        backend,
        events_rx,
        Some(log_guard),
    ))
}

pub fn compose_shell(context: &mut AppContext) -> Result<ShellComposition> {
    let backend_events = context
        .backend_events
        .take()
        .context("backend event channel is already attached to a shell")?;

    let orchestrator = DefaultShellOrchestrator::new(
        Arc::clone(&context.backend),
        Arc::clone(&context.backend),
        SystemOpener,
        context.config.room.prompt.clone(),
    );

    Ok(ShellComposition {
        event_source: Box::new(CrosstermEventSource::new(backend_events)),
        orchestrator: Box::new(orchestrator),
    })
}

fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    FileConfigAdapter::new(config_path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env_lock;

    #[test]
    fn loads_default_config_when_file_is_missing() {
        let _guard = env_lock();

        let config = load_config(Some(Path::new("./missing-config.toml")))
            .expect("config should load from defaults");

        assert_eq!(config.room, crate::infra::config::RoomConfig::default());
        assert_eq!(config.firebase.collection, "messages");
    }

    #[test]
    fn invalid_config_file_fails_bootstrap() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[room]\npoll_interval_ms = \"soon\"\n").expect("fixture");

        let result = load_config(Some(&path));

        assert!(result.is_err());
    }
}
