use std::path::Path;

use anyhow::Result;

use crate::{
    cli::{Cli, Command},
    domain, firebase, infra,
    infra::{
        contracts::SessionStore, session_store::FileSessionStore, storage_layout::StorageLayout,
    },
    ui,
    usecases::{
        self, bootstrap,
        logout::{logout_and_reset, LogoutOutcome},
        startup::{plan_startup, StartupFlowState},
    },
};

const LOGOUT_BOOTSTRAP_FALLBACK: &str = "LOGOUT_BOOTSTRAP_FALLBACK";

pub fn run(cli: Cli) -> Result<()> {
    match cli.command_or_default() {
        Command::Run => run_shell(cli.config.as_deref()),
        Command::Logout => {
            let outcome = logout(cli.config.as_deref())?;
            tracing::info!(
                session_removed = outcome.session_removed,
                "logout completed"
            );
            if outcome.session_removed {
                println!("Signed out. The stored session was removed.");
            } else {
                println!("No stored session found. You are signed out.");
            }
            Ok(())
        }
    }
}

fn run_shell(config_path: Option<&Path>) -> Result<()> {
    let mut context = bootstrap::bootstrap(config_path)?;

    tracing::debug!(
        ui = ui::module_name(),
        domain = domain::module_name(),
        firebase = firebase::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    let startup = plan_startup(
        &context.layout,
        context.session_store.as_ref(),
        context.backend.as_ref(),
        context.config.startup.session_probe_timeout_ms,
    )?;

    if let Some(code) = startup.probe_warning {
        tracing::warn!(code, "session probe fell back to the stored profile");
    }

    match &startup.state {
        StartupFlowState::SignedOut => tracing::info!("starting signed out"),
        StartupFlowState::Restored(session) => {
            tracing::info!(uid = %session.uid, "starting with restored session")
        }
    }

    let mut shell = bootstrap::compose_shell(&mut context)?;
    ui::shell::start(
        &context,
        shell.event_source.as_mut(),
        shell.orchestrator.as_mut(),
    )?;

    drop(startup.lock_guard);
    Ok(())
}

/// Signs out through the backend when it can be built; otherwise clears the session file only.
fn logout(config_path: Option<&Path>) -> Result<LogoutOutcome> {
    match bootstrap::bootstrap(config_path) {
        Ok(context) => Ok(logout_and_reset(
            Some(context.backend.as_ref()),
            context.session_store.as_ref(),
        )?),
        Err(error) => {
            tracing::warn!(
                code = LOGOUT_BOOTSTRAP_FALLBACK,
                error = ?error,
                "bootstrap failed, clearing the local session directly"
            );
            let layout = StorageLayout::resolve()?;
            let store = FileSessionStore::new(layout.session_file());
            Ok(logout_and_reset(None, &store as &dyn SessionStore)?)
        }
    }
}
