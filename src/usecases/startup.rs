use std::{
    fs::{File, OpenOptions},
    path::PathBuf,
    time::Duration,
};

use fs2::FileExt;

use crate::{
    domain::session::Session,
    infra::{
        contracts::{SessionStore, StoredSession},
        error::AppError,
        storage_layout::StorageLayout,
    },
};

const STARTUP_PROBE_FALLBACK: &str = "STARTUP_PROBE_FALLBACK";
const STARTUP_SESSION_UNREADABLE: &str = "STARTUP_SESSION_UNREADABLE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupFlowState {
    SignedOut,
    Restored(Session),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeError {
    /// The provider refused the stored credentials.
    Rejected,
    Timeout,
    Unavailable,
}

/// Checks a stored session against the provider and installs it on success.
pub trait SessionProbe {
    fn probe(&self, stored: &StoredSession, timeout: Duration) -> Result<Session, ProbeError>;
}

/// Exclusive lock on the session directory, released on drop.
#[derive(Debug)]
pub struct SessionLockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        if let Err(error) = self.file.unlock() {
            tracing::warn!(path = %self.path.display(), error = %error, "failed to release session lock");
        }
    }
}

#[derive(Debug)]
pub struct StartupPlan {
    pub lock_guard: SessionLockGuard,
    pub state: StartupFlowState,
    pub probe_warning: Option<&'static str>,
}

pub fn plan_startup(
    layout: &StorageLayout,
    store: &dyn SessionStore,
    probe: &dyn SessionProbe,
    probe_timeout_ms: u64,
) -> Result<StartupPlan, AppError> {
    layout.ensure_dirs()?;
    let lock_guard = acquire_session_lock(layout.session_lock_file())?;

    let stored = match store.load() {
        Ok(stored) => stored,
        Err(error) => {
            tracing::warn!(
                code = STARTUP_SESSION_UNREADABLE,
                error = %error,
                "stored session could not be read, starting signed out"
            );
            store.clear()?;
            None
        }
    };

    let Some(stored) = stored else {
        return Ok(StartupPlan {
            lock_guard,
            state: StartupFlowState::SignedOut,
            probe_warning: None,
        });
    };

    let (state, probe_warning) =
        match probe.probe(&stored, Duration::from_millis(probe_timeout_ms)) {
            Ok(session) => (StartupFlowState::Restored(session), None),
            Err(ProbeError::Rejected) => {
                store.clear()?;
                (StartupFlowState::SignedOut, None)
            }
            Err(ProbeError::Timeout | ProbeError::Unavailable) => (
                StartupFlowState::Restored(session_from_stored(&stored)),
                Some(STARTUP_PROBE_FALLBACK),
            ),
        };

    Ok(StartupPlan {
        lock_guard,
        state,
        probe_warning,
    })
}

pub fn session_from_stored(stored: &StoredSession) -> Session {
    Session::new(
        stored.uid.clone(),
        stored.display_name.clone(),
        stored.avatar_url.clone(),
    )
}

fn acquire_session_lock(path: PathBuf) -> Result<SessionLockGuard, AppError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|source| AppError::SessionLockCreate {
            path: path.clone(),
            source,
        })?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(SessionLockGuard { file, path }),
        Err(source)
            if source.raw_os_error() == fs2::lock_contended_error().raw_os_error()
                || source.kind() == std::io::ErrorKind::WouldBlock =>
        {
            Err(AppError::SessionStoreBusy { path })
        }
        Err(source) => Err(AppError::SessionLockCreate { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::infra::stubs::MemorySessionStore;

    struct StubProbe {
        result: Result<Session, ProbeError>,
        calls: Cell<usize>,
    }

    impl StubProbe {
        fn with(result: Result<Session, ProbeError>) -> Self {
            Self {
                result,
                calls: Cell::new(0),
            }
        }
    }

    impl SessionProbe for StubProbe {
        fn probe(&self, _stored: &StoredSession, _timeout: Duration) -> Result<Session, ProbeError> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone()
        }
    }

    fn stored() -> StoredSession {
        StoredSession {
            uid: "u1".to_owned(),
            display_name: "Ann".to_owned(),
            avatar_url: Some("a.png".to_owned()),
            refresh_token: "refresh".to_owned(),
        }
    }

    fn layout() -> (tempfile::TempDir, StorageLayout) {
        let dir = tempfile::tempdir().expect("temp dir");
        let layout = StorageLayout::under(dir.path().join("bchat"));
        (dir, layout)
    }

    #[test]
    fn starts_signed_out_without_probing_when_nothing_is_stored() {
        let (_dir, layout) = layout();
        let probe = StubProbe::with(Err(ProbeError::Rejected));

        let plan = plan_startup(&layout, &MemorySessionStore::default(), &probe, 100)
            .expect("plan should build");

        assert_eq!(plan.state, StartupFlowState::SignedOut);
        assert_eq!(probe.calls.get(), 0);
    }

    #[test]
    fn restores_probed_session() {
        let (_dir, layout) = layout();
        let probe = StubProbe::with(Ok(Session::new("u1", "Ann Fresh", None)));

        let plan = plan_startup(&layout, &MemorySessionStore::with(stored()), &probe, 100)
            .expect("plan should build");

        assert_eq!(
            plan.state,
            StartupFlowState::Restored(Session::new("u1", "Ann Fresh", None))
        );
        assert_eq!(plan.probe_warning, None);
    }

    #[test]
    fn rejected_session_is_cleared() {
        let (_dir, layout) = layout();
        let store = MemorySessionStore::with(stored());
        let probe = StubProbe::with(Err(ProbeError::Rejected));

        let plan = plan_startup(&layout, &store, &probe, 100).expect("plan should build");

        assert_eq!(plan.state, StartupFlowState::SignedOut);
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn unreachable_provider_falls_back_to_stored_session() {
        let (_dir, layout) = layout();
        let probe = StubProbe::with(Err(ProbeError::Timeout));

        let plan = plan_startup(&layout, &MemorySessionStore::with(stored()), &probe, 100)
            .expect("plan should build");

        assert_eq!(
            plan.state,
            StartupFlowState::Restored(session_from_stored(&stored()))
        );
        assert_eq!(plan.probe_warning, Some(STARTUP_PROBE_FALLBACK));
    }

    #[test]
    fn second_instance_is_refused_while_lock_is_held() {
        let (_dir, layout) = layout();
        let probe = StubProbe::with(Err(ProbeError::Rejected));
        let store = MemorySessionStore::default();

        let _first = plan_startup(&layout, &store, &probe, 100).expect("first plan");
        let second = plan_startup(&layout, &store, &probe, 100);

        assert!(matches!(second, Err(AppError::SessionStoreBusy { .. })));
    }
}
