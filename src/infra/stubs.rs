use std::sync::Mutex;

use anyhow::Result;

use crate::infra::{
    contracts::{ExternalOpener, SessionStore, StoredSession},
    error::AppError,
};

/// Records every opened target.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<String>>,
}

impl ExternalOpener for RecordingOpener {
    fn open(&self, target: &str) -> Result<()> {
        self.opened
            .lock()
            .expect("opener lock")
            .push(target.to_owned());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    pub session: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn with(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, AppError> {
        Ok(self.session.lock().expect("store lock").clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        *self.session.lock().expect("store lock") = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<bool, AppError> {
        Ok(self.session.lock().expect("store lock").take().is_some())
    }
}
