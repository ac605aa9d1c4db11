use anyhow::Result;

use crate::infra::{config::AppConfig, error::AppError};

pub trait ConfigAdapter {
    fn load(&self) -> Result<AppConfig>;
}

pub trait ExternalOpener {
    fn open(&self, target: &str) -> Result<()>;
}

/// Persisted sign-in state. The refresh token is the only secret kept on disk.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredSession {
    pub uid: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub refresh_token: String,
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("uid", &self.uid)
            .field("display_name", &self.display_name)
            .field("avatar_url", &self.avatar_url)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>, AppError>;
    fn save(&self, session: &StoredSession) -> Result<(), AppError>;
    /// Returns whether a stored session existed.
    fn clear(&self) -> Result<bool, AppError>;
}
