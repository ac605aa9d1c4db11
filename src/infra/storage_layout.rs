use std::{env, fs, path::PathBuf};

use crate::infra::error::AppError;

const APP_DIR_NAME: &str = "bchat";
#[cfg(unix)]
const SESSION_DIR_MODE: u32 = 0o700;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub config_dir: PathBuf,
    pub session_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl StorageLayout {
    pub fn resolve() -> Result<Self, AppError> {
        let config_base = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .ok_or_else(|| AppError::StoragePathResolution {
                details: "unable to resolve config base directory (XDG_CONFIG_HOME/HOME)".into(),
            })?;

        Ok(Self::under(config_base.join(APP_DIR_NAME)))
    }

    pub fn under(config_dir: PathBuf) -> Self {
        Self {
            session_dir: config_dir.join("session"),
            log_dir: config_dir.join("logs"),
            config_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [&self.config_dir, &self.session_dir, &self.log_dir] {
            fs::create_dir_all(dir).map_err(|source| AppError::StorageDirCreate {
                path: dir.clone(),
                source,
            })?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(
                &self.session_dir,
                fs::Permissions::from_mode(SESSION_DIR_MODE),
            )
            .map_err(|source| AppError::StorageDirCreate {
                path: self.session_dir.clone(),
                source,
            })?;
        }

        Ok(())
    }

    pub fn session_file(&self) -> PathBuf {
        self.session_dir.join("session.json")
    }

    pub fn session_lock_file(&self) -> PathBuf {
        self.session_dir.join("session.lock")
    }
}
