use std::{
    fs::{self, OpenOptions},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::infra::{
    contracts::{SessionStore, StoredSession},
    error::AppError,
};

/// Owner-only mode for the session file; it carries a refresh token.
#[cfg(unix)]
const SESSION_FILE_MODE: u32 = 0o600;

/// JSON session file written atomically through a sibling `.tmp` file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, AppError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AppError::SessionIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| AppError::SessionDecode {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        let encoded = serde_json::to_vec_pretty(session).map_err(|source| {
            AppError::SessionDecode {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        write_private(&tmp_path, &encoded)
            .and_then(|()| fs::rename(&tmp_path, &self.path))
            .map_err(|source| AppError::SessionIo {
                path: self.path.clone(),
                source,
            })
    }

    fn clear(&self) -> Result<bool, AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AppError::SessionIo {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(SESSION_FILE_MODE);
    }

    let mut file = options.open(path)?;

    // A leftover tmp file keeps its old mode; `mode` only applies on create.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(SESSION_FILE_MODE))?;
    }

    file.write_all(contents)?;
    file.sync_all()
}
