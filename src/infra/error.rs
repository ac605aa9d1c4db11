use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {details}")]
    ConfigValue { key: &'static str, details: String },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("failed to resolve storage path: {details}")]
    StoragePathResolution { details: String },
    #[error("failed to create storage directory {path}: {source}")]
    StorageDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create session lock at {path}: {source}")]
    SessionLockCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session store at {path} is used by another bchat process")]
    SessionStoreBusy { path: PathBuf },
    #[error("failed to access session file at {path}: {source}")]
    SessionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode session file at {path}: {source}")]
    SessionDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to start backend runtime: {0}")]
    BackendRuntime(#[source] std::io::Error),
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
