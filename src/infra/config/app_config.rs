use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub firebase: FirebaseConfig,
    pub google: GoogleConfig,
    pub room: RoomConfig,
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Which Firebase project to talk to. The base URLs can point at the local emulators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub collection: String,
    pub auth_base_url: String,
    pub secure_token_base_url: String,
    pub firestore_base_url: String,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: "replace-me".to_owned(),
            project_id: "replace-me".to_owned(),
            collection: "messages".to_owned(),
            auth_base_url: "https://identitytoolkit.googleapis.com".to_owned(),
            secure_token_base_url: "https://securetoken.googleapis.com".to_owned(),
            firestore_base_url: "https://firestore.googleapis.com".to_owned(),
        }
    }
}

/// OAuth client used for the Google device authorization flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub oauth_base_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: "replace-me".to_owned(),
            client_secret: "replace-me".to_owned(),
            oauth_base_url: "https://oauth2.googleapis.com".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomConfig {
    /// Banner shown above the message list.
    pub prompt: Option<String>,
    pub poll_interval_ms: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            prompt: None,
            poll_interval_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartupConfig {
    pub session_probe_timeout_ms: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            session_probe_timeout_ms: 1_500,
        }
    }
}
