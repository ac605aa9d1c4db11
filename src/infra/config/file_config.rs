use serde::Deserialize;

use crate::infra::config::{
    AppConfig, FirebaseConfig, GoogleConfig, LogConfig, RoomConfig, StartupConfig,
};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub firebase: Option<FileFirebaseConfig>,
    pub google: Option<FileGoogleConfig>,
    pub room: Option<FileRoomConfig>,
    pub startup: Option<FileStartupConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(firebase) = self.firebase {
            firebase.merge_into(&mut config.firebase);
        }

        if let Some(google) = self.google {
            google.merge_into(&mut config.google);
        }

        if let Some(room) = self.room {
            room.merge_into(&mut config.room);
        }

        if let Some(startup) = self.startup {
            startup.merge_into(&mut config.startup);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileFirebaseConfig {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub collection: Option<String>,
    pub auth_base_url: Option<String>,
    pub secure_token_base_url: Option<String>,
    pub firestore_base_url: Option<String>,
}

impl FileFirebaseConfig {
    fn merge_into(self, config: &mut FirebaseConfig) {
        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }
        if let Some(project_id) = self.project_id {
            config.project_id = project_id;
        }
        if let Some(collection) = self.collection {
            config.collection = collection;
        }
        if let Some(url) = self.auth_base_url {
            config.auth_base_url = url;
        }
        if let Some(url) = self.secure_token_base_url {
            config.secure_token_base_url = url;
        }
        if let Some(url) = self.firestore_base_url {
            config.firestore_base_url = url;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileGoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub oauth_base_url: Option<String>,
}

impl FileGoogleConfig {
    fn merge_into(self, config: &mut GoogleConfig) {
        if let Some(client_id) = self.client_id {
            config.client_id = client_id;
        }
        if let Some(client_secret) = self.client_secret {
            config.client_secret = client_secret;
        }
        if let Some(url) = self.oauth_base_url {
            config.oauth_base_url = url;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileRoomConfig {
    pub prompt: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

impl FileRoomConfig {
    fn merge_into(self, config: &mut RoomConfig) {
        if let Some(prompt) = self.prompt {
            config.prompt = Some(prompt).filter(|text| !text.trim().is_empty());
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileStartupConfig {
    pub session_probe_timeout_ms: Option<u64>,
}

impl FileStartupConfig {
    fn merge_into(self, config: &mut StartupConfig) {
        if let Some(timeout_ms) = self.session_probe_timeout_ms {
            config.session_probe_timeout_ms = timeout_ms;
        }
    }
}
