use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const MIN_POLL_INTERVAL_MS: u64 = 250;

const ENV_API_KEY: &str = "BCHAT_FIREBASE_API_KEY";
const ENV_PROJECT_ID: &str = "BCHAT_FIREBASE_PROJECT_ID";
const ENV_CLIENT_ID: &str = "BCHAT_GOOGLE_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "BCHAT_GOOGLE_CLIENT_SECRET";
const ENV_LOG_LEVEL: &str = "BCHAT_LOG_LEVEL";

/// Builds the effective config: defaults, then the TOML file, then the environment.
pub fn load<F>(path: Option<&Path>, env: F) -> Result<AppConfig, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if config_path.exists() {
        let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
            path: config_path.clone(),
            source,
        })?;

        let file_config: FileConfig =
            toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
                path: config_path,
                source,
            })?;

        file_config.merge_into(&mut config);
    }

    apply_env_overrides(&mut config, env);
    validate(&config)?;

    Ok(config)
}

fn apply_env_overrides<F>(config: &mut AppConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = non_empty(ENV_API_KEY) {
        config.firebase.api_key = value;
    }
    if let Some(value) = non_empty(ENV_PROJECT_ID) {
        config.firebase.project_id = value;
    }
    if let Some(value) = non_empty(ENV_CLIENT_ID) {
        config.google.client_id = value;
    }
    if let Some(value) = non_empty(ENV_CLIENT_SECRET) {
        config.google.client_secret = value;
    }
    if let Some(value) = non_empty(ENV_LOG_LEVEL) {
        config.logging.level = value;
    }
}

fn validate(config: &AppConfig) -> Result<(), AppError> {
    if config.room.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        return Err(AppError::ConfigValue {
            key: "room.poll_interval_ms",
            details: format!("must be at least {MIN_POLL_INTERVAL_MS}"),
        });
    }

    if config.firebase.collection.trim().is_empty() || config.firebase.collection.contains('/') {
        return Err(AppError::ConfigValue {
            key: "firebase.collection",
            details: "must be a single non-empty collection id".to_owned(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn returns_defaults_when_file_is_missing() {
        let config = load(Some(Path::new("./missing-config.toml")), no_env).expect("config must load");

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn merges_file_values_over_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            r#"[logging]
level = "debug"

[firebase]
api_key = "file-key"
project_id = "bchat-dev"

[room]
prompt = "recommend a game to play"
"#,
        )
        .expect("must write test config");

        let config = load(Some(&config_path), no_env).expect("config must load");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.firebase.api_key, "file-key");
        assert_eq!(config.firebase.project_id, "bchat-dev");
        assert_eq!(config.firebase.collection, "messages");
        assert_eq!(config.room.prompt.as_deref(), Some("recommend a game to play"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[firebase]\napi_key = \"file-key\"\n").expect("write config");

        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, "env-key"),
            (ENV_CLIENT_ID, "client.apps.googleusercontent.com"),
            (ENV_PROJECT_ID, "   "),
        ]);

        let config = load(Some(&config_path), |key| env.get(key).map(|v| (*v).to_owned()))
            .expect("config must load");

        assert_eq!(config.firebase.api_key, "env-key");
        assert_eq!(config.google.client_id, "client.apps.googleusercontent.com");
        assert_eq!(config.firebase.project_id, "replace-me");
    }

    #[test]
    fn rejects_too_small_poll_interval() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[room]\npoll_interval_ms = 10\n").expect("write config");

        let error = load(Some(&config_path), no_env).expect_err("config must be rejected");

        assert!(matches!(
            error,
            AppError::ConfigValue {
                key: "room.poll_interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[firebase\napi_key = 1").expect("write config");

        let error = load(Some(&config_path), no_env).expect_err("config must fail");

        assert!(matches!(error, AppError::ConfigParse { .. }));
    }
}
