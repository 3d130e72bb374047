//! Credential lookup and endpoint configuration. Credentials come from a flat
//! JSON settings file or, when no file is present, from environment variables
//! carrying the same key names.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

pub const MUSIC_U_KEY: &str = "Cookie_MUSIC_U";
pub const CSRF_KEY: &str = "Cookie___csrf";
pub const BOT_URL_KEY: &str = "BOT_URL";

/// Environment variable that overrides the settings file location.
pub const SETTINGS_PATH_ENV: &str = "PARTNER_SETTINGS";
pub const DEFAULT_SETTINGS_PATH: &str = "setting.json";

pub const PROFILE_URL: &str = "https://music.163.com/api/nuser/account/get";
pub const TASK_URL: &str = "https://interface.music.163.com/api/music/partner/daily/task/get";
pub const EVALUATE_URL: &str = "https://interface.music.163.com/weapi/music/partner/work/evaluate";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file unreadable: {0}")]
    Io(String),
    #[error("settings parse failed: {0}")]
    Parse(String),
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Key-value lookup for cookies and the notification webhook.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Option<String>;
}

impl CredentialStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Reads a JSON object whose values are all strings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let parsed: HashMap<String, Value> =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(format!("{e}")))?;
        let mut values = HashMap::with_capacity(parsed.len());
        for (key, value) in parsed {
            match value {
                Value::String(text) => {
                    values.insert(key, text);
                }
                Value::Null => {}
                other => {
                    return Err(ConfigError::InvalidValue(format!(
                        "{key} must be a string, found {other}"
                    )))
                }
            }
        }
        Ok(Self { values })
    }

    /// Captures the known keys from the process environment.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Captures the known keys through `lookup`, which stands in for the
    /// process environment.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values = [MUSIC_U_KEY, CSRF_KEY, BOT_URL_KEY]
            .into_iter()
            .filter_map(|key| lookup(key).map(|v| (key.to_string(), v)))
            .collect();
        Self { values }
    }

    /// Loads the settings file named by `PARTNER_SETTINGS` (or `setting.json`),
    /// falling back to the environment when that file does not exist.
    pub fn discover() -> Result<Self, ConfigError> {
        let path = std::env::var(SETTINGS_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
        if Path::new(&path).exists() {
            Self::load(&path)
        } else {
            tracing::debug!(%path, "settings file absent, reading environment");
            Ok(Self::from_env())
        }
    }
}

impl CredentialStore for Settings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// URLs the orchestrator talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub profile: String,
    pub task: String,
    pub evaluate: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            profile: PROFILE_URL.to_string(),
            task: TASK_URL.to_string(),
            evaluate: EVALUATE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at `base`, keeping the production paths.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            profile: format!("{base}/api/nuser/account/get"),
            task: format!("{base}/api/music/partner/daily/task/get"),
            evaluate: format!("{base}/weapi/music/partner/work/evaluate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CredentialStore, Endpoints, Settings, BOT_URL_KEY, CSRF_KEY, MUSIC_U_KEY};
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_settings_file() {
        let payload = json!({
            "Cookie_MUSIC_U": "music-u",
            "Cookie___csrf": "csrf",
            "BOT_URL": "ignore"
        });
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();

        let settings = Settings::load(file.path()).expect("settings should load");
        assert_eq!(settings.get(MUSIC_U_KEY).as_deref(), Some("music-u"));
        assert_eq!(settings.get(CSRF_KEY).as_deref(), Some("csrf"));
        assert_eq!(settings.get(BOT_URL_KEY).as_deref(), Some("ignore"));
        assert_eq!(settings.get("missing"), None);
    }

    #[test]
    fn null_values_count_as_absent() {
        let settings = Settings::from_json(r#"{"BOT_URL": null}"#).unwrap();
        assert_eq!(settings.get(BOT_URL_KEY), None);
    }

    #[test]
    fn rejects_non_string_values() {
        let err = Settings::from_json(r#"{"Cookie_MUSIC_U": 42}"#).unwrap_err();
        assert!(format!("{err}").contains("Cookie_MUSIC_U must be a string"));
    }

    #[test]
    fn reports_unreadable_file() {
        let err = Settings::load("/nonexistent/partner/setting.json").unwrap_err();
        assert!(format!("{err}").contains("unreadable"));
    }

    #[test]
    fn reads_only_known_keys_from_env() {
        let env = HashMap::from([
            (CSRF_KEY, "env-csrf"),
            (BOT_URL_KEY, ""),
            ("UNRELATED", "x"),
        ]);
        let settings = Settings::from_env_with(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(settings.get(CSRF_KEY).as_deref(), Some("env-csrf"));
        assert_eq!(settings.get(BOT_URL_KEY).as_deref(), Some(""));
        assert_eq!(settings.get(MUSIC_U_KEY), None);
        assert_eq!(settings.get("UNRELATED"), None);
    }

    #[test]
    fn rebases_endpoints() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:1234/");
        assert_eq!(endpoints.profile, "http://127.0.0.1:1234/api/nuser/account/get");
        assert!(endpoints.evaluate.ends_with("/weapi/music/partner/work/evaluate"));
        assert!(Endpoints::default().task.starts_with("https://interface.music.163.com"));
    }
}
