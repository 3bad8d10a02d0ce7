use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const DEFAULT_TIME_ZONE: &str = "Asia/Jerusalem";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("gleaner")
        .join("config.toml")
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.to_string()
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub userinfo_url: String,
    pub calendar_base_url: String,
    pub tasks_base_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            calendar_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            tasks_base_url: "https://tasks.googleapis.com/tasks/v1".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GleanerConfig {
    pub debug_logging: bool,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Language the input is usually written in, passed to the model as a hint.
    pub input_language: Option<String>,
    pub gemini: GeminiConfig,
    pub google: GoogleConfig,
}

impl Default for GleanerConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            time_zone: default_time_zone(),
            input_language: None,
            gemini: GeminiConfig::default(),
            google: GoogleConfig::default(),
        }
    }
}

/// Whether text analysis goes to the live model or the built-in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    Live,
    Demo,
}

/// Whether account calls go to Google or the built-in sample account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountMode {
    Live,
    Demo,
}

impl GleanerConfig {
    /// Load from `path` (or the default location) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        Ok(Self::from_file(&path)?.with_overrides(|key| std::env::var(key).ok()))
    }

    /// A missing file yields the defaults; anything unreadable, unparsable or
    /// invalid is a configuration error.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let config = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<Self>(&content)
                .map_err(|e| AppError::Configuration(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                return Err(AppError::Configuration(format!(
                    "{}: {}",
                    path.display(),
                    e
                )));
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply credential overrides from the environment (or any lookup).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")) {
            self.gemini.api_key = key;
        }
        if let Some(id) = non_empty("GOOGLE_CLIENT_ID") {
            self.google.client_id = id;
        }
        if let Some(secret) = non_empty("GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = secret;
        }
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<chrono_tz::Tz, AppError> {
        self.time_zone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| AppError::Configuration(format!("unknown time zone '{}'", self.time_zone)))
    }

    pub fn extraction_mode(&self) -> ExtractionMode {
        if self.gemini.api_key.trim().is_empty() {
            ExtractionMode::Demo
        } else {
            ExtractionMode::Live
        }
    }

    pub fn account_mode(&self) -> AccountMode {
        let id = self.google.client_id.trim();
        if id.is_empty() || id.starts_with("YOUR_") {
            AccountMode::Demo
        } else {
            AccountMode::Live
        }
    }
}
