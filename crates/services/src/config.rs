//! Layered service configuration: defaults, then an optional TOML file, then
//! environment variables.

use std::env;
use std::path::{Path, PathBuf};

use quiz_core::analytics::{AnalyticsOptions, PacePolicy};
use quiz_core::model::{AppSettings, AppSettingsDraft};
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "studygen.toml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:studygen.sqlite3";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";

/// Connection details for the HTTP generation backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub image_model: String,
}

impl GenerationConfig {
    /// Build from validated settings. `None` when no API key is set, which
    /// disables generation.
    #[must_use]
    pub fn from_settings(settings: &AppSettings) -> Option<Self> {
        let api_key = settings.api_key()?.to_string();
        Some(Self {
            base_url: settings.api_base_url().unwrap_or(DEFAULT_BASE_URL).to_string(),
            api_key,
            model: settings.api_model().unwrap_or(DEFAULT_MODEL).to_string(),
            image_model: settings
                .image_model()
                .unwrap_or(DEFAULT_IMAGE_MODEL)
                .to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawServiceConfig {
    database_url: Option<String>,
    generation: AppSettingsDraft,
    analytics: Option<AnalyticsOptions>,
}

/// Resolved configuration for the services layer.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub settings: AppSettings,
    pub analytics: AnalyticsOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            settings: AppSettings::default(),
            analytics: AnalyticsOptions::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from `STUDYGEN_CONFIG` (or `studygen.toml` if present), then apply
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or if a
    /// value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("STUDYGEN_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let contents = read_optional(&path)?;
        Self::resolve(contents.as_deref(), |key| env::var(key).ok())
    }

    /// Resolve from optional TOML contents and an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the TOML is malformed or a value is invalid.
    pub fn resolve(
        toml_contents: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let raw: RawServiceConfig = match toml_contents {
            Some(contents) => toml::from_str(contents)?,
            None => RawServiceConfig::default(),
        };

        let settings = raw.generation.merge(env_draft(&lookup)).validate()?;
        let database_url = lookup("STUDYGEN_DB_URL")
            .filter(|url| !url.trim().is_empty())
            .or(raw.database_url)
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let mut analytics = raw.analytics.unwrap_or_default();
        if let Some(raw_pace) = lookup("STUDYGEN_PACE_POLICY") {
            analytics.pace = parse_pace(&raw_pace)?;
        }

        Ok(Self {
            database_url,
            settings,
            analytics,
        })
    }

    #[must_use]
    pub fn generation(&self) -> Option<GenerationConfig> {
        GenerationConfig::from_settings(&self.settings)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn env_draft(lookup: impl Fn(&str) -> Option<String>) -> AppSettingsDraft {
    AppSettingsDraft {
        api_key: lookup("STUDYGEN_AI_API_KEY"),
        api_model: lookup("STUDYGEN_AI_MODEL"),
        image_model: lookup("STUDYGEN_AI_IMAGE_MODEL"),
        api_base_url: lookup("STUDYGEN_AI_BASE_URL"),
        reference_style: lookup("STUDYGEN_REFERENCE_STYLE"),
    }
}

fn parse_pace(raw: &str) -> Result<PacePolicy, ConfigError> {
    match raw.trim() {
        "include_untimed" => Ok(PacePolicy::IncludeUntimed),
        "exclude_untimed" => Ok(PacePolicy::ExcludeUntimed),
        _ => Err(ConfigError::InvalidValue {
            key: "STUDYGEN_PACE_POLICY",
            raw: raw.to_string(),
        }),
    }
}
