use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Learner-level settings for the generation collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppSettings {
    api_key: Option<String>,
    api_model: Option<String>,
    image_model: Option<String>,
    api_base_url: Option<String>,
    reference_style: Option<String>,
}

/// Unvalidated settings, as read from a config file or the environment.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppSettingsDraft {
    pub api_key: Option<String>,
    pub api_model: Option<String>,
    pub image_model: Option<String>,
    pub api_base_url: Option<String>,
    pub reference_style: Option<String>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppSettingsError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl AppSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft into settings.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppSettingsError` if the base URL is present but invalid.
    pub fn validate(self) -> Result<AppSettings, AppSettingsError> {
        let api_key = normalize_optional(self.api_key);
        let api_model = normalize_optional(self.api_model);
        let image_model = normalize_optional(self.image_model);
        let api_base_url = normalize_optional(self.api_base_url);
        let reference_style = normalize_optional(self.reference_style);

        if let Some(url) = api_base_url.as_ref() {
            if Url::parse(url).is_err() {
                return Err(AppSettingsError::InvalidBaseUrl(url.clone()));
            }
        }

        Ok(AppSettings {
            api_key,
            api_model,
            image_model,
            api_base_url,
            reference_style,
        })
    }

    /// Trim every value and drop the blank ones.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            api_key: normalize_optional(self.api_key),
            api_model: normalize_optional(self.api_model),
            image_model: normalize_optional(self.image_model),
            api_base_url: normalize_optional(self.api_base_url),
            reference_style: normalize_optional(self.reference_style),
        }
    }

    /// Overlay `other` on top of this draft; values set in `other` win.
    ///
    /// Both drafts are normalized first, so a blank value in `other` never
    /// hides a real one here.
    #[must_use]
    pub fn merge(self, other: AppSettingsDraft) -> Self {
        let base = self.normalized();
        let other = other.normalized();
        Self {
            api_key: other.api_key.or(base.api_key),
            api_model: other.api_model.or(base.api_model),
            image_model: other.image_model.or(base.image_model),
            api_base_url: other.api_base_url.or(base.api_base_url),
            reference_style: other.reference_style.or(base.reference_style),
        }
    }
}

impl AppSettings {
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub fn api_model(&self) -> Option<&str> {
        self.api_model.as_deref()
    }

    #[must_use]
    pub fn image_model(&self) -> Option<&str> {
        self.image_model.as_deref()
    }

    #[must_use]
    pub fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }

    /// Sample text whose style generated questions should imitate.
    #[must_use]
    pub fn reference_style(&self) -> Option<&str> {
        self.reference_style.as_deref()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_become_none() {
        let settings = AppSettingsDraft {
            api_key: Some("   ".into()),
            api_model: Some(" gpt-4o-mini ".into()),
            ..AppSettingsDraft::default()
        }
        .validate()
        .unwrap();

        assert_eq!(settings.api_key(), None);
        assert_eq!(settings.api_model(), Some("gpt-4o-mini"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = AppSettingsDraft {
            api_base_url: Some("not a url".into()),
            ..AppSettingsDraft::default()
        }
        .validate()
        .unwrap_err();

        assert!(matches!(err, AppSettingsError::InvalidBaseUrl(_)));
    }

    #[test]
    fn merge_prefers_overlay_values() {
        let base = AppSettingsDraft {
            api_key: Some("base".into()),
            api_model: Some("base-model".into()),
            ..AppSettingsDraft::default()
        };
        let overlay = AppSettingsDraft {
            api_key: Some("overlay".into()),
            ..AppSettingsDraft::default()
        };

        let merged = base.merge(overlay).validate().unwrap();
        assert_eq!(merged.api_key(), Some("overlay"));
        assert_eq!(merged.api_model(), Some("base-model"));
    }

    #[test]
    fn blank_overlay_does_not_hide_base_value() {
        let base = AppSettingsDraft {
            api_key: Some("sk-file".into()),
            ..AppSettingsDraft::default()
        };
        let overlay = AppSettingsDraft {
            api_key: Some("  ".into()),
            reference_style: Some(" Case studies. ".into()),
            ..AppSettingsDraft::default()
        };

        let merged = base.merge(overlay);
        assert_eq!(merged.api_key.as_deref(), Some("sk-file"));
        assert_eq!(merged.reference_style.as_deref(), Some("Case studies."));
    }
}
