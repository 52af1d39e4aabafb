use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Colour scheme for exported documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Top-level Ariadne configuration, matching `.ariadne/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AriadneConfig {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub prompt: PromptSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub ui: UiSection,
}

impl AriadneConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> crate::error::Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> crate::error::Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()).into())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::Invalid("model.name must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid(format!(
                "model.temperature must be within 0.0..=2.0, got {}",
                self.model.temperature
            )));
        }
        if self.model.provider != "gemini" {
            return Err(ConfigError::Invalid(format!(
                "Unknown provider: {}. Use: gemini",
                self.model.provider
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub provider: String,
    pub name: String,
    pub temperature: f64,
    /// Override for the endpoint root (e.g. a proxy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            name: "gemini-2.5-pro".to_string(),
            temperature: 0.7,
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptSection {
    /// Extra instructions appended to the system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instruction: Option<String>,
    /// Send every existing Q&A pair along as project context.
    #[serde(default)]
    pub include_project_context: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Snapshot file name, relative to the `.ariadne` directory.
    pub canvas_file: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            canvas_file: "canvas.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiSection {
    #[serde(default)]
    pub theme: Theme,
}
