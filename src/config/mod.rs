// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::logging::LoggingConfig;
use crate::suggest::SuggestionConfig;
use crate::watermark::{ImageLimits, TilePolicy, WatermarkSettings};

/// Application configuration, loaded from YAML.
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default = "SuggestionConfig::from_env")]
    pub suggestions: SuggestionConfig,
    /// Initial watermark settings for new renders
    #[serde(default)]
    pub watermark: WatermarkSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            render: RenderConfig::default(),
            suggestions: SuggestionConfig::from_env(),
            watermark: WatermarkSettings::default(),
        }
    }
}

/// Compositing engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    #[serde(default)]
    pub tiling: TilePolicy,
    #[serde(default)]
    pub limits: ImageLimits,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Load from `path` when given, otherwise use defaults; validates either way.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.logging.validate()?;

        self.render
            .tiling
            .validate()
            .map_err(|e| format!("render: {}", e))?;
        self.render
            .limits
            .validate()
            .map_err(|e| format!("render: {}", e))?;

        self.suggestions.validate()?;

        self.watermark
            .validate()
            .map_err(|e| format!("watermark: {}", e))?;

        Ok(())
    }
}
