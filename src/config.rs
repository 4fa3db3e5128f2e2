use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub story: StoryConfig,
    pub generator: GeneratorConfig,
    pub audio: AudioConfig,
    pub export: ExportConfig,
}

/// Story session configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoryConfig {
    pub language: String,
}

/// Remote generator endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub base_url: String,
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Speak narration clips aloud during play.
    pub narration: bool,
    /// Run the ambient drone pad during play.
    pub ambient: bool,
}

/// Export target configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory exports land in; None means the current directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            language: crate::defaults::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            narration: true,
            ambient: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { output_dir: None }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e.context(format!("Failed to load config from {}", path.display())))
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - DREAMQUEST_BASE_URL → generator.base_url
    /// - DREAMQUEST_LANGUAGE → story.language
    /// - DREAMQUEST_OUTPUT_DIR → export.output_dir
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("DREAMQUEST_BASE_URL")
            && !url.is_empty()
        {
            self.generator.base_url = url;
        }

        if let Ok(language) = std::env::var("DREAMQUEST_LANGUAGE")
            && !language.is_empty()
        {
            self.story.language = language;
        }

        if let Ok(dir) = std::env::var("DREAMQUEST_OUTPUT_DIR")
            && !dir.is_empty()
        {
            self.export.output_dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Resolved export directory.
    pub fn output_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/dreamquest/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dreamquest")
            .join("config.toml")
    }
}
