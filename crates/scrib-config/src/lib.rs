//! Configuration management for scrib.
//!
//! Parses `scrib.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! The file describes one source document dialect: which wrapper tags are
//! transparent, which custom tags map to which rendering rule, how images are
//! handled and what chrome is pruned before rendering.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "scrib.toml";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the images directory.
    pub images_dir: Option<PathBuf>,
    /// Override data URI image extraction.
    pub extract_images: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Renderer dialect configuration.
    pub render: RenderSettings,
    /// Image handling configuration.
    pub images: ImagesConfig,
    /// Chrome pruning configuration.
    pub prune: PruneConfig,
    /// Output configuration.
    pub output: OutputConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Renderer dialect configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Wrapper tags rendered as their children.
    pub transparent_tags: Vec<String>,
    /// Classes marking inline code; `None` keeps the renderer default.
    pub inline_code_classes: Option<Vec<String>>,
    /// Attributes holding a code block language; `None` keeps the renderer default.
    pub language_attributes: Option<Vec<String>>,
    /// Extra tag to rule name mappings (e.g. `"x-title" = "h2"`).
    pub rules: BTreeMap<String, String>,
}

/// Image handling configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Decode `data:` image sources into files.
    pub extract: bool,
    /// Substrings identifying loading spinner image sources.
    pub spinner_patterns: Vec<String>,
    /// Reference emitted in place of spinner images.
    pub spinner_placeholder: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            extract: true,
            spinner_patterns: Vec::new(),
            spinner_placeholder: "spinner.gif".to_owned(),
        }
    }
}

/// Chrome pruning configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Tags dropped in addition to the built-in interactive/icon tags.
    pub tags: Vec<String>,
    /// Classes whose elements are dropped.
    pub classes: Vec<String>,
    /// Attributes whose presence drops an element.
    pub attributes: Vec<String>,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for extracted images, relative to the markdown output.
    pub images_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require every entry of a list to be non-blank.
fn require_non_empty_entries(values: &[String], field: &str) -> Result<(), ConfigError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "{field} cannot contain empty entries"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `scrib.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the configuration (after CLI overrides) is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(images_dir) = &settings.images_dir {
            self.output.images_dir.clone_from(images_dir);
        }
        if let Some(extract) = settings.extract_images {
            self.images.extract = extract;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_render()?;
        self.validate_images()?;
        self.validate_prune()?;
        self.validate_output()?;
        Ok(())
    }

    fn validate_render(&self) -> Result<(), ConfigError> {
        require_non_empty_entries(&self.render.transparent_tags, "render.transparent_tags")?;
        if let Some(classes) = &self.render.inline_code_classes {
            require_non_empty_entries(classes, "render.inline_code_classes")?;
        }
        if let Some(attributes) = &self.render.language_attributes {
            require_non_empty_entries(attributes, "render.language_attributes")?;
        }
        if self.render.rules.keys().any(|tag| tag.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "render.rules cannot map an empty tag".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_images(&self) -> Result<(), ConfigError> {
        require_non_empty_entries(&self.images.spinner_patterns, "images.spinner_patterns")?;
        if self.images.spinner_placeholder.trim().is_empty() {
            return Err(ConfigError::Validation(
                "images.spinner_placeholder cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_prune(&self) -> Result<(), ConfigError> {
        require_non_empty_entries(&self.prune.tags, "prune.tags")?;
        require_non_empty_entries(&self.prune.classes, "prune.classes")?;
        require_non_empty_entries(&self.prune.attributes, "prune.attributes")?;
        Ok(())
    }

    fn validate_output(&self) -> Result<(), ConfigError> {
        let images_dir = &self.output.images_dir;
        if images_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output.images_dir cannot be empty".to_owned(),
            ));
        }
        if images_dir.is_absolute() {
            return Err(ConfigError::Validation(
                "output.images_dir must be relative to the markdown output".to_owned(),
            ));
        }
        Ok(())
    }
}
