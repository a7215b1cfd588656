use crate::time::NegativeDeliveryPolicy;
use crate::views::ViewSettings;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file within the config directory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }

    /// Read `config.toml` from this directory. A missing file yields defaults.
    pub fn load_config(&self) -> Result<AppConfig> {
        let config_path = self.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub views: ViewsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub compression: Option<String>,
    pub infer_schema_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub top_n: usize,
    pub price_decimals: u32,
    pub display_decimals: u32,
    pub sample_size: usize,
    pub sample_seed: u64,
    pub negative_delivery: NegativeDeliveryPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set (error, warn, info, debug, trace)
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            views: ViewsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        let settings = ViewSettings::default();
        Self {
            top_n: settings.top_n,
            price_decimals: settings.price_decimals,
            display_decimals: settings.display_decimals,
            sample_size: settings.sample_size,
            sample_seed: settings.sample_seed,
            negative_delivery: settings.negative_delivery,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let mut config = AppConfig::default();

        let user_config = ConfigManager::new(app_name)?.load_config()?;
        config.merge(user_config);

        config.validate()?;

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.views.merge(other.views);
        self.logging.merge(other.logging);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.views.top_n == 0 {
            return Err(eyre!("top_n must be greater than 0"));
        }

        if self.views.price_decimals > 10 || self.views.display_decimals > 10 {
            return Err(eyre!("decimal places must be between 0 and 10"));
        }

        if let Some(name) = &self.file_loading.compression {
            if shoplens_cli::CompressionFormat::from_name(name).is_none() {
                return Err(eyre!(
                    "Invalid compression: {}. Must be 'gzip', 'zstd', 'bzip2', or 'xz'",
                    name
                ));
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" | "off" => {}
            _ => {
                return Err(eyre!(
                    "Invalid logging level: {}. Must be 'error', 'warn', 'info', 'debug', 'trace', or 'off'",
                    self.logging.level
                ))
            }
        }

        Ok(())
    }

    /// View settings with CLI overrides applied on top of the config
    pub fn view_settings(&self, args: &crate::Args) -> ViewSettings {
        ViewSettings {
            top_n: args.top_n.unwrap_or(self.views.top_n),
            price_decimals: self.views.price_decimals,
            display_decimals: self.views.display_decimals,
            sample_size: self.views.sample_size,
            sample_seed: args.seed.unwrap_or(self.views.sample_seed),
            negative_delivery: self.views.negative_delivery,
        }
    }
}

// Merge implementations for each config section
impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
        if other.infer_schema_length.is_some() {
            self.infer_schema_length = other.infer_schema_length;
        }
    }
}

impl ViewsConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ViewsConfig::default();
        if other.top_n != default.top_n {
            self.top_n = other.top_n;
        }
        if other.price_decimals != default.price_decimals {
            self.price_decimals = other.price_decimals;
        }
        if other.display_decimals != default.display_decimals {
            self.display_decimals = other.display_decimals;
        }
        if other.sample_size != default.sample_size {
            self.sample_size = other.sample_size;
        }
        if other.sample_seed != default.sample_seed {
            self.sample_seed = other.sample_seed;
        }
        if other.negative_delivery != default.negative_delivery {
            self.negative_delivery = other.negative_delivery;
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.level != LoggingConfig::default().level {
            self.level = other.level;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
