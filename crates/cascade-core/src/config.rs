use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::CascadeError {
    fn from(err: ConfigError) -> Self {
        crate::CascadeError::Config(err.to_string())
    }
}

/// Main configuration for Cascade
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CascadeConfig {
    /// Cascade engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Random graph and edit generation
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EngineConfig {
    /// Maximum steps per `cascade_step` slice (None = run to completion)
    #[serde(default)]
    pub step_budget: Option<u64>,

    /// Check the shortest-path tree invariant after every completed cascade
    #[serde(default)]
    pub verify_after_cascade: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorConfig {
    /// Number of vertices in generated graphs
    #[serde(default = "default_vertices")]
    pub vertices: usize,

    /// Erdős–Rényi edge probability
    #[serde(default = "default_edge_probability")]
    pub edge_probability: f64,

    /// Smallest generated edge weight
    #[serde(default = "default_min_weight")]
    pub min_weight: u32,

    /// Largest generated edge weight
    #[serde(default = "default_max_weight")]
    pub max_weight: u32,

    /// Edits per random batch
    #[serde(default = "default_edits_per_batch")]
    pub edits_per_batch: usize,

    /// Base seed; runs use `seed + run index`
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            vertices: default_vertices(),
            edge_probability: default_edge_probability(),
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            edits_per_batch: default_edits_per_batch(),
            seed: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_vertices() -> usize {
    10
}
fn default_edge_probability() -> f64 {
    0.5
}
fn default_min_weight() -> u32 {
    1
}
fn default_max_weight() -> u32 {
    10
}
fn default_edits_per_batch() -> usize {
    50
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager
pub struct ConfigManager {
    config: CascadeConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (`CASCADE_*`, `RUST_LOG`)
    /// 2. Config file (`./.cascade.toml`, then `~/.cascade/config.toml`)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load from an explicit file, still honouring environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: CascadeConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("Loaded configuration from {}", path.display()),
            None => info!("No config file found, using defaults"),
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    fn load_config_file() -> Result<(CascadeConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".cascade.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".cascade").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((CascadeConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<CascadeConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: CascadeConfig) -> CascadeConfig {
        if let Ok(budget) = std::env::var("CASCADE_STEP_BUDGET") {
            if let Ok(steps) = budget.parse() {
                config.engine.step_budget = Some(steps);
            }
        }
        if let Ok(verify) = std::env::var("CASCADE_VERIFY") {
            config.engine.verify_after_cascade = verify.to_lowercase() == "true" || verify == "1";
        }

        if let Ok(vertices) = std::env::var("CASCADE_VERTICES") {
            if let Ok(n) = vertices.parse() {
                config.generator.vertices = n;
            }
        }
        if let Ok(probability) = std::env::var("CASCADE_EDGE_PROBABILITY") {
            if let Ok(p) = probability.parse() {
                config.generator.edge_probability = p;
            }
        }
        if let Ok(seed) = std::env::var("CASCADE_SEED") {
            if let Ok(s) = seed.parse() {
                config.generator.seed = Some(s);
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("CASCADE_LOG_FORMAT") {
            config.logging.format = format;
        }

        config
    }

    fn validate_config(config: &CascadeConfig) -> Result<(), ConfigError> {
        let generator = &config.generator;
        if !(0.0..=1.0).contains(&generator.edge_probability) {
            return Err(ConfigError::ValidationError(format!(
                "edge_probability must be within [0, 1], got {}",
                generator.edge_probability
            )));
        }
        if generator.min_weight == 0 || generator.min_weight > generator.max_weight {
            return Err(ConfigError::ValidationError(format!(
                "weight range [{}, {}] must be positive and non-empty",
                generator.min_weight, generator.max_weight
            )));
        }
        if config.engine.step_budget == Some(0) {
            return Err(ConfigError::ValidationError(
                "step_budget must be at least 1".to_string(),
            ));
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn into_config(self) -> CascadeConfig {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = CascadeConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}
