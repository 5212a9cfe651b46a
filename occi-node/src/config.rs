//! Configuration management for the OCCI node.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use occi_common::LogFormat;
use occi_core::backends::ComputeSettings;
use occi_nova::{Flavor, ImageMeta};
use serde::Deserialize;
use thiserror::Error;

use crate::cli::Args;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compute service behaviour
    pub service: ServiceConfig,
    /// Resource templates offered to clients
    pub flavors: Vec<FlavorConfig>,
    /// Images seeded into the image service; empty keeps its own catalog
    pub images: Vec<ImageConfig>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            flavors: Flavor::defaults().into_iter().map(FlavorConfig::from).collect(),
            images: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// Apply CLI argument overrides to the configuration.
    pub fn with_cli_overrides(mut self, args: &Args) -> Self {
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }

        if let Some(ref format) = args.log_format {
            self.logging.format = format.clone();
        }

        if let Some(ref network) = args.default_network {
            self.service.default_network = network.clone();
        }

        if let Some(secs) = args.reclaim_interval {
            self.service.reclaim_instance_interval_secs = secs;
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.password_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "service.password_length".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.service.default_network.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "service.default_network".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if let Some(ref flavor) = self.service.default_flavor {
            if !self.flavors.iter().any(|f| &f.name == flavor) {
                return Err(ConfigError::InvalidValue {
                    field: "service.default_flavor".to_string(),
                    message: format!("{} is not one of the configured flavors", flavor),
                });
            }
        }

        if let Some(dup) = self
            .flavors
            .iter()
            .enumerate()
            .find(|(i, f)| self.flavors[..*i].iter().any(|g| g.name == f.name))
            .map(|(_, f)| f)
        {
            return Err(ConfigError::InvalidValue {
                field: "flavors".to_string(),
                message: format!("flavor {} is listed twice", dup.name),
            });
        }

        if LogFormat::parse(&self.logging.format).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "logging.format".to_string(),
                message: "must be one of: pretty, json".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                message: format!("must be one of: {:?}", valid_levels),
            });
        }

        Ok(())
    }

    /// Settings handed to the compute backend.
    pub fn compute_settings(&self) -> ComputeSettings {
        ComputeSettings {
            default_network: self.service.default_network.clone(),
            password_length: self.service.password_length,
            reclaim_instance_interval: Duration::from_secs(self.service.reclaim_instance_interval_secs),
            default_flavor: self.service.default_flavor.clone(),
            quota_retry_after: Duration::from_secs(self.service.quota_retry_after_secs),
        }
    }

    pub fn flavor_catalog(&self) -> Vec<Flavor> {
        self.flavors
            .iter()
            .map(|f| Flavor::new(f.name.clone(), f.vcpus, f.memory_mb, f.root_gb))
            .collect()
    }

    pub fn image_catalog(&self) -> Vec<ImageMeta> {
        self.images
            .iter()
            .map(|i| {
                let mut image = ImageMeta::new(i.id.clone(), i.name.clone());
                image.container_format = i.container_format.clone();
                image.disk_format = i.disk_format.clone();
                if let Some(ref arch) = i.architecture {
                    image = image.with_property("architecture", arch.clone());
                }
                image
            })
            .collect()
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.logging.format).unwrap_or_default()
    }
}

/// Compute service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Network every compute resource gets linked to
    pub default_network: String,
    /// Length of generated admin passwords
    pub password_length: usize,
    /// Seconds before deleted instances are reclaimed (0 = hard delete)
    pub reclaim_instance_interval_secs: u64,
    /// Flavor used when no resource template is attached
    pub default_flavor: Option<String>,
    /// Retry hint for quota failures that carry none
    pub quota_retry_after_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_network: "/network/DEFAULT_NETWORK".to_string(),
            password_length: 12,
            reclaim_instance_interval_secs: 0,
            default_flavor: Some("m1.small".to_string()),
            quota_retry_after_secs: 0,
        }
    }
}

/// A resource template.
#[derive(Debug, Clone, Deserialize)]
pub struct FlavorConfig {
    pub name: String,
    pub vcpus: u32,
    pub memory_mb: u64,
    #[serde(default)]
    pub root_gb: u64,
}

/// An image seeded into the image service.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_image_format")]
    pub container_format: String,
    #[serde(default = "default_image_format")]
    pub disk_format: String,
    #[serde(default)]
    pub architecture: Option<String>,
}

impl From<Flavor> for FlavorConfig {
    fn from(flavor: Flavor) -> Self {
        Self {
            name: flavor.name,
            vcpus: flavor.vcpus,
            memory_mb: flavor.memory_mb,
            root_gb: flavor.root_gb,
        }
    }
}

fn default_image_format() -> String {
    "ami".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (pretty, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
