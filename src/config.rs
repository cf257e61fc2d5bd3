//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::stack::{SHORT_PREFIX_MAX, StackRequest};
use crate::topology::TopologyRequest;
use crate::workload::WorkloadRequest;

/// Stack configuration derived from defaults, configuration files,
/// environment variables, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "NETLOOM",
    discovery(
        app_name = "netloom",
        env_var = "NETLOOM_CONFIG_PATH",
        config_file_name = "netloom.toml",
        dotfile_name = ".netloom.toml",
        project_file_name = "netloom.toml"
    )
)]
pub struct StackConfig {
    /// Stack-wide naming prefix applied to every resource.
    #[ortho_config(default = "netloom-lab".to_owned())]
    pub prefix: String,
    /// Length-constrained naming root for providers that cap name length.
    #[ortho_config(default = "nlm".to_owned())]
    pub short_prefix: String,
    /// Project marker tagged onto every resource for out-of-band
    /// resource-group discovery.
    #[ortho_config(default = "NetloomLab".to_owned())]
    pub project: String,
    /// Base region locator; zone letters are suffixed onto it.
    #[ortho_config(default = "eu-west-1".to_owned())]
    pub region: String,
    /// Number of independently NAT-isolated availability zones.
    #[ortho_config(default = 2)]
    pub az_count: u8,
    /// Zone availability reported by the provider, when known. Leave unset
    /// to defer the check to the provisioning runtime.
    pub zones_available: Option<u8>,
    /// Container image reference for the workload.
    #[ortho_config(default = "nginx".to_owned())]
    pub image_uri: String,
    /// Name of the single container in the task definition.
    #[ortho_config(default = "app".to_owned())]
    pub container_name: String,
    /// Task CPU units.
    #[ortho_config(default = 256)]
    pub cpu: u32,
    /// Task memory in MiB.
    #[ortho_config(default = 512)]
    pub memory: u32,
    /// Port exposed by the container and targeted by the load balancer.
    #[ortho_config(default = 80)]
    pub container_port: u16,
    /// Number of task copies the service keeps running.
    #[ortho_config(default = 1)]
    pub desired_count: u32,
}

/// Per-invocation overrides layered on top of the loaded configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StackOverrides {
    /// Overrides the naming prefix.
    pub prefix: Option<String>,
    /// Overrides the region locator.
    pub region: Option<String>,
    /// Overrides the availability-zone count.
    pub az_count: Option<u8>,
    /// Overrides the container image reference.
    pub image_uri: Option<String>,
    /// Overrides the task CPU units.
    pub cpu: Option<u32>,
    /// Overrides the task memory.
    pub memory: Option<u32>,
    /// Overrides the container port.
    pub container_port: Option<u16>,
    /// Overrides the desired task count.
    pub desired_count: Option<u32>,
}

/// Metadata for a configuration field, used to generate actionable error
/// messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl StackConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to netloom.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags
    /// in that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge
    /// sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments.
    /// Values still merge defaults, configuration files, and environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("netloom")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies per-invocation overrides on top of the loaded values.
    #[must_use]
    pub fn override_with(mut self, overrides: &StackOverrides) -> Self {
        if let Some(prefix) = &overrides.prefix {
            self.prefix = prefix.clone();
        }
        if let Some(region) = &overrides.region {
            self.region = region.clone();
        }
        if let Some(az_count) = overrides.az_count {
            self.az_count = az_count;
        }
        if let Some(image_uri) = &overrides.image_uri {
            self.image_uri = image_uri.clone();
        }
        if let Some(cpu) = overrides.cpu {
            self.cpu = cpu;
        }
        if let Some(memory) = overrides.memory {
            self.memory = memory;
        }
        if let Some(container_port) = overrides.container_port {
            self.container_port = container_port;
        }
        if let Some(desired_count) = overrides.desired_count {
            self.desired_count = desired_count;
        }
        self
    }

    /// Builds a [`StackRequest`] from the configured values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn as_request(&self) -> Result<StackRequest, ConfigError> {
        self.validate()?;
        let topology =
            TopologyRequest::new(&self.region, self.az_count).zones_available(self.zones_available);
        let workload = WorkloadRequest::new(
            &self.image_uri,
            &self.container_name,
            self.cpu,
            self.memory,
            self.container_port,
        )
        .desired_count(self.desired_count);
        Ok(StackRequest::new(
            &self.prefix,
            &self.short_prefix,
            &self.project,
            topology,
            workload,
        ))
    }

    /// Performs semantic validation on the configured values. Error
    /// messages include guidance on how to provide missing values via
    /// environment variables or configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required field is empty or a value
    /// is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.prefix,
            &FieldMetadata::new("naming prefix", "NETLOOM_PREFIX", "prefix"),
        )?;
        Self::require_field(
            &self.short_prefix,
            &FieldMetadata::new(
                "short naming prefix",
                "NETLOOM_SHORT_PREFIX",
                "short_prefix",
            ),
        )?;
        Self::require_field(
            &self.project,
            &FieldMetadata::new("project marker", "NETLOOM_PROJECT", "project"),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("region locator", "NETLOOM_REGION", "region"),
        )?;
        Self::require_field(
            &self.image_uri,
            &FieldMetadata::new("container image", "NETLOOM_IMAGE_URI", "image_uri"),
        )?;
        Self::require_field(
            &self.container_name,
            &FieldMetadata::new("container name", "NETLOOM_CONTAINER_NAME", "container_name"),
        )?;
        if self.short_prefix.trim().len() > SHORT_PREFIX_MAX {
            return Err(ConfigError::InvalidValue(format!(
                "short_prefix must be at most {SHORT_PREFIX_MAX} characters"
            )));
        }
        if self.az_count == 0 {
            return Err(ConfigError::InvalidValue(String::from(
                "az_count must be at least 1",
            )));
        }
        if self.cpu == 0 || self.memory == 0 {
            return Err(ConfigError::InvalidValue(String::from(
                "cpu and memory must be non-zero",
            )));
        }
        if self.container_port == 0 {
            return Err(ConfigError::InvalidValue(String::from(
                "container_port must be non-zero",
            )));
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configured value is out of range.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
