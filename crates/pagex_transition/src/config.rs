//! Transition configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! enter_duration_ms = 700
//! exit_duration_ms = 700
//! throttle_ms = 90
//! entering_policy = "hard-cut"     # or "overlap"
//! interrupt_policy = "ignore"      # or "queue-latest"
//!
//! [springs.translateY]
//! mass = 0.05
//! damping = 12
//! ```

use pagex_animation::{Channel, SpringConfigs, SpringOverrides};
use pagex_core::InterruptPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or validating a [`TransitionConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse transition config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid transition config: {0}")]
    Invalid(String),
}

/// What the outgoing page does while the next page is entering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnteringPolicy {
    /// The outgoing page disappears as soon as entering starts
    #[default]
    HardCut,
    /// The outgoing page stays rendered, motionless, until its exit begins
    Overlap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransitionConfig {
    /// Default entrance duration for pages without a route override
    pub enter_duration_ms: f64,
    /// Default exit duration for pages without a route override
    pub exit_duration_ms: f64,
    /// Spring retarget throttle window
    pub throttle_ms: f64,
    pub entering_policy: EnteringPolicy,
    pub interrupt_policy: InterruptPolicy,
    /// Per-channel spring overrides applied to every item
    pub springs: SpringOverrides,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            enter_duration_ms: default_duration(),
            exit_duration_ms: default_duration(),
            throttle_ms: default_throttle(),
            entering_policy: EnteringPolicy::default(),
            interrupt_policy: InterruptPolicy::default(),
            springs: SpringOverrides::new(),
        }
    }
}

fn default_duration() -> f64 {
    700.0
}

fn default_throttle() -> f64 {
    90.0
}

impl TransitionConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TransitionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("enter_duration_ms", self.enter_duration_ms)?;
        check_non_negative("exit_duration_ms", self.exit_duration_ms)?;
        check_non_negative("throttle_ms", self.throttle_ms)?;

        for (channel, options) in &self.springs {
            validate_spring(*channel, options.mass, options.stiffness, options.damping)?;
        }
        Ok(())
    }

    /// Default spring table with this config's overrides applied
    pub fn spring_configs(&self) -> SpringConfigs {
        SpringConfigs::with_overrides(&self.springs)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be a non-negative number, got {value}"
        )))
    }
}

fn validate_spring(
    channel: Channel,
    mass: Option<f32>,
    stiffness: Option<f32>,
    damping: Option<f32>,
) -> Result<(), ConfigError> {
    if let Some(mass) = mass {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "springs.{channel}.mass must be positive, got {mass}"
            )));
        }
    }
    for (field, value) in [("stiffness", stiffness), ("damping", damping)] {
        if let Some(value) = value {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "springs.{channel}.{field} must be non-negative, got {value}"
                )));
            }
        }
    }
    Ok(())
}
