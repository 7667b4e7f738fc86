//! # Configuration
//!
//! Configuration surface for the render graph core: engine-wide logging/debug
//! toggles, per-renderer frame-in-flight tuning, and per-transfer-pool sizing.
//! All types are `serde`-serializable so applications can persist them as TOML
//! or RON alongside the rest of their settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config value failed a semantic validation check.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// TOML (de)serialization failed.
    #[error("toml error: {0}")]
    Toml(String),

    /// RON (de)serialization failed.
    #[error("ron error: {0}")]
    Ron(String),
}

/// Marker trait for configuration types that can round-trip through TOML/RON.
pub trait Config: Serialize + for<'de> Deserialize<'de> + Sized {
    /// Serialize to a TOML string.
    fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    /// Parse from a TOML string.
    fn from_toml(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    /// Serialize to a RON string.
    fn to_ron(&self) -> Result<String, ConfigError> {
        ron::to_string(self).map_err(|e| ConfigError::Ron(e.to_string()))
    }

    /// Parse from a RON string.
    fn from_ron(s: &str) -> Result<Self, ConfigError> {
        ron::from_str(s).map_err(|e| ConfigError::Ron(e.to_string()))
    }
}

/// Core engine behavior: logging level and debug toggles.
///
/// Kept close to the ambient engine config used throughout the codebase —
/// logging/debug settings are orthogonal to the render-graph's own scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log level passed through to `env_logger` (`"trace"`, `"debug"`, `"info"`, …).
    pub log_level: String,
    /// Whether to enable debug-only validation and extra logging.
    pub debug_mode: bool,
}

impl EngineConfig {
    /// Create a new engine configuration with sensible defaults.
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable debug mode.
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}

/// Configuration for a single renderer's render graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderGraphConfig {
    /// Maximum frames that may be in flight simultaneously.
    pub max_frames_in_flight: usize,
    /// Whether to enable Vulkan validation layers. `None` means auto-detect
    /// from the build profile.
    pub enable_validation: Option<bool>,
}

impl RenderGraphConfig {
    /// Create a new render graph configuration with defaults.
    pub fn new() -> Self {
        Self {
            max_frames_in_flight: 2,
            enable_validation: None,
        }
    }

    /// Set the maximum number of frames in flight.
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Explicitly enable or disable validation layers.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Enable validation in debug builds, disable in release builds.
    pub fn with_auto_validation(mut self) -> Self {
        self.enable_validation = Some(cfg!(debug_assertions));
        self
    }

    /// Validate the configuration, rejecting nonsensical values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frames_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "max_frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.max_frames_in_flight > 8 {
            return Err(ConfigError::Invalid(
                "max_frames_in_flight should not exceed 8".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RenderGraphConfig {
    fn default() -> Self {
        Self::new().with_auto_validation()
    }
}

impl Config for RenderGraphConfig {}

/// Configuration for the transfer engine's pools (§4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPoolConfig {
    /// Whether to request a dedicated transfer-only queue when the device
    /// exposes one, instead of sharing the graphics queue.
    pub dedicated_transfer_queue: bool,
    /// Minimum staging buffer allocation granularity, in bytes. Requests
    /// smaller than this are rounded up; amortizes frequent small transfers.
    pub staging_block_size: usize,
}

impl TransferPoolConfig {
    /// Create a new transfer pool configuration with defaults.
    pub fn new() -> Self {
        Self {
            dedicated_transfer_queue: true,
            staging_block_size: 64 * 1024,
        }
    }

    /// Toggle the dedicated transfer queue preference.
    pub fn with_dedicated_transfer_queue(mut self, enabled: bool) -> Self {
        self.dedicated_transfer_queue = enabled;
        self
    }

    /// Set the staging block size.
    pub fn with_staging_block_size(mut self, bytes: usize) -> Self {
        self.staging_block_size = bytes;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staging_block_size == 0 {
            return Err(ConfigError::Invalid(
                "staging_block_size must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TransferPoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for TransferPoolConfig {}

/// Top-level configuration aggregating the engine, render graph, and
/// transfer-pool settings an application needs to construct a `Renderer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Engine-wide logging/debug configuration.
    pub engine: EngineConfig,
    /// Render graph configuration.
    pub graph: RenderGraphConfig,
    /// Transfer engine pool configuration.
    pub transfer: TransferPoolConfig,
}

impl ApplicationConfig {
    /// Create a new application configuration with defaults.
    pub fn new() -> Self {
        Self {
            engine: EngineConfig::default(),
            graph: RenderGraphConfig::default(),
            transfer: TransferPoolConfig::default(),
        }
    }

    /// Validate every nested configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.graph.validate()?;
        self.transfer.validate()?;
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_graph_config_rejects_zero_frames() {
        let cfg = RenderGraphConfig::new().with_max_frames_in_flight(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn render_graph_config_rejects_excessive_frames() {
        let cfg = RenderGraphConfig::new().with_max_frames_in_flight(9);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn render_graph_config_accepts_defaults() {
        assert!(RenderGraphConfig::default().validate().is_ok());
    }

    #[test]
    fn transfer_pool_config_rejects_zero_block_size() {
        let cfg = TransferPoolConfig::new().with_staging_block_size(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn application_config_round_trips_through_toml() {
        let cfg = ApplicationConfig::default();
        let toml = cfg.to_toml().expect("serialize");
        let restored = ApplicationConfig::from_toml(&toml).expect("deserialize");
        assert_eq!(cfg.graph.max_frames_in_flight, restored.graph.max_frames_in_flight);
    }

    #[test]
    fn application_config_round_trips_through_ron() {
        let cfg = ApplicationConfig::default();
        let ron = cfg.to_ron().expect("serialize");
        let restored = ApplicationConfig::from_ron(&ron).expect("deserialize");
        assert_eq!(
            cfg.transfer.staging_block_size,
            restored.transfer.staging_block_size
        );
    }
}
