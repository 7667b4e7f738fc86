//! # Core
//!
//! Shared abstractions used throughout the render graph: configuration types
//! and the foundation utilities re-exported for convenience.

pub mod config;

pub use crate::foundation;

pub use config::{
    ApplicationConfig, Config, ConfigError, EngineConfig, RenderGraphConfig, TransferPoolConfig,
};
