//! Infrastructure layer: account registry and configuration.

pub mod config;
pub mod registry;

pub use config::{ConfigError, SimConfig};
pub use registry::{AccountRegistry, RegistryError};
