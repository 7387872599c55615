//! TabPilot library
//!
//! Exposes the CLI's settings layering and commands for integration testing.

pub mod cli;
pub mod config;
pub mod errors;

pub use config::SettingsLoader;
pub use errors::ConfigError;
