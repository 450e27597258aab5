//! Core types and configuration for caravel.
//!
//! This crate defines the `caravel.toml` schema ([`CaravelConfig`]),
//! Node project discovery ([`NodeProject`]), and shared error types.

pub mod config;
pub mod error;
pub mod node;

pub use config::{AwsConfig, BuildConfig, CaravelConfig};
pub use error::{Error, Result};
pub use node::NodeProject;
