//! # Configuration
//!
//! Client configuration resolved from defaults, an optional YAML/JSON file,
//! and `CLIPPER_*` environment variables.

pub mod client;

pub use client::{ClientConfig, ConfigError, TestLoginConfig, default_session_path};
