//! Configuration for the VFM engine.
//!
//! Artifact locations and blend settings, loaded from environment variables,
//! a TOML file or the conventional per-contract layout.

mod engine_config;

pub use engine_config::{ContractType, EngineConfig};
