//! Configuration models for the engine and its backends.

pub mod engine;

pub use engine::{EngineConfig, EventBackendConfig, InstanceBackendConfig};
