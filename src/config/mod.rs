//! Configuration loaded from `.keystash.toml` and the environment.

pub mod settings;

pub use settings::{Settings, SourceEntry};
