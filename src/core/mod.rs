//! # Core Module
//!
//! Engine-wide configuration shared by the library and the demo binary.
//!
//! ## Key Components
//! - `EngineConfig`: Pipeline tunables, loadable from JSON
//! - `GeneratorConfig`: Selection and parameters of the built-in terrain generator

pub mod config;
