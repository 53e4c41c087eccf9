//! # Engine Configuration
//!
//! Tunables of the chunk pipeline, loadable from JSON. Every field has a default, so a config
//! file only needs to name what it changes.
//!
//! ```ignore
//! let config = EngineConfig::load("pipeline.json")?;
//! let engine = EngineState::new(&config, services);
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Terrain the built-in generators produce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// Grass at `ground_level - 1` over dirt and stone.
    Flat { ground_level: i32 },
    /// Perlin heightmap with water filled up to `sea_level`.
    Noise {
        seed: u32,
        base_height: i32,
        amplitude: f64,
        scale: f64,
        sea_level: i32,
    },
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig::Noise {
            seed: 1337,
            base_height: 8,
            amplitude: 12.0,
            scale: 0.02,
            sea_level: 4,
        }
    }
}

/// Configuration of an [`EngineState`](crate::EngineState).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads draining the task pool.
    pub worker_count: usize,
    /// Chebyshev radius, in chunks, loaded around the center.
    pub load_radius: i32,
    /// Chebyshev radius, in chunks, past which idle chunks are evicted.
    pub unload_radius: i32,
    /// Most tasks one production pass materializes.
    pub batch_limit: usize,
    /// Most positions one production pass inspects.
    pub scan_window: usize,
    /// Longest time an idle worker sleeps before polling again.
    pub dequeue_timeout_ms: u64,
    /// Vertex limit of a single mesh buffer.
    pub max_vertices_per_mesh: usize,
    pub generator: GeneratorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            worker_count: std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(4),
            load_radius: 4,
            unload_radius: 6,
            batch_limit: 64,
            scan_window: 256,
            dequeue_timeout_ms: 5,
            max_vertices_per_mesh: 65536,
            generator: GeneratorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).context("Failed to parse engine configuration")?;
        Ok(config.normalized())
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine configuration {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("In {}", path.display()))
    }

    /// Clamps the values into their usable ranges.
    ///
    /// At least one worker, non-negative radii with `unload_radius >= load_radius`, at least
    /// one task per pass, and room for at least one quad per mesh buffer.
    pub fn normalized(mut self) -> Self {
        self.worker_count = self.worker_count.max(1);
        self.load_radius = self.load_radius.max(0);
        self.unload_radius = self.unload_radius.max(self.load_radius);
        self.batch_limit = self.batch_limit.max(1);
        self.scan_window = self.scan_window.max(1);
        self.max_vertices_per_mesh = self.max_vertices_per_mesh.max(4);
        self
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "load_radius": 2, "generator": { "kind": "flat", "ground_level": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.load_radius, 2);
        assert_eq!(config.unload_radius, 6);
        assert_eq!(config.generator, GeneratorConfig::Flat { ground_level: 3 });
        assert_eq!(config.max_vertices_per_mesh, 65536);
    }

    #[test]
    fn unload_radius_never_undercuts_load_radius() {
        let config = EngineConfig::from_json_str(r#"{ "load_radius": 9, "unload_radius": 3 }"#).unwrap();
        assert_eq!(config.unload_radius, 9);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let error = EngineConfig::from_json_str("{ load_radius: }").unwrap_err();
        assert!(error.to_string().contains("engine configuration"));
    }

    #[test]
    fn round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config.normalized());
    }
}
