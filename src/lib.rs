#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Pipeline
//!
//! A concurrent chunk processing pipeline for voxel worlds: terrain generation, block edits,
//! sunlight maintenance, block ticks, light flood fill and greedy meshing, scheduled across
//! worker threads under a per-chunk dependency table.
//!
//! ## Key Modules
//!
//! * `core` - Engine configuration
//! * `engine_state` - The pipeline itself: voxel data, tasks, scheduler and mesher
//!
//! ## Architecture
//!
//! The engine follows a modular architecture with clear separation between:
//! * Voxel data (blocks, chunks, sunlight heights) behind per-chunk read-write locks
//! * Tasks that read and write that data through composed lock sets
//! * A scheduler that only materializes tasks whose dependencies are idle
//! * A mesh sink through which geometry leaves the pipeline
//!
//! ## Usage
//!
//! ```ignore
//! voxel_pipeline::init_logger();
//! let store = Arc::new(MeshStore::new());
//! let config = EngineConfig::default();
//! let mut engine = EngineState::new(config.clone(), EngineServices::from_config(&config, store.clone()));
//! engine.start();
//! engine.set_center(Point3::new(0, 0, 0));
//! ```
//!
//! ## Performance Considerations
//!
//! * Greedy meshing merges faces whose shading matches exactly
//! * Meshing copies its inputs and releases every lock before building geometry
//! * Light is flooded from the boundary of the sunlit region only
//! * Work for the chunks nearest the load center is materialized first

use log::info;

pub mod core;
pub mod engine_state;

pub use crate::core::config::{EngineConfig, GeneratorConfig};
pub use engine_state::rendering::{ChunkMesh, MeshSink, MeshStore, Vertex};
pub use engine_state::voxels::block::block_type::BlockType;
pub use engine_state::voxels::block::registry::BlockRegistry;
pub use engine_state::voxels::block::{Block, Light};
pub use engine_state::{EngineServices, EngineState};

/// Installs the `env_logger` logger, writing to stdout and filtered by `RUST_LOG`.
///
/// Calling it more than once is harmless.
pub fn init_logger() {
    let mut log_builder = env_logger::Builder::new();
    let installed = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init();
    if installed.is_ok() {
        info!("Logger initialized");
    }
}
