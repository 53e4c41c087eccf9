//! # Voxel Pipeline Demo
//!
//! Runs the pipeline headless around the origin and logs what it produced.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json]
//! ```

use std::sync::Arc;

use anyhow::Context;
use cgmath::Point3;
use log::info;
use voxel_pipeline::{Block, BlockType, EngineConfig, EngineServices, EngineState, MeshStore};
use web_time::Instant;

fn main() -> anyhow::Result<()> {
    voxel_pipeline::init_logger();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path)?,
        None => EngineConfig::default(),
    };
    info!("Running with {:?}", config);

    let store = Arc::new(MeshStore::new());
    let services = EngineServices::from_config(&config, store.clone());
    let mut engine = EngineState::new(config, services);
    engine.start();

    let start = Instant::now();
    let created = engine.set_center(Point3::new(0, 0, 0));
    engine.run_until_idle();
    info!(
        "Loaded {} chunks, {} meshed, in {:?}",
        created,
        store.len(),
        start.elapsed()
    );

    // Light up the surface above the origin and drop some sand next to it.
    let surface = (0..64)
        .rev()
        .find(|&y| {
            engine
                .block_at(Point3::new(0, y, 0))
                .is_some_and(|block| !block.is_air())
        })
        .context("No ground found above the origin")?;
    let start = Instant::now();
    engine.set_blocks([
        (Point3::new(0, surface + 1, 0), Block::new(BlockType::TORCH)),
        (Point3::new(2, surface + 6, 0), Block::new(BlockType::SAND)),
    ]);
    engine.run_until_idle();
    info!("Edits settled in {:?}", start.elapsed());

    let stats = engine.stats();
    info!(
        "Executed {} tasks (per type {:?}), dropped {:?}, {} uploads, {} teardowns",
        stats.executed_total(),
        stats.executed,
        stats.dropped,
        store.upload_count(),
        store.teardown_count()
    );
    engine.stop();
    Ok(())
}
