//! Rendering side of the pipeline.
//!
//! This module contains the mesh generator and the seam through which finished meshes leave
//! the pipeline. The pipeline never talks to a GPU: it hands each chunk's complete
//! replacement geometry to a [`MeshSink`], and tells the sink when a chunk's geometry has to
//! go away.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use super::voxels::coords::ChunkPos;

pub mod meshing;
pub mod tasks;
mod vertex;

// Re-export commonly used types
pub use meshing::ChunkMesh;
pub use vertex::Vertex;

/// Receiver of finished chunk meshes, typically a renderer that uploads them to the GPU.
///
/// Calls arrive from worker threads, possibly for different chunks at the same time.
pub trait MeshSink: Send + Sync {
    /// Replaces whatever geometry `position` had with `mesh`.
    fn upload(&self, position: ChunkPos, mesh: ChunkMesh);

    /// Drops the geometry of `position`, if any.
    fn teardown(&self, position: ChunkPos);
}

/// Sink that keeps the latest mesh of every chunk in memory.
///
/// Used headless (demo binary, tests) and as a staging area a render thread can drain.
#[derive(Debug, Default)]
pub struct MeshStore {
    meshes: DashMap<ChunkPos, ChunkMesh>,
    uploads: AtomicUsize,
    teardowns: AtomicUsize,
}

impl MeshStore {
    pub fn new() -> Self {
        MeshStore::default()
    }

    /// A copy of the current mesh of `position`.
    pub fn get(&self, position: ChunkPos) -> Option<ChunkMesh> {
        self.meshes.get(&position).map(|mesh| mesh.clone())
    }

    pub fn contains(&self, position: ChunkPos) -> bool {
        self.meshes.contains_key(&position)
    }

    /// Number of chunks that currently have geometry.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Total number of uploads received.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::Relaxed)
    }

    /// Total number of teardowns received.
    pub fn teardown_count(&self) -> usize {
        self.teardowns.load(Ordering::Relaxed)
    }

    /// Removes and returns every stored mesh.
    pub fn drain(&self) -> Vec<(ChunkPos, ChunkMesh)> {
        let positions: Vec<ChunkPos> = self.meshes.iter().map(|entry| *entry.key()).collect();
        positions
            .into_iter()
            .filter_map(|position| self.meshes.remove(&position))
            .collect()
    }
}

impl MeshSink for MeshStore {
    fn upload(&self, position: ChunkPos, mesh: ChunkMesh) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
        self.meshes.insert(position, mesh);
    }

    fn teardown(&self, position: ChunkPos) {
        self.teardowns.fetch_add(1, Ordering::Relaxed);
        self.meshes.remove(&position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    #[test]
    fn uploads_replace_and_teardowns_remove() {
        let store = MeshStore::new();
        let position = Point3::new(0, 0, 1);
        store.upload(position, ChunkMesh::default());
        store.upload(position, ChunkMesh::default());
        assert_eq!(store.len(), 1);
        assert_eq!(store.upload_count(), 2);

        store.teardown(position);
        assert!(!store.contains(position));
        assert_eq!(store.teardown_count(), 1);
        assert!(store.drain().is_empty());
    }
}
