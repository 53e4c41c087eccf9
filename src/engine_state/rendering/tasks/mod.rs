//! Background tasks for the rendering system.
//!
//! These tasks run on the pipeline's worker threads and hand their output to the
//! [`MeshSink`](super::MeshSink), keeping the render thread free of meshing work.
//!
//! # Available Tasks
//! - `MeshTask`: Rebuilds the mesh of one chunk from its neighborhood

pub mod mesh_task;
