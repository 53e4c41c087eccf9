//! # Task Management System
//!
//! This module runs the chunk pipeline's work on a pool of worker threads.
//!
//! ## Architecture Overview
//!
//! The task management system consists of several key components:
//! - `TaskPool`: Queued work per chunk, the dependency table and the producer
//! - `TaskManager`: Owns the worker threads and wakes them when work arrives
//! - `Task`: A unit of work that can be executed on any worker
//! - `TaskResult`: The follow-ups a completed task pushes back into the pool
//!
//! ## Worker Loop
//! Each worker repeatedly:
//! 1. Takes a materialized task from the pool (high priority first) and executes it
//! 2. Otherwise runs a production pass to materialize more tasks
//! 3. Otherwise sleeps on a condition variable until notified or the dequeue timeout expires
//!
//! Only one worker produces at a time; the others keep executing.
//!
//! ## Task Lifecycle
//! 1. Work is pushed for a chunk via `TaskPool::push()`
//! 2. A production pass materializes it once its dependencies are idle
//! 3. A worker processes it without holding any pool lock
//! 4. Follow-ups are pushed and the slot's running flag is cleared
//!
//! ## Example Usage
//! ```ignore
//! let mut manager = TaskManager::new(pool.clone(), 4, Duration::from_millis(5));
//! manager.start();
//! pool.push(position, TaskPayload::Generate, Priority::Low);
//! manager.notify();
//! ```

pub mod scheduler;
pub mod task;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use scheduler::TaskPool;

/// Wakes idle workers when work arrives.
#[derive(Debug, Default)]
struct WorkSignal {
    lock: Mutex<()>,
    condvar: Condvar,
}

impl WorkSignal {
    fn notify_all(&self) {
        let _guard = self.lock.lock();
        self.condvar.notify_all();
    }

    fn wait(&self, timeout: Duration) {
        let mut guard = self.lock.lock();
        self.condvar.wait_for(&mut guard, timeout);
    }
}

/// Manages the worker threads that drain a [`TaskPool`].
///
/// Workers are started explicitly with [`TaskManager::start`] and stopped with
/// [`TaskManager::stop`] or on drop. Without running workers, [`TaskManager::run_until_idle`]
/// drives the pool on the calling thread.
pub struct TaskManager {
    pool: Arc<TaskPool>,
    signal: Arc<WorkSignal>,
    active: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
    dequeue_timeout: Duration,
}

fn worker_loop(pool: Arc<TaskPool>, signal: Arc<WorkSignal>, active: Arc<AtomicBool>, timeout: Duration) {
    while active.load(Ordering::Acquire) {
        if let Some(runner) = pool.next_runner() {
            pool.execute(runner);
            signal.notify_all();
            continue;
        }
        if pool.produce() > 0 {
            signal.notify_all();
            continue;
        }
        signal.wait(timeout);
    }
}

impl TaskManager {
    /// Creates a new `TaskManager` without starting any thread.
    ///
    /// # Arguments
    /// * `pool` - The pool the workers drain
    /// * `worker_count` - Number of worker threads; at least one is started
    /// * `dequeue_timeout` - Longest time an idle worker sleeps before polling again
    pub fn new(pool: Arc<TaskPool>, worker_count: usize, dequeue_timeout: Duration) -> Self {
        TaskManager {
            pool,
            signal: Arc::new(WorkSignal::default()),
            active: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            worker_count: worker_count.max(1),
            dequeue_timeout,
        }
    }

    pub fn pool(&self) -> &Arc<TaskPool> {
        &self.pool
    }

    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Spawns the worker threads. Does nothing if they are already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        info!(
            "Starting {} pipeline workers (available parallelism: {:?})",
            self.worker_count,
            thread::available_parallelism()
        );
        self.active.store(true, Ordering::Release);
        for index in 0..self.worker_count {
            let pool = self.pool.clone();
            let signal = self.signal.clone();
            let active = self.active.clone();
            let timeout = self.dequeue_timeout;
            let spawned = thread::Builder::new()
                .name(format!("pipeline-worker-{index}"))
                .spawn(move || worker_loop(pool, signal, active, timeout));
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(error) => warn!("Failed to spawn pipeline worker {}: {}", index, error),
            }
        }
    }

    /// Signals every worker to finish its current task and joins them.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.active.store(false, Ordering::Release);
        self.signal.notify_all();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("A pipeline worker panicked");
            }
        }
        debug!("Pipeline workers stopped");
    }

    /// Wakes idle workers, e.g. after pushing work from outside the pipeline.
    pub fn notify(&self) {
        self.signal.notify_all();
    }

    /// Processes work until nothing more can become ready.
    ///
    /// Work that can never become ready, such as meshes of chunks on the edge of the loaded
    /// area, stays queued. When workers are running, the calling thread works alongside them
    /// and returns once none of them holds a task.
    ///
    /// # Returns
    /// The number of tasks executed on the calling thread.
    pub fn run_until_idle(&self) -> usize {
        let mut executed = 0;
        loop {
            if let Some(runner) = self.pool.next_runner() {
                self.pool.execute(runner);
                executed += 1;
                continue;
            }
            let busy = self.pool.in_flight() > 0;
            if self.pool.sweep() > 0 {
                self.signal.notify_all();
                continue;
            }
            if !busy && self.pool.in_flight() == 0 {
                return executed;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.stop();
    }
}
