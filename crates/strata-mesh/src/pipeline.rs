//! Asynchronous meshing pipeline: snapshot-based jobs on a worker pool.
//!
//! The main tick assembles a [`MeshJob`] from copy-on-write neighborhood
//! snapshots and recycled output buffers, submits it without blocking, and
//! drains [`MeshResult`]s each frame. Saturation surfaces as a rejected
//! submission (the job is handed back), never as a block; the caller leaves
//! its dirty flag set and retries next tick. In-flight jobs are never
//! cancelled; stale results are matched by revision and discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use strata_voxel::ChunkKey;

use crate::buffers::MeshBuffers;
use crate::generate::{MeshingMode, generate};
use crate::neighborhood::VoxelNeighborhood;
use crate::registry::BlockMeshRegistry;

/// A chunk's render mesh plus its (possibly empty) collision mesh.
#[derive(Clone, Debug, Default)]
pub struct ChunkMeshes {
    /// Geometry handed to the render representation.
    pub render: MeshBuffers,
    /// Geometry handed to the collision representation; empty when the
    /// volume does not build a separate collider.
    pub collider: MeshBuffers,
}

impl ChunkMeshes {
    /// Creates empty mesh buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears both meshes, keeping capacity for reuse.
    pub fn clear(&mut self) {
        self.render.clear();
        self.collider.clear();
    }
}

/// A self-contained meshing job that can run on any thread.
pub struct MeshJob {
    /// Position of the chunk being meshed.
    pub position: ChunkKey,
    /// Dispatch revision used to discard stale results.
    pub revision: u64,
    /// Owned snapshot of the chunk and its 26 neighbors.
    pub neighborhood: VoxelNeighborhood,
    /// World-unit scale of one voxel.
    pub voxel_size: f32,
    /// Self-shading intensity.
    pub self_shade_intensity: f32,
    /// Algorithm for the render mesh.
    pub render_mode: MeshingMode,
    /// Algorithm for a separate collision mesh, if the volume wants one.
    pub collider_mode: Option<MeshingMode>,
    /// Custom-block fragment registry.
    pub registry: Arc<BlockMeshRegistry>,
    /// Recycled output buffers, filled by the job.
    pub buffers: ChunkMeshes,
}

/// A finished meshing job.
pub struct MeshResult {
    /// Position of the meshed chunk.
    pub position: ChunkKey,
    /// Revision copied from the job.
    pub revision: u64,
    /// The filled buffers.
    pub meshes: ChunkMeshes,
}

/// Runs a meshing job to completion on the current thread.
///
/// Shared by the worker pool and the synchronous rebuild path used for
/// edits.
pub fn run_mesh_job(mut job: MeshJob) -> MeshResult {
    generate(
        job.render_mode,
        &job.neighborhood,
        &job.registry,
        job.voxel_size,
        job.self_shade_intensity,
        &mut job.buffers.render,
    );
    match job.collider_mode {
        Some(mode) => generate(
            mode,
            &job.neighborhood,
            &job.registry,
            job.voxel_size,
            job.self_shade_intensity,
            &mut job.buffers.collider,
        ),
        None => job.buffers.collider.clear(),
    }
    MeshResult {
        position: job.position,
        revision: job.revision,
        meshes: job.buffers,
    }
}

/// Worker pool for asynchronous mesh builds.
pub struct MeshPipeline {
    job_sender: Option<crossbeam_channel::Sender<MeshJob>>,
    result_receiver: crossbeam_channel::Receiver<MeshResult>,
    worker_handles: Vec<JoinHandle<()>>,
    budget: usize,
    in_flight: Arc<AtomicUsize>,
}

impl MeshPipeline {
    /// Creates a pipeline with `worker_count` threads and at most `budget`
    /// in-flight jobs.
    pub fn new(worker_count: usize, budget: usize) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<MeshJob>(budget);
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count.max(1) {
            let rx = job_rx.clone();
            let tx = result_tx.clone();
            let flight = Arc::clone(&in_flight);
            handles.push(
                std::thread::Builder::new()
                    .name("mesh-worker".into())
                    .spawn(move || {
                        while let Ok(job) = rx.recv() {
                            let result = run_mesh_job(job);
                            let _ = tx.send(result);
                            flight.fetch_sub(1, Ordering::Relaxed);
                        }
                    })
                    .expect("failed to spawn mesh worker thread"),
            );
        }

        Self {
            job_sender: Some(job_tx),
            result_receiver: result_rx,
            worker_handles: handles,
            budget,
            in_flight,
        }
    }

    /// Submits a job. Hands it back unchanged when the budget is exhausted
    /// or the pipeline has shut down, so the caller can retry next tick.
    pub fn submit(&self, job: MeshJob) -> Result<(), MeshJob> {
        let Some(sender) = &self.job_sender else {
            return Err(job);
        };
        if self.in_flight.load(Ordering::Relaxed) >= self.budget {
            return Err(job);
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        sender.try_send(job).map_err(|error| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            error.into_inner()
        })
    }

    /// Drains all finished results. Called once per frame on the main tick.
    pub fn drain_results(&self) -> Vec<MeshResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_receiver.try_recv() {
            results.push(result);
        }
        results
    }

    /// Number of jobs queued or executing.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Signals workers to exit and joins them.
    pub fn shutdown(&mut self) {
        self.job_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for MeshPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use strata_voxel::{Chunk, Voxel};

    use super::*;

    const S: usize = 8;

    fn job_for(position: ChunkKey, revision: u64) -> MeshJob {
        let mut grid = vec![Voxel::EMPTY; S * S * S];
        grid[Chunk::local_index(S, 4, 4, 4)] = Voxel::solid(1, [255; 4]);
        MeshJob {
            position,
            revision,
            neighborhood: VoxelNeighborhood::from_center(S, Arc::new(grid)),
            voxel_size: 1.0,
            self_shade_intensity: 0.2,
            render_mode: MeshingMode::Culled,
            collider_mode: None,
            registry: Arc::new(BlockMeshRegistry::new()),
            buffers: ChunkMeshes::new(),
        }
    }

    fn wait_for_results(pipeline: &MeshPipeline, count: usize) -> Vec<MeshResult> {
        let mut results = Vec::new();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while results.len() < count {
            results.extend(pipeline.drain_results());
            assert!(std::time::Instant::now() < deadline, "timed out");
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        results
    }

    #[test]
    fn test_submitted_job_produces_mesh() {
        let pipeline = MeshPipeline::new(2, 8);
        assert!(pipeline.submit(job_for((0, 0, 0), 7)).is_ok());

        let results = wait_for_results(&pipeline, 1);
        assert_eq!(results[0].position, (0, 0, 0));
        assert_eq!(results[0].revision, 7);
        assert!(!results[0].meshes.render.is_empty());
        assert!(results[0].meshes.collider.is_empty());
    }

    #[test]
    fn test_collider_pass_uses_its_own_mode() {
        let mut job = job_for((0, 0, 0), 1);
        job.collider_mode = Some(MeshingMode::Marching);
        let result = run_mesh_job(job);
        assert!(!result.meshes.render.is_empty());
        assert!(!result.meshes.collider.is_empty());
        // Culled faces and marching surfaces have different vertex counts.
        assert_ne!(
            result.meshes.render.vertex_count(),
            result.meshes.collider.vertex_count()
        );
    }

    #[test]
    fn test_budget_rejects_excess_jobs() {
        let pipeline = MeshPipeline::new(1, 2);
        let mut accepted = 0;
        let mut rejected = 0;
        for i in 0..10 {
            match pipeline.submit(job_for((i, 0, 0), 1)) {
                Ok(()) => accepted += 1,
                Err(job) => {
                    // The job comes back intact for a retry.
                    assert_eq!(job.position, (i, 0, 0));
                    rejected += 1;
                }
            }
        }
        assert!(accepted >= 1);
        assert!(rejected >= 1, "budget of 2 should reject some of 10 jobs");
    }

    #[test]
    fn test_concurrent_jobs_keep_positions() {
        let pipeline = MeshPipeline::new(4, 16);
        let positions: Vec<ChunkKey> = (0..8).map(|i| (i, 0, 0)).collect();
        for &position in &positions {
            assert!(pipeline.submit(job_for(position, 1)).is_ok());
        }
        let results = wait_for_results(&pipeline, positions.len());
        let mut seen: Vec<ChunkKey> = results.iter().map(|r| r.position).collect();
        seen.sort_unstable();
        assert_eq!(seen, positions);
    }

    #[test]
    fn test_shutdown_rejects_new_jobs() {
        let mut pipeline = MeshPipeline::new(1, 4);
        pipeline.shutdown();
        assert!(pipeline.submit(job_for((0, 0, 0), 1)).is_err());
    }
}
