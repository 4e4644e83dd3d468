//! Asynchronous voxel-data generation on a worker pool.
//!
//! A [`GenerationJob`] asks the bound generator for every voxel of one chunk
//! and delivers the finished array back to the main tick. Submission is
//! fire-and-forget with try-send backpressure: a rejected job is handed back
//! and the chunk stays data-dirty for a retry next tick. There is no
//! cancellation; results for recycled chunks are discarded on arrival.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use strata_voxel::{Chunk, ChunkKey, Voxel, VoxelDataGenerator};

/// A request to generate one chunk's voxel contents.
pub struct GenerationJob {
    /// Chunk-lattice position of the chunk.
    pub position: ChunkKey,
    /// Chunk side length in voxels.
    pub chunk_size: usize,
    /// The volume's bound generator.
    pub generator: Arc<dyn VoxelDataGenerator>,
}

/// A finished generation job.
pub struct GeneratedData {
    /// Position copied from the job.
    pub position: ChunkKey,
    /// The generated voxel array (`chunk_size³` entries).
    pub voxels: Vec<Voxel>,
    /// Whether any generated voxel is active.
    pub any_active: bool,
}

/// Runs a generation job to completion on the current thread.
pub fn run_generation_job(job: &GenerationJob) -> GeneratedData {
    let size = job.chunk_size;
    let base = (
        job.position.0 * size as i32,
        job.position.1 * size as i32,
        job.position.2 * size as i32,
    );

    let mut voxels = vec![Voxel::EMPTY; size * size * size];
    let mut any_active = false;
    for z in 0..size as i32 {
        for y in 0..size as i32 {
            for x in 0..size as i32 {
                let voxel = job
                    .generator
                    .generate_voxel(base.0 + x, base.1 + y, base.2 + z);
                any_active |= voxel.is_active();
                voxels[Chunk::local_index(size, x, y, z)] = voxel;
            }
        }
    }

    GeneratedData {
        position: job.position,
        voxels,
        any_active,
    }
}

/// Worker pool for asynchronous chunk data generation.
pub struct GenerationPipeline {
    job_sender: Option<crossbeam_channel::Sender<GenerationJob>>,
    result_receiver: crossbeam_channel::Receiver<GeneratedData>,
    worker_handles: Vec<JoinHandle<()>>,
    budget: usize,
    in_flight: Arc<AtomicUsize>,
}

impl GenerationPipeline {
    /// Creates a pipeline with `worker_count` threads and at most `budget`
    /// in-flight jobs.
    pub fn new(worker_count: usize, budget: usize) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<GenerationJob>(budget);
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count.max(1) {
            let rx = job_rx.clone();
            let tx = result_tx.clone();
            let flight = Arc::clone(&in_flight);
            handles.push(
                std::thread::Builder::new()
                    .name("chunk-gen-worker".into())
                    .spawn(move || {
                        while let Ok(job) = rx.recv() {
                            let result = run_generation_job(&job);
                            let _ = tx.send(result);
                            flight.fetch_sub(1, Ordering::Relaxed);
                        }
                    })
                    .expect("failed to spawn chunk generation worker thread"),
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

    /// Creates a pipeline sized from the CPU count, leaving headroom for the
    /// main thread.
    pub fn with_defaults() -> Self {
        let cpus = num_cpus::get().max(2);
        Self::new((cpus - 1).max(1), 64)
    }

    /// Submits a job, handing it back when the budget is exhausted.
    pub fn submit(&self, job: GenerationJob) -> Result<(), GenerationJob> {
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
    pub fn drain_results(&self) -> Vec<GeneratedData> {
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

impl Drop for GenerationPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
