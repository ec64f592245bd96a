//! Bounded worker-thread pool.
//!
//! Jobs are plain closures queued on an unbounded `crossbeam_channel`; the
//! bound is on the number of OS threads draining that queue, not on queue
//! depth — the same shape as Python's `ThreadPoolExecutor` backing
//! `original_source/parallel_traversal.py`. A job that blocks waiting on a
//! [`super::task::TaskHandle`] occupies its worker's thread for the
//! duration of the wait.

use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A bounded pool of worker threads draining a shared job queue.
pub struct WorkerPool {
    sender: crossbeam_channel::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `max_workers` threads, each looping on the shared job queue
    /// until the pool is shut down.
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(max_workers);
        for id in 0..max_workers {
            let receiver = receiver.clone();
            workers.push(
                std::thread::Builder::new()
                    .name(format!("walktree-worker-{id}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                        }
                    })
                    .expect("failed to spawn worker thread"),
            );
        }
        Self { sender, workers }
    }

    /// Queue a job. Never blocks: the backing channel is unbounded, matching
    /// `ThreadPoolExecutor.submit`'s non-blocking enqueue.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        // The only way `send` fails is if every receiver has been dropped,
        // which only happens after `shutdown` has already consumed `self`.
        let _ = self.sender.send(Box::new(job));
    }

    /// Stop accepting new jobs and block until every queued job (including
    /// ones still blocked waiting on a [`super::task::TaskHandle`]) has run.
    pub fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}
