//! Fixed pool of worker threads with explicit thread targeting.
//!
//! Every shard, serializer, and the metadata slice has a home thread in
//! this pool; all access to them is funneled through [`WorkerPool::run_on`],
//! which executes a closure on the target worker and blocks the caller
//! until it finishes. [`WorkerPool::pmap`] is the fan-out primitive used
//! for parallel bring-up, teardown, existence probes, and timestamper
//! broadcast: it spreads `f(0..n)` across the workers (job `i` on worker
//! `i % num_threads`) and joins them all before returning.

use crossbeam_channel::{bounded, unbounded, Sender};
use crossbeam_utils::CachePadded;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // (pool id, worker index) when running on a pool worker
    static CURRENT_WORKER: Cell<Option<(u64, usize)>> = const { Cell::new(None) };
}

struct Worker {
    tx: Sender<Job>,
    handle: Option<JoinHandle<()>>,
}

pub struct WorkerPool {
    id: u64,
    workers: Vec<CachePadded<Worker>>,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Arc<WorkerPool> {
        let num_threads = num_threads.max(1);
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);

        let workers = (0..num_threads)
            .map(|i| {
                let (tx, rx) = unbounded::<Job>();
                let handle = std::thread::Builder::new()
                    .name(format!("store-worker-{}", i))
                    .spawn(move || {
                        CURRENT_WORKER.with(|w| w.set(Some((id, i))));
                        // Runs until every sender is gone
                        for job in rx.iter() {
                            job();
                        }
                    })
                    .expect("failed to spawn worker thread");
                CachePadded::new(Worker {
                    tx,
                    handle: Some(handle),
                })
            })
            .collect();

        Arc::new(WorkerPool { id, workers })
    }

    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    /// Index of the pool worker the caller is running on, if any.
    pub fn current_thread(&self) -> Option<usize> {
        CURRENT_WORKER.with(|w| match w.get() {
            Some((pool, idx)) if pool == self.id => Some(idx),
            _ => None,
        })
    }

    /// Run `job` on worker `thread` (modulo the pool size) and return its
    /// result. The caller blocks until the job completes; calls that
    /// already execute on the target worker run inline.
    pub fn run_on<R, F>(&self, thread: usize, job: F) -> R
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let thread = thread % self.workers.len();
        if self.current_thread() == Some(thread) {
            return job();
        }

        let (tx, rx) = bounded(1);
        self.workers[thread]
            .tx
            .send(Box::new(move || {
                let _ = tx.send(job());
            }))
            .expect("worker queue closed");
        rx.recv().expect("worker dropped without replying")
    }

    /// Fan `f(i)` out for `i in 0..n`, job `i` on worker `i % num_threads`,
    /// and wait for all of them. Results come back in index order.
    pub fn pmap<R, F>(&self, n: usize, f: F) -> Vec<R>
    where
        R: Send + 'static,
        F: Fn(usize) -> R + Send + Sync + 'static,
    {
        if n == 0 {
            return Vec::new();
        }
        let f = Arc::new(f);
        let (tx, rx) = bounded(n);
        for i in 0..n {
            let f = Arc::clone(&f);
            let tx = tx.clone();
            self.workers[i % self.workers.len()]
                .tx
                .send(Box::new(move || {
                    let _ = tx.send((i, f(i)));
                }))
                .expect("worker queue closed");
        }
        drop(tx);

        let mut slots: Vec<Option<R>> = (0..n).map(|_| None).collect();
        for _ in 0..n {
            let (i, r) = rx.recv().expect("worker dropped without replying");
            slots[i] = Some(r);
        }
        slots.into_iter().map(|s| s.unwrap()).collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channels lets each worker drain and exit
        for w in &mut self.workers {
            let (closed_tx, _) = unbounded();
            w.tx = closed_tx;
        }
        for w in &mut self.workers {
            if let Some(handle) = w.handle.take() {
                let _ = handle.join();
            }
        }
    }
}
