//! Job-system abstraction (§5 Concurrency & Resource Model).
//!
//! The rasterizer and culling stages never spawn threads themselves; they are
//! handed a [`JobSystem`] trait object and partition work onto it. A frame is
//! one synchronous call on the caller's thread that internally forks work via
//! `enqueue` and joins via `WaitGroup::wait` before returning — there is no
//! cooperative suspension and no cancellation below pass granularity.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// A unit of work handed to a [`JobSystem`]. Boxed so the trait stays
/// object-safe; callers should keep individual jobs coarse (a row range, not
/// a single pixel) to keep dispatch overhead low.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Caller-injected concurrency abstraction. Implementors decide how `enqueue`
/// schedules work (thread pool, an application's own executor, or — for
/// tests — immediate inline execution).
pub trait JobSystem: Send + Sync {
    /// Schedules `job` for execution; does not block the caller.
    fn enqueue(&self, job: Job);

    /// Number of workers this job system can usefully parallelize across.
    /// Used by callers to decide whether partitioning is worthwhile at all.
    fn worker_count(&self) -> usize;
}

/// A counting barrier: `add(n)` registers `n` outstanding jobs, each calls
/// `done()` on completion, and `wait()` blocks the calling thread until the
/// count returns to zero. This is the only synchronization primitive the
/// rasterizer/culling stages use to join parallel work.
pub struct WaitGroup {
    state: Mutex<usize>,
    cond: Condvar,
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitGroup {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(0), cond: Condvar::new() }
    }

    pub fn add(&self, n: usize) {
        *self.state.lock() += n;
    }

    pub fn done(&self) {
        let mut count = self.state.lock();
        debug_assert!(*count > 0, "WaitGroup::done called more times than add");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.cond.notify_all();
        }
    }

    pub fn wait(&self) {
        let mut count = self.state.lock();
        while *count != 0 {
            self.cond.wait(&mut count);
        }
    }
}

/// Partitions `[start, end)` into chunks of at least `min_chunk` rows and runs
/// `body(chunk_start, chunk_end)` for each chunk on `jobs`, joining before
/// returning. `body` must be safe to call concurrently for disjoint ranges —
/// the row-exclusive contract the rasterizer relies on.
pub fn parallel_for_rows<F>(jobs: &dyn JobSystem, start: i64, end: i64, min_chunk: i64, body: F)
where
    F: Fn(i64, i64) + Send + Sync + 'static,
{
    if end <= start {
        return;
    }
    let min_chunk = min_chunk.max(1);
    let body = Arc::new(body);
    let wg = Arc::new(WaitGroup::new());

    let mut chunk_start = start;
    let mut chunk_count = 0usize;
    while chunk_start < end {
        let chunk_end = (chunk_start + min_chunk).min(end);
        chunk_count += 1;
        chunk_start = chunk_end;
    }
    wg.add(chunk_count);

    let mut chunk_start = start;
    while chunk_start < end {
        let chunk_end = (chunk_start + min_chunk).min(end);
        let body = Arc::clone(&body);
        let wg = Arc::clone(&wg);
        jobs.enqueue(Box::new(move || {
            body(chunk_start, chunk_end);
            wg.done();
        }));
        chunk_start = chunk_end;
    }
    wg.wait();
}

/// Fixed pool of OS threads communicating over an MPMC channel, the crate's
/// concrete default `JobSystem`. Worker count defaults to
/// `std::thread::available_parallelism()` clamped to 8 (spec §5: "typical ≈
/// hardware concurrency, clamped to 8").
pub struct ThreadPoolJobSystem {
    sender: flume::Sender<Job>,
    workers: Vec<std::thread::JoinHandle<()>>,
}

impl ThreadPoolJobSystem {
    #[must_use]
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = flume::unbounded::<Job>();
        let workers = (0..worker_count)
            .map(|_| {
                let receiver = receiver.clone();
                std::thread::spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job();
                    }
                })
            })
            .collect();
        Self { sender, workers }
    }

    /// Builds a pool sized to the host's hardware concurrency, clamped to 8.
    #[must_use]
    pub fn with_default_size() -> Self {
        let n = std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get);
        Self::new(n.min(8))
    }
}

impl JobSystem for ThreadPoolJobSystem {
    fn enqueue(&self, job: Job) {
        // An unbounded channel never blocks the producer; a disconnected
        // receiver only happens after `drop`, which callers should not do
        // mid-frame.
        let _ = self.sender.send(job);
    }

    fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for ThreadPoolJobSystem {
    fn drop(&mut self) {
        // Dropping the sender closes the channel; workers exit their `recv`
        // loop once drained.
        let (dummy_tx, _dummy_rx) = flume::unbounded();
        let old_sender = std::mem::replace(&mut self.sender, dummy_tx);
        drop(old_sender);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Runs every job synchronously on the calling thread. Used by tests and by
/// single-threaded hosts that want the job-system seam without real
/// parallelism — determinism is trivially preserved.
pub struct InlineJobSystem;

impl JobSystem for InlineJobSystem {
    fn enqueue(&self, job: Job) {
        job();
    }

    fn worker_count(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn wait_group_blocks_until_drained() {
        let wg = WaitGroup::new();
        wg.add(3);
        wg.done();
        wg.done();
        wg.done();
        wg.wait(); // must return immediately
    }

    #[test]
    fn parallel_for_rows_covers_every_row_exactly_once() {
        let jobs = InlineJobSystem;
        let hits = Arc::new(Mutex::new(vec![0u32; 100]));
        let hits_clone = Arc::clone(&hits);
        parallel_for_rows(&jobs, 0, 100, 8, move |a, b| {
            let mut hits = hits_clone.lock();
            for row in a..b {
                hits[row as usize] += 1;
            }
        });
        assert!(hits.lock().iter().all(|&c| c == 1));
    }

    #[test]
    fn thread_pool_runs_enqueued_jobs() {
        let pool = ThreadPoolJobSystem::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        let wg = Arc::new(WaitGroup::new());
        wg.add(10);
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            let wg = Arc::clone(&wg);
            pool.enqueue(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                wg.done();
            }));
        }
        wg.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
