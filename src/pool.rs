//! Fork-join slice execution for the recurrence engine.
//!
//! A [`SlicePool`] owns a fixed rayon worker pool. [`SlicePool::run_slices`]
//! hands slices `0..n-1` to the workers, runs the last slice on the calling
//! thread, and returns only after every slice has finished, so each call is a
//! full barrier. Workers report their results through a lock-free
//! `ArrayQueue`. Without a live pool every slice runs inline on the caller,
//! and a slice whose result never comes back is recomputed there too.

use crossbeam::queue::ArrayQueue;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// A fixed worker pool plus the calling thread.
pub struct SlicePool {
    pool: Option<ThreadPool>,
    workers: usize,
}

impl SlicePool {
    /// Creates a pool with `workers` threads. Zero workers, or a pool that
    /// cannot be built, yields an inline-only pool.
    pub fn new(workers: usize) -> Self {
        if workers == 0 {
            return Self::inline();
        }
        let built = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("feynman-slice.{i:02}"))
            .build();
        match built {
            Ok(pool) => Self {
                pool: Some(pool),
                workers,
            },
            Err(e) => {
                eprintln!("[SlicePool] could not start {workers} workers ({e}); running inline");
                Self::inline()
            }
        }
    }

    /// A pool without workers; every slice runs on the caller.
    pub fn inline() -> Self {
        Self {
            pool: None,
            workers: 0,
        }
    }

    /// Number of live worker threads (0 once shut down).
    #[inline]
    pub fn workers(&self) -> usize {
        if self.pool.is_some() {
            self.workers
        } else {
            0
        }
    }

    /// Whether worker threads are available.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.pool.is_some()
    }

    /// Releases the worker threads. Safe to call any number of times; later
    /// calls to [`Self::run_slices`] run inline.
    pub fn shutdown(&mut self) {
        self.pool = None;
    }

    /// Runs `f(slice)` for every `slice in 0..n_slices` and returns the
    /// results in slice order.
    ///
    /// Slices `0..n_slices-1` go to the workers while the caller computes the
    /// last one; the call blocks until all of them are done.
    pub fn run_slices<T, F>(&self, n_slices: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        let Some(pool) = self.pool.as_ref().filter(|_| n_slices > 1) else {
            return (0..n_slices).map(&f).collect();
        };

        let submitted = n_slices - 1;
        let finished: ArrayQueue<(usize, T)> = ArrayQueue::new(submitted);
        let f = &f;
        let finished_ref = &finished;
        let last = pool.in_place_scope(|scope| {
            for slice in 0..submitted {
                scope.spawn(move |_| {
                    // The queue holds one entry per submitted slice, so the
                    // push only fails if a slice reports twice.
                    let pushed = finished_ref.push((slice, f(slice)));
                    debug_assert!(pushed.is_ok(), "slice {slice} reported twice");
                });
            }
            f(submitted)
        });

        collect_slots(n_slices, &finished, last, f)
    }
}

/// Orders the reported results, with `last` as the final slice. A slice
/// missing from `finished` (its worker never ran) is computed inline.
fn collect_slots<T, F>(n_slices: usize, finished: &ArrayQueue<(usize, T)>, last: T, f: &F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    let mut slots: Vec<Option<T>> = (0..n_slices).map(|_| None).collect();
    while let Some((slice, out)) = finished.pop() {
        slots[slice] = Some(out);
    }
    slots[n_slices - 1] = Some(last);
    slots
        .into_iter()
        .enumerate()
        .map(|(slice, out)| out.unwrap_or_else(|| f(slice)))
        .collect()
}

impl Drop for SlicePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SlicePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlicePool")
            .field("workers", &self.workers())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
