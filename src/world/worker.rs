//! Dedicated serial worker thread, one per [`super::World`].
//!
//! The source invokes the Qt event-loop's queued-connection mechanism to
//! marshal a call onto a world's owning thread ("post then await via a
//! nested event loop" — spec.md §9). Here that becomes a job queue plus a
//! one-shot result channel: [`Worker::invoke`] posts a closure and blocks
//! the calling thread on its private reply channel until the worker thread
//! runs it.

use crate::config::defaults::WORLD_JOB_QUEUE_CAPACITY;
use crate::error::{SimError, SimResult};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A serial executor backed by one OS thread. All mutation of a World's
/// simulator/ship-index must go through this queue (spec.md §4.D
/// invariant: "at any instant, at most one operation runs on a World's
/// worker").
pub struct Worker {
    tx: Option<crossbeam_channel::Sender<Job>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(world_name: &str) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<Job>(WORLD_JOB_QUEUE_CAPACITY);
        let handle = thread::Builder::new()
            .name(format!("world-{world_name}"))
            .spawn(move || {
                for job in rx.iter() {
                    job();
                }
            })
            .expect("failed to spawn world worker thread");
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Post a job without waiting for it to run (fire-and-forget).
    pub fn post(&self, job: Job) -> SimResult<()> {
        self.tx
            .as_ref()
            .ok_or_else(|| SimError::Coordination("world worker thread is gone".to_string()))?
            .send(job)
            .map_err(|_| SimError::Coordination("world worker thread is gone".to_string()))
    }

    /// Post a job and block the caller until the worker runs it, returning
    /// its result. This is the core's universal way of turning
    /// worker-thread asynchrony into a synchronous call (spec.md §4.E).
    pub fn invoke<T, F>(&self, f: F) -> SimResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.post(Box::new(move || {
            let _ = reply_tx.send(f());
        }))?;
        reply_rx
            .recv()
            .map_err(|_| SimError::Coordination("world worker dropped the reply channel".to_string()))
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // A manual `Drop` impl runs before the struct's fields are dropped,
        // so the sender is still connected at this point and the worker's
        // `for job in rx.iter()` loop would never see the channel close.
        // Drop it explicitly first so the thread's receive loop ends and
        // `join` can return.
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn invoke_runs_on_the_worker_and_returns_result() {
        let worker = Worker::spawn("test");
        let result = worker.invoke(|| 2 + 2).unwrap();
        assert_eq!(result, 4);
    }

    #[test]
    fn drop_joins_the_worker_thread_instead_of_deadlocking() {
        let worker = Worker::spawn("test");
        worker.invoke(|| ()).unwrap();
        drop(worker);
    }

    #[test]
    fn jobs_run_in_post_order() {
        let worker = Worker::spawn("test");
        let order = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for i in 0..10 {
            let order = Arc::clone(&order);
            handles.push(worker.invoke(move || {
                let prev = order.fetch_add(1, Ordering::SeqCst);
                assert_eq!(prev, i);
            }));
        }
        for h in handles {
            h.unwrap();
        }
    }
}
