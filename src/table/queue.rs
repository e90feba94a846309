//! Task queue
//!
//! The per-table serialization primitive: a dedicated worker thread owns the
//! table state and drains submitted tasks strictly in submission order. Each
//! task must signal its own completion through the `TaskContext` it is
//! handed; the worker blocks on that signal before dispatching the next
//! task, so index-cache mutations and their file writes never interleave.
//!
//! One context is created per dispatch and exactly one `finish()` releases
//! it. This single lane is the only concurrency-correctness mechanism
//! protecting the shared index and metadata caches.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, unbounded, Sender};
use tracing::warn;

use crate::error::{Result, StoreError};

/// A queued operation against the lane-owned state
pub type Task<S> = Box<dyn FnOnce(&mut S, TaskContext) + Send>;

/// Completion signal for one dispatched task
///
/// Dropping a context without calling `finish()` also releases the lane, so
/// a panicking task cannot wedge the queue.
pub struct TaskContext {
    done: Sender<()>,
}

impl TaskContext {
    /// Release the lane for the next task
    pub fn finish(self) {
        let _ = self.done.send(());
    }
}

/// Single-lane executor owning state `S`
pub struct TaskQueue<S> {
    tx: Option<Sender<Task<S>>>,
    worker: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> TaskQueue<S> {
    /// Spawn the worker lane, transferring ownership of `state` to it
    pub fn new(name: &str, state: S) -> Result<Self> {
        let (tx, rx) = unbounded::<Task<S>>();

        let worker = thread::Builder::new()
            .name(format!("recstore-{}", name))
            .spawn(move || {
                let mut state = state;
                for task in rx {
                    let (done_tx, done_rx) = bounded(1);
                    task(&mut state, TaskContext { done: done_tx });

                    // Next task is dispatched only after finish() (or a
                    // dropped context) releases the lane.
                    let _ = done_rx.recv();
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Enqueue a task; fails if the lane has shut down
    pub fn submit(&self, task: Task<S>) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| StoreError::Queue("lane closed".into()))?;

        tx.send(task)
            .map_err(|_| StoreError::Queue("worker exited".into()))
    }
}

impl<S> Drop for TaskQueue<S> {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        self.tx.take();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("table worker exited by panic");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn tasks_run_in_submission_order() {
        let queue = TaskQueue::new("order", Vec::<u32>::new()).unwrap();
        let (tx, rx) = mpsc::channel();

        for i in 0..16u32 {
            let tx = tx.clone();
            queue
                .submit(Box::new(move |seen, ctx| {
                    seen.push(i);
                    tx.send(seen.clone()).unwrap();
                    ctx.finish();
                }))
                .unwrap();
        }

        let mut last = Vec::new();
        for _ in 0..16 {
            last = rx.recv().unwrap();
        }
        assert_eq!(last, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn worker_owns_state_across_tasks() {
        let queue = TaskQueue::new("state", 0u64).unwrap();
        let (tx, rx) = mpsc::channel();

        queue
            .submit(Box::new(|count, ctx| {
                *count += 1;
                ctx.finish();
            }))
            .unwrap();
        queue
            .submit(Box::new(move |count, ctx| {
                *count += 1;
                tx.send(*count).unwrap();
                ctx.finish();
            }))
            .unwrap();

        assert_eq!(rx.recv().unwrap(), 2);
    }

    #[test]
    fn drop_joins_worker_after_draining() {
        let (tx, rx) = mpsc::channel();
        {
            let queue = TaskQueue::new("drain", ()).unwrap();
            queue
                .submit(Box::new(move |_, ctx| {
                    tx.send(()).unwrap();
                    ctx.finish();
                }))
                .unwrap();
        }
        // queue dropped; the pending task still ran
        rx.recv().unwrap();
    }

    #[test]
    fn dropped_context_still_releases_lane() {
        let queue = TaskQueue::new("release", ()).unwrap();
        let (tx, rx) = mpsc::channel();

        // First task never calls finish(); the dropped context must unblock
        // the lane for the second task.
        queue.submit(Box::new(|_, _ctx| {})).unwrap();
        queue
            .submit(Box::new(move |_, ctx| {
                tx.send(()).unwrap();
                ctx.finish();
            }))
            .unwrap();

        rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
    }
}
