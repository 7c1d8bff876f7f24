//! Bounded worker pool for fan-out searches.
//!
//! Up to `core_pool_size` long-lived workers pull tasks from a bounded queue.
//! When the queue is full, extra workers are started up to `max_pool_size`;
//! they retire after `keep_alive` without work. Once the pool is saturated the
//! submitting task runs the work itself, so memory stays bounded and every
//! accepted task eventually runs.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("core pool size must be at least 1")]
    NoCoreWorkers,
    #[error("max pool size ({max}) must not be smaller than core pool size ({core})")]
    MaxBelowCore { core: usize, max: usize },
    #[error("queue capacity must be at least 1")]
    NoQueue,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("worker pool is shut down")]
    Rejected,
    #[error("task was dropped before completion")]
    Cancelled,
}

/// Result slot of one submitted task.
#[must_use = "a task handle does nothing unless joined"]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    pub async fn join(self) -> Result<T, TaskError> {
        self.rx.await.unwrap_or(Err(TaskError::Cancelled))
    }
}

struct Shared {
    queue: AsyncMutex<mpsc::Receiver<Job>>,
    workers: AtomicUsize,
    core_size: usize,
    max_size: usize,
    keep_alive: Duration,
}

impl Shared {
    /// Claims a worker slot if fewer than `limit` workers are running.
    fn reserve_worker(&self, limit: usize) -> bool {
        self.workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then_some(n + 1))
            .is_ok()
    }

    /// How long an idle worker waits for work before trying to retire.
    /// `None` while the pool is at or below its core size.
    fn idle_timeout(&self) -> Option<Duration> {
        (self.workers.load(Ordering::Acquire) > self.core_size).then_some(self.keep_alive)
    }

    /// Releases an idle worker's slot, but never below the core size.
    fn retire_idle_worker(&self) -> bool {
        self.workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > self.core_size).then(|| n - 1)
            })
            .is_ok()
    }
}

pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown_grace: Duration,
}

impl WorkerPool {
    pub fn new(config: &ExecutorConfig) -> Result<Self, PoolError> {
        if config.core_pool_size == 0 {
            return Err(PoolError::NoCoreWorkers);
        }
        if config.max_pool_size < config.core_pool_size {
            return Err(PoolError::MaxBelowCore {
                core: config.core_pool_size,
                max: config.max_pool_size,
            });
        }
        if config.queue_capacity == 0 {
            return Err(PoolError::NoQueue);
        }

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            shared: Arc::new(Shared {
                queue: AsyncMutex::new(receiver),
                workers: AtomicUsize::new(0),
                core_size: config.core_pool_size,
                max_size: config.max_pool_size,
                keep_alive: config.keep_alive(),
            }),
            handles: Mutex::new(Vec::new()),
            shutdown_grace: config.shutdown_grace(),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.shared.workers.load(Ordering::Acquire)
    }

    /// Schedules `task`, running it inline when the pool is saturated.
    pub async fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let handle = TaskHandle { rx };

        let Some(sender) = self.sender() else {
            let _ = tx.send(Err(TaskError::Rejected));
            return handle;
        };

        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
            // The caller may have stopped waiting; nothing to do then.
            let _ = tx.send(outcome);
        });

        let Some(job) = self.start_worker_below(self.shared.core_size, job) else {
            return handle;
        };

        let job = match sender.try_send(job) {
            Ok(()) => return handle,
            // Shut down between the check above and now; the handle reports Cancelled.
            Err(TrySendError::Closed(_)) => return handle,
            Err(TrySendError::Full(job)) => job,
        };

        let Some(job) = self.start_worker_below(self.shared.max_size, job) else {
            return handle;
        };

        debug!(workers = self.worker_count(), "worker pool saturated, running task on caller");
        job.await;
        handle
    }

    /// Stops accepting work, drains the queue, and aborts whatever is still
    /// running once the grace period is over.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());

        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        info!(workers = handles.len(), "shutting down worker pool");

        if tokio::time::timeout(self.shutdown_grace, join_all(handles)).await.is_err() {
            warn!(
                grace_seconds = self.shutdown_grace.as_secs(),
                "worker pool did not drain in time, aborting remaining tasks"
            );
            for abort in aborts {
                abort.abort();
            }
        } else {
            info!("worker pool drained");
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<Job>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Starts a worker seeded with `job` if there is room below `limit`,
    /// otherwise hands the job back.
    fn start_worker_below(&self, limit: usize, job: Job) -> Option<Job> {
        if !self.shared.reserve_worker(limit) {
            return Some(job);
        }
        let worker = tokio::spawn(run_worker(Arc::clone(&self.shared), job));
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|handle| !handle.is_finished());
        handles.push(worker);
        None
    }
}

async fn run_worker(shared: Arc<Shared>, first: Job) {
    first.await;
    loop {
        let next = {
            let mut queue = shared.queue.lock().await;
            match shared.idle_timeout() {
                Some(keep_alive) => tokio::time::timeout(keep_alive, queue.recv()).await.ok(),
                None => Some(queue.recv().await),
            }
        };
        match next {
            Some(Some(job)) => job.await,
            // Queue closed and drained.
            Some(None) => break,
            None if shared.retire_idle_worker() => return,
            None => continue,
        }
    }
    shared.workers.fetch_sub(1, Ordering::AcqRel);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
