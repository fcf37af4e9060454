//! Background cache population.
//!
//! A fixed set of workers drains a bounded queue of records that were just
//! written to or read from the durable store and republishes them into the
//! cache. Population is best-effort: a failed or timed-out task is logged and
//! dropped, and a full queue sheds new tasks instead of blocking the caller.
//!
//! A delete must win over any population task for the same code that was
//! started before it. Each task carries the code's delete [`Epoch`] as observed
//! before the store was touched; a worker skips a task whose epoch has moved,
//! and undoes its own write if a delete landed while it was writing.

use crate::config::PopulationSettings;
use parking_lot::Mutex;
use snip_core::{ShortCode, ShortenedUrl, UrlCache};
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Counters describing what the pool did with the tasks it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationStats {
    /// Tasks accepted onto the queue.
    pub enqueued: u64,
    /// Tasks rejected because the queue was full or closed.
    pub shed: u64,
    /// Tasks that wrote the cache successfully.
    pub populated: u64,
    /// Tasks that failed or timed out.
    pub failed: u64,
    /// Tasks skipped or undone because their code was deleted meanwhile.
    pub revoked: u64,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    shed: AtomicU64,
    populated: AtomicU64,
    failed: AtomicU64,
    revoked: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PopulationStats {
        PopulationStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            shed: self.shed.load(Ordering::Relaxed),
            populated: self.populated.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            revoked: self.revoked.load(Ordering::Relaxed),
        }
    }
}

/// How many deletes a code's stripe had seen when an operation started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

const EPOCH_STRIPES: usize = 64;

/// Delete counters, striped by code hash so memory stays bounded. Codes that
/// share a stripe only cost each other a skipped population.
#[derive(Debug)]
struct DeleteEpochs {
    stripes: Box<[AtomicU64]>,
    hasher: RandomState,
}

impl DeleteEpochs {
    fn new() -> Self {
        Self {
            stripes: (0..EPOCH_STRIPES).map(|_| AtomicU64::new(0)).collect(),
            hasher: RandomState::new(),
        }
    }

    fn stripe(&self, code: &ShortCode) -> &AtomicU64 {
        let index = self.hasher.hash_one(code) % EPOCH_STRIPES as u64;
        &self.stripes[index as usize]
    }

    fn current(&self, code: &ShortCode) -> Epoch {
        Epoch(self.stripe(code).load(Ordering::SeqCst))
    }

    fn bump(&self, code: &ShortCode) {
        self.stripe(code).fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct Task {
    url: ShortenedUrl,
    epoch: Epoch,
}

enum Outcome {
    Populated,
    Revoked,
    Failed,
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Task>>>;

/// A bounded queue plus a fixed pool of cache population workers.
///
/// The pool is started on construction and lives until [`shutdown`] is
/// called or it is dropped. Dropping it closes the queue; workers still
/// finish whatever was already queued.
///
/// [`shutdown`]: PopulationPool::shutdown
#[derive(Debug)]
pub struct PopulationPool {
    // `None` once shut down.
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    epochs: Arc<DeleteEpochs>,
}

impl PopulationPool {
    /// Starts the workers. Must be called from within a Tokio runtime.
    pub fn spawn<C: UrlCache>(cache: Arc<C>, settings: PopulationSettings) -> Self {
        let workers = settings.workers.max(1);
        let capacity = settings.queue_capacity.max(1);
        if workers != settings.workers || capacity != settings.queue_capacity {
            warn!(
                workers = settings.workers,
                queue_capacity = settings.queue_capacity,
                "Population pool needs at least one worker and one queue slot"
            );
        }

        let (sender, receiver) = mpsc::channel(capacity);
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let counters = Arc::new(Counters::default());
        let epochs = Arc::new(DeleteEpochs::new());

        let handles = (0..workers)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&cache),
                    Arc::clone(&receiver),
                    Arc::clone(&counters),
                    Arc::clone(&epochs),
                    settings,
                ))
            })
            .collect();

        info!(workers, queue_capacity = capacity, "Started cache population pool");

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            counters,
            epochs,
        }
    }

    /// Observes the delete epoch of `code`.
    ///
    /// Take it before reading or writing the store for `code`, and pass it to
    /// [`enqueue`](Self::enqueue) with the resulting record.
    pub fn epoch(&self, code: &ShortCode) -> Epoch {
        self.epochs.current(code)
    }

    /// Invalidates every task for `code` observed before this call.
    ///
    /// Call it after the record is gone from the store and before the cache
    /// entry is removed.
    pub fn revoke(&self, code: &ShortCode) {
        self.epochs.bump(code);
    }

    /// Queues `url` for cache population without waiting.
    ///
    /// Returns `false` if the task was shed because the queue is full or the
    /// pool has been shut down.
    pub fn enqueue(&self, url: ShortenedUrl, epoch: Epoch) -> bool {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            self.counters.shed.fetch_add(1, Ordering::Relaxed);
            debug!(code = %url.short_code, "Population pool is shut down, dropping task");
            return false;
        };

        match sender.try_send(Task { url, epoch }) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(task)) => {
                self.counters.shed.fetch_add(1, Ordering::Relaxed);
                warn!(code = %task.url.short_code, "Population queue is full, dropping task");
                false
            }
            Err(TrySendError::Closed(task)) => {
                self.counters.shed.fetch_add(1, Ordering::Relaxed);
                debug!(code = %task.url.short_code, "Population queue is closed, dropping task");
                false
            }
        }
    }

    pub fn stats(&self) -> PopulationStats {
        self.counters.snapshot()
    }

    /// Stops accepting tasks, lets the workers drain the queue and waits
    /// for them to exit. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        // Dropping the last sender ends each worker's `recv` loop once the
        // queue is empty.
        drop(self.sender.lock().take());
        let handles = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            return;
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache population worker terminated abnormally");
            }
        }
        info!(stats = ?self.stats(), "Stopped cache population pool");
    }
}

async fn run_worker<C: UrlCache>(
    id: usize,
    cache: Arc<C>,
    receiver: SharedReceiver,
    counters: Arc<Counters>,
    epochs: Arc<DeleteEpochs>,
    settings: PopulationSettings,
) {
    trace!(worker = id, "Cache population worker started");
    loop {
        // The queue lock is released before any cache I/O.
        let next = receiver.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };

        let counter = match populate(cache.as_ref(), &epochs, &task, settings).await {
            Outcome::Populated => &counters.populated,
            Outcome::Revoked => &counters.revoked,
            Outcome::Failed => &counters.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
    trace!(worker = id, "Cache population worker stopped");
}

/// Replaces the cache entry for the task's record unless its code was
/// deleted after the task's epoch was observed.
async fn populate<C: UrlCache>(
    cache: &C,
    epochs: &DeleteEpochs,
    task: &Task,
    settings: PopulationSettings,
) -> Outcome {
    let code = &task.url.short_code;
    if epochs.current(code) != task.epoch {
        debug!(code = %code, "Short code deleted before population, skipping task");
        return Outcome::Revoked;
    }

    trace!(code = %code, "Populating cache");
    let written = tokio::time::timeout(
        settings.timeout,
        cache.replace(code, &task.url, settings.cache_ttl),
    )
    .await;

    // A delete that bumped the epoch after this check removes the entry itself.
    if epochs.current(code) != task.epoch {
        return undo(cache, code, settings).await;
    }

    match written {
        Ok(Ok(())) => {
            debug!(code = %code, "Populated cache");
            Outcome::Populated
        }
        Ok(Err(e)) => {
            warn!(code = %code, error = %e, "Cache population failed, dropping task");
            Outcome::Failed
        }
        Err(_) => {
            warn!(
                code = %code,
                timeout = ?settings.timeout,
                "Cache population timed out, dropping task"
            );
            Outcome::Failed
        }
    }
}

/// Removes an entry written concurrently with a delete of its code.
async fn undo<C: UrlCache>(cache: &C, code: &ShortCode, settings: PopulationSettings) -> Outcome {
    match tokio::time::timeout(settings.timeout, cache.delete(code)).await {
        Ok(Ok(())) => {
            debug!(code = %code, "Short code deleted during population, entry removed");
            Outcome::Revoked
        }
        Ok(Err(e)) => {
            warn!(code = %code, error = %e, "Failed to remove entry of deleted short code");
            Outcome::Failed
        }
        Err(_) => {
            warn!(
                code = %code,
                timeout = ?settings.timeout,
                "Timed out removing entry of deleted short code"
            );
            Outcome::Failed
        }
    }
}
