use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::RwLock;
use tracing::warn;

use crate::events::{Event, EventBus};
use crate::model::{Models, Partition, Record};
use crate::ordering::SortKey;

/// Batches below this size are applied synchronously; at or above it they
/// are routed to the background worker so the interface stays responsive.
pub const RESTORE_SYNC_THRESHOLD: usize = 100;

/// Receives coalesced progress while a batch restores. `dismissed` fires
/// after a short grace delay so very fast restores do not flicker.
pub trait ProgressSink: Send + 'static {
    fn progress(&self, processed: usize, total: usize);
    fn completed(&self, restored: usize);
    fn dismissed(&self);
}

/// Forwards progress onto the event bus for any subscribed view.
pub struct BusProgress {
    pub bus: EventBus,
    pub partition: Partition,
}

impl ProgressSink for BusProgress {
    fn progress(&self, processed: usize, total: usize) {
        self.bus.publish(Event::RestoreProgress {
            partition: self.partition,
            processed,
            total,
        });
    }

    fn completed(&self, restored: usize) {
        self.bus.publish(Event::RestoreCompleted {
            partition: self.partition,
            restored,
        });
    }

    fn dismissed(&self) {
        self.bus.publish(Event::RestoreDismissed {
            partition: self.partition,
        });
    }
}

pub struct RestoreJob {
    pub partition: Partition,
    pub records: Vec<Record>,
    pub sort_key: SortKey,
    pub sink: Box<dyn ProgressSink>,
}

pub struct RestoreOutcome {
    /// Insertion indices in application order, for selection/scroll.
    pub inserted_indices: Vec<usize>,
    pub restored: Vec<Record>,
    pub skipped: usize,
}

struct QueuedJob {
    job: RestoreJob,
    done: Sender<RestoreOutcome>,
}

/// Single serialized background worker. Concurrency is pinned at one:
/// insertion-index computation races against itself if two batches
/// interleave on the same partition.
pub struct RestoreExecutor {
    tx: Option<Sender<QueuedJob>>,
    worker: Option<JoinHandle<()>>,
}

impl RestoreExecutor {
    pub fn new(models: Arc<RwLock<Models>>, grace: Duration) -> RestoreExecutor {
        let (tx, rx) = unbounded::<QueuedJob>();
        let worker = thread::spawn(move || {
            while let Ok(queued) = rx.recv() {
                let outcome = run_job(&models, &queued.job);
                let restored = outcome.restored.len();
                queued.job.sink.completed(restored);
                // The caller is unblocked before the grace delay; only the
                // progress indicator lingers.
                let _ = queued.done.send(outcome);
                if !grace.is_zero() {
                    thread::sleep(grace);
                }
                queued.job.sink.dismissed();
            }
        });
        RestoreExecutor {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Hands the batch to the worker. The returned receiver yields the
    /// outcome once insertion finishes; a job in flight is not
    /// cancellable, and dropping the receiver does not halt it.
    pub fn restore(&self, job: RestoreJob) -> Receiver<RestoreOutcome> {
        let (done_tx, done_rx) = bounded(1);
        if let Some(tx) = &self.tx {
            let _ = tx.send(QueuedJob { job, done: done_tx });
        }
        done_rx
    }
}

impl Drop for RestoreExecutor {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_job(models: &RwLock<Models>, job: &RestoreJob) -> RestoreOutcome {
    let total = job.records.len();
    let step = (total / 20).max(1);
    let mut processed = 0usize;
    let mut inserted_indices = Vec::new();
    let mut restored = Vec::new();
    let mut skipped = 0usize;

    // Reverse snapshot order, recomputing each index against the current
    // rows; the partition may have drifted since deletion time.
    for record in job.records.iter().rev() {
        {
            let mut models = models.write();
            let part = models.get_mut(job.partition);
            match part.insert_sorted(record.clone(), &job.sort_key) {
                Some(idx) => {
                    inserted_indices.push(idx);
                    restored.push(record.clone());
                }
                None => {
                    skipped += 1;
                    warn!(record_id = %record.record_id, "restore skipped duplicate row");
                }
            }
        }
        processed += 1;
        if processed == total || processed % step == 0 {
            job.sink.progress(processed, total);
        }
    }

    RestoreOutcome {
        inserted_indices,
        restored,
        skipped,
    }
}

/// Synchronous path for small batches; identical placement rules, no
/// progress reporting.
pub fn restore_inline(
    models: &RwLock<Models>,
    partition: Partition,
    records: &[Record],
    sort_key: &SortKey,
) -> RestoreOutcome {
    let mut inserted_indices = Vec::new();
    let mut restored = Vec::new();
    let mut skipped = 0usize;

    let mut models = models.write();
    let part = models.get_mut(partition);
    for record in records.iter().rev() {
        match part.insert_sorted(record.clone(), sort_key) {
            Some(idx) => {
                inserted_indices.push(idx);
                restored.push(record.clone());
            }
            None => {
                skipped += 1;
                warn!(record_id = %record.record_id, "restore skipped duplicate row");
            }
        }
    }

    RestoreOutcome {
        inserted_indices,
        restored,
        skipped,
    }
}
