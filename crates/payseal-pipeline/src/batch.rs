// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator — run independent per-item operations with bounded
// concurrency, real progress, per-item failure isolation and cooperative
// cancellation.
//
// Work runs on a `JoinSet`; completions are drained by a single loop, which
// is the only place item state is written. Completion order therefore never
// affects the final state of any item.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use payseal_core::error::{PaysealError, Result};
use payseal_core::types::BatchOutcome;
use tokio::sync::watch;
use tokio::task::{Id, JoinSet};
use tracing::{debug, info, instrument, warn};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancel flag shared between a caller and a running batch.
///
/// Setting it stops further submissions; operations already in flight are
/// left to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Percentage of settled items, `round(settled / total * 100)`.
///
/// An empty batch is complete by definition.
pub fn percent(settled: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let settled = settled.min(total);
    let rounded = (settled * 200 + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Publishes batch progress (0..=100) through a watch channel.
///
/// Values never decrease within a run. 100 is reserved for a fully drained
/// batch.
#[derive(Debug)]
pub struct ProgressTracker {
    tx: watch::Sender<u8>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> u8 {
        *self.tx.borrow()
    }

    /// Back to 0 for a new run.
    pub fn reset(&self) {
        self.tx.send_replace(0);
    }

    fn record(&self, settled: usize, total: usize) {
        self.advance(percent(settled, total).min(99));
    }

    fn finish(&self) {
        self.advance(100);
    }

    fn advance(&self, value: u8) {
        self.tx.send_if_modified(|current| {
            if value > *current {
                *current = value;
                true
            } else {
                false
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// One unit of work. `label` names the item in logs and error messages.
#[derive(Debug, Clone)]
pub struct BatchItem<T> {
    pub label: String,
    pub input: T,
}

impl<T> BatchItem<T> {
    pub fn new(label: impl Into<String>, input: T) -> Self {
        Self {
            label: label.into(),
            input,
        }
    }
}

/// Receives item lifecycle events from the drain loop.
///
/// Both methods are called from one place only, so an implementation may
/// hold `&mut` access to shared state without further synchronisation.
pub trait BatchObserver<O> {
    /// Item `index` was submitted.
    fn started(&mut self, index: usize);

    /// Item `index` finished. Called exactly once per submitted item.
    fn settled(&mut self, index: usize, result: Result<O>);
}

/// Drives one batch to completion.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    max_concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run `operation` over every item and return the aggregate outcome.
    ///
    /// Each item is attempted independently: a failure is recorded and the
    /// batch carries on. If `cancel` fires, no further items are submitted
    /// and the outcome is marked cancelled; items never submitted produce no
    /// observer events.
    #[instrument(skip_all, fields(items = items.len(), max_concurrency = self.max_concurrency))]
    pub async fn run<T, O, F, Fut>(
        &self,
        items: Vec<BatchItem<T>>,
        operation: F,
        observer: &mut impl BatchObserver<O>,
        progress: &ProgressTracker,
        cancel: &CancelHandle,
    ) -> BatchOutcome
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<O>> + Send + 'static,
        O: Send + 'static,
    {
        let total = items.len();
        let (labels, inputs): (Vec<String>, Vec<T>) =
            items.into_iter().map(|item| (item.label, item.input)).unzip();
        let mut queue = inputs.into_iter().enumerate().peekable();

        let mut outcome = BatchOutcome::default();
        let mut in_flight: JoinSet<Result<O>> = JoinSet::new();
        let mut task_index: HashMap<Id, usize> = HashMap::with_capacity(self.max_concurrency);
        let mut settled = 0usize;

        info!(total, "batch started");

        loop {
            while in_flight.len() < self.max_concurrency && queue.peek().is_some() {
                if cancel.is_cancelled() {
                    if !outcome.cancelled {
                        info!(submitted = settled + in_flight.len(), total, "batch cancelled");
                    }
                    outcome.cancelled = true;
                    break;
                }
                let Some((index, input)) = queue.next() else {
                    break;
                };
                observer.started(index);
                let handle = in_flight.spawn(operation(input));
                task_index.insert(handle.id(), index);
            }
            if outcome.cancelled {
                // Drop whatever was never submitted.
                queue.by_ref().for_each(drop);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };
            let (task_id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(err) => (err.id(), Err(PaysealError::Task(err.to_string()))),
            };
            let Some(index) = task_index.remove(&task_id) else {
                warn!(?task_id, "completion for unknown task ignored");
                continue;
            };

            settled += 1;
            let label = &labels[index];
            match result {
                Ok(value) => {
                    outcome.completed_count += 1;
                    debug!(item = %label, "item completed");
                    observer.settled(index, Ok(value));
                }
                Err(err) => {
                    outcome.failed_count += 1;
                    warn!(item = %label, error = %err, "item failed");
                    outcome.errors.push(format!("{label}: {err}"));
                    observer.settled(index, Err(err));
                }
            }
            progress.record(settled, total);
        }

        if !outcome.cancelled {
            progress.finish();
        }

        info!(
            completed = outcome.completed_count,
            failed = outcome.failed_count,
            cancelled = outcome.cancelled,
            "batch drained"
        );
        outcome
    }
}
