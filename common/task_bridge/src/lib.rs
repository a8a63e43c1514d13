//! A polling bridge for running shuffles off the caller's thread.
//!
//! Callers that drive a cooperative event loop cannot afford to block on a large shuffle, and no
//! callback mechanism crosses this boundary. The bridge is therefore a manual future: `submit`
//! schedules the computation on a worker and returns a handle immediately, `poll` observes one of
//! three states without ever exposing a partial result, and `release` reclaims the bookkeeping
//! exactly once per task, handing back the outcome if the computation had landed.
//!
//! There is no cancellation of in-flight work. A caller that gives up (see
//! [`TaskBridge::run_to_completion`]'s timeout) releases the handle and must treat the task as
//! "unknown outcome, resources reclaimed": the worker finishes into a slot nobody reads.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use swap_or_not_shuffle::{shuffle, unshuffle, validate_shuffling_params};
use tracing::debug;

/// Identifies one submitted task. Ids are unique for the lifetime of the bridge and are never
/// reused after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// The operation to run off-thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleOp {
    Shuffle,
    Unshuffle,
}

/// Observed state of a task. `Pending` repeats until the computation lands; polling is free of
/// side effects at any rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Complete,
    Failed(swap_or_not_shuffle::Error),
}

/// Outcome handed back by [`TaskBridge::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Released {
    /// The computation had finished; its result is returned.
    Finished(Result<Vec<u32>, swap_or_not_shuffle::Error>),
    /// The computation was still running; its eventual result is discarded.
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The id was never issued by this bridge, or has already been released.
    UnknownTask(TaskId),
    /// The submitted inputs violate the shuffling contract.
    Shuffle(swap_or_not_shuffle::Error),
    /// `poll_interval` and `timeout` must both be non-zero.
    InvalidPollingParams,
    /// No terminal state was observed within the configured deadline. The task was released.
    Timeout { waited: Duration },
}

impl From<swap_or_not_shuffle::Error> for Error {
    fn from(e: swap_or_not_shuffle::Error) -> Error {
        Error::Shuffle(e)
    }
}

/// Caller-side polling policy: wait `initial_delay` before the first poll, poll every
/// `poll_interval` thereafter, and give up after `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingParams {
    initial_delay: Duration,
    poll_interval: Duration,
    timeout: Duration,
}

impl PollingParams {
    pub fn new(
        initial_delay: Duration,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Self, Error> {
        if poll_interval.is_zero() || timeout.is_zero() {
            return Err(Error::InvalidPollingParams);
        }
        Ok(Self {
            initial_delay,
            poll_interval,
            timeout,
        })
    }
}

/// A completed-or-pending result slot, shared between the worker and the bridge.
type Slot = Arc<Mutex<Option<Result<Vec<u32>, swap_or_not_shuffle::Error>>>>;

/// Bookkeeping for outstanding off-thread shuffles. Owns the only mutable state in this crate;
/// dropping the bridge drops every outstanding slot.
#[derive(Debug, Default)]
pub struct TaskBridge {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, Slot>>,
}

impl TaskBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `op` on a worker thread and returns immediately.
    ///
    /// Contract violations (seed length, list length) are rejected here, before any work is
    /// scheduled, so a returned [`TaskId`] always refers to a computation that will reach a
    /// terminal state.
    pub fn submit(
        &self,
        op: ShuffleOp,
        indices: Vec<u32>,
        seed: &[u8],
        rounds: u8,
    ) -> Result<TaskId, Error> {
        validate_shuffling_params(indices.len(), seed)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Slot::default();
        self.tasks.lock().insert(id, slot.clone());

        debug!(task = id, len = indices.len(), ?op, "scheduling shuffle");

        let seed = seed.to_vec();
        rayon::spawn(move || {
            let result = match op {
                ShuffleOp::Shuffle => shuffle(&indices, &seed, rounds),
                ShuffleOp::Unshuffle => unshuffle(&indices, &seed, rounds),
            };
            debug!(task = id, ok = result.is_ok(), "shuffle finished");
            *slot.lock() = Some(result);
        });

        Ok(TaskId(id))
    }

    /// Observes the task's state without consuming anything; repeat at any rate.
    pub fn poll(&self, id: TaskId) -> Result<TaskStatus, Error> {
        let tasks = self.tasks.lock();
        let slot = tasks.get(&id.0).ok_or(Error::UnknownTask(id))?;
        let status = match &*slot.lock() {
            None => TaskStatus::Pending,
            Some(Ok(_)) => TaskStatus::Complete,
            Some(Err(e)) => TaskStatus::Failed(*e),
        };
        Ok(status)
    }

    /// Forgets the task and hands back its outcome, if it ever finished.
    ///
    /// Must be called exactly once per submitted task regardless of how it ended; the id is dead
    /// afterwards and will never be issued again.
    pub fn release(&self, id: TaskId) -> Result<Released, Error> {
        let slot = self
            .tasks
            .lock()
            .remove(&id.0)
            .ok_or(Error::UnknownTask(id))?;
        let outcome = slot.lock().take();

        debug!(task = id.0, finished = outcome.is_some(), "task released");

        Ok(match outcome {
            Some(result) => Released::Finished(result),
            None => Released::Abandoned,
        })
    }

    /// Number of submitted tasks that have not been released yet.
    pub fn outstanding(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Submits `op` and drives the polling loop on the calling thread until the task resolves.
    ///
    /// A deadline miss releases the task before surfacing [`Error::Timeout`]; the underlying
    /// computation is not stopped.
    pub fn run_to_completion(
        &self,
        op: ShuffleOp,
        indices: Vec<u32>,
        seed: &[u8],
        rounds: u8,
        params: PollingParams,
    ) -> Result<Vec<u32>, Error> {
        let id = self.submit(op, indices, seed, rounds)?;
        let start = Instant::now();
        thread::sleep(params.initial_delay);

        loop {
            if start.elapsed() > params.timeout {
                let _ = self.release(id);
                return Err(Error::Timeout {
                    waited: start.elapsed(),
                });
            }
            match self.poll(id)? {
                TaskStatus::Pending => thread::sleep(params.poll_interval),
                TaskStatus::Complete | TaskStatus::Failed(_) => break,
            }
        }

        match self.release(id)? {
            Released::Finished(result) => result.map_err(Error::Shuffle),
            // A terminal poll was observed, so the slot cannot be empty.
            Released::Abandoned => Err(Error::UnknownTask(id)),
        }
    }
}
