//! Join primitives shared by the export and erasure aggregators
//!
//! - [`CompletionGroup`]: a join counter that may grow while it is being
//!   awaited, because a running unit can spawn further units
//! - [`FailureSlot`]: keeps the first failure of an operation, drops the rest
//! - [`SharedState`]: the one lock an operation merges results under

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::Notify;
use tracing::{debug, error};

use crate::error::{GdprError, Result};

struct GroupInner {
    pending: AtomicUsize,
    all_done: Notify,
}

/// Counting completion group
///
/// The count is incremented before every spawn and decremented when the
/// spawned unit's [`CompletionGuard`] drops. [`CompletionGroup::wait`]
/// resolves once the count is back at zero. A unit that spawns children
/// holds its own guard until after the children are counted, so the count
/// cannot touch zero while work is still being discovered.
#[derive(Clone)]
pub struct CompletionGroup {
    inner: Arc<GroupInner>,
}

/// Membership of one unit in a [`CompletionGroup`]
#[must_use = "the unit leaves the group when the guard drops"]
pub struct CompletionGuard {
    inner: Arc<GroupInner>,
}

impl CompletionGroup {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GroupInner {
                pending: AtomicUsize::new(0),
                all_done: Notify::new(),
            }),
        }
    }

    /// Register one unit of work
    pub fn enter(&self) -> CompletionGuard {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        CompletionGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Register a unit and run it on the ambient runtime
    ///
    /// The unit leaves the group when it finishes. A panicking unit is
    /// recorded as a failure of `state` before it leaves.
    pub fn spawn<T, F>(&self, state: &SharedState<T>, unit: F)
    where
        T: Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = self.enter();
        let state = state.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(panic) = AssertUnwindSafe(unit).catch_unwind().await {
                let message = panic_message(&*panic);
                error!("Unit panicked: {}", message);
                state.fail(GdprError::Generic(format!("Task panicked: {}", message)));
            }
        });
    }

    /// Number of units still running
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Wait until every registered unit has finished
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.all_done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

impl Default for CompletionGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.inner.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.all_done.notify_waiters();
        }
    }
}

/// First-failure-wins error slot
#[derive(Debug, Default)]
pub struct FailureSlot {
    first: Option<GdprError>,
}

impl FailureSlot {
    /// Record a failure
    ///
    /// # Returns
    /// * `bool` - true if this was the first failure, false if it was dropped
    pub fn record(&mut self, error: GdprError) -> bool {
        if let Some(first) = &self.first {
            debug!("Dropping failure after '{}': {}", first, error);
            return false;
        }
        self.first = Some(error);
        true
    }

    pub fn is_set(&self) -> bool {
        self.first.is_some()
    }

    pub fn take(&mut self) -> Option<GdprError> {
        self.first.take()
    }
}

/// Merge target plus failure slot of one operation
#[derive(Debug, Default)]
pub struct OperationState<T> {
    pub data: T,
    pub failure: FailureSlot,
}

/// Operation state shared between concurrent units behind a single lock
///
/// Critical sections are short and never await.
pub struct SharedState<T> {
    inner: Arc<Mutex<OperationState<T>>>,
}

impl<T> Clone for SharedState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedState<T> {
    pub fn new(data: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OperationState {
                data,
                failure: FailureSlot::default(),
            })),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, OperationState<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a failure has already been recorded
    pub fn failed(&self) -> bool {
        self.lock().failure.is_set()
    }

    /// Record a failure in the slot
    pub fn fail(&self, error: GdprError) -> bool {
        self.lock().failure.record(error)
    }

    /// Apply `merge` to the data unless a failure was already recorded
    ///
    /// # Returns
    /// * `bool` - false if the merge was discarded
    pub fn merge_unless_failed(&self, merge: impl FnOnce(&mut T)) -> bool {
        let mut state = self.lock();
        if state.failure.is_set() {
            return false;
        }
        merge(&mut state.data);
        true
    }

    /// Final outcome: the first failure if any, otherwise the merged data
    ///
    /// Only call after every unit holding a clone has finished.
    pub fn into_result(self) -> Result<T>
    where
        T: Default,
    {
        let mut state = self.lock();
        match state.failure.take() {
            Some(error) => Err(error),
            None => Ok(std::mem::take(&mut state.data)),
        }
    }
}
