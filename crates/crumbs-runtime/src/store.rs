//! Storage for the current top of the context stack.
//!
//! The slot follows the logical call flow rather than the OS thread. Inside a
//! [`ContextFuture`] the slot lives in a Tokio task-local, which travels with the
//! future when a multi-thread runtime resumes it on another worker. A Tokio task
//! spawned without a scope gets a slot of its own keyed by its task id, so it
//! never shares frames with other tasks polled by the same worker. Anywhere else,
//! such as plain threads or the `block_on` future, each thread has its own slot.
//!
//! Forking is explicit: [`ContextSnapshot::capture`] clones the current top (one
//! refcount bump) and [`ContextSnapshot::scope`] installs it as the child's own
//! slot. Mutations on either side after that are invisible to the other.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::task::Id as TaskId;
use tokio::task::futures::TaskLocalFuture;
use tracing::debug;

use crate::node::{ContextNode, Frames};
use crate::value::FrameValue;

type Slot = RefCell<Option<Arc<ContextNode>>>;

tokio::task_local! {
    static FLOW_TOP: Slot;
}

thread_local! {
    static THREAD_TOP: Slot = const { RefCell::new(None) };
}

// Only non-empty stacks have an entry, so a task that pops everything leaves
// nothing behind.
static TASK_TOPS: LazyLock<Mutex<HashMap<TaskId, Arc<ContextNode>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

enum ActiveSlot {
    Flow,
    Task(TaskId),
    Thread,
}

fn active_slot() -> ActiveSlot {
    if in_flow_scope() {
        ActiveSlot::Flow
    } else if let Some(id) = tokio::task::try_id() {
        ActiveSlot::Task(id)
    } else {
        ActiveSlot::Thread
    }
}

/// Returns the current flow's top node, if any frame is pushed.
pub fn current_top() -> Option<Arc<ContextNode>> {
    match active_slot() {
        ActiveSlot::Flow => FLOW_TOP
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten(),
        ActiveSlot::Task(id) => TASK_TOPS.lock().get(&id).cloned(),
        ActiveSlot::Thread => THREAD_TOP.with(|slot| slot.borrow().clone()),
    }
}

/// Installs `top` as the current flow's top node and returns the previous one.
pub(crate) fn replace_top(top: Option<Arc<ContextNode>>) -> Option<Arc<ContextNode>> {
    match active_slot() {
        ActiveSlot::Flow => FLOW_TOP
            .try_with(|slot| slot.replace(top))
            .ok()
            .flatten(),
        ActiveSlot::Task(id) => {
            let installing = top.is_some();
            let previous = {
                let mut tops = TASK_TOPS.lock();
                match top {
                    Some(node) => tops.insert(id, node),
                    None => tops.remove(&id),
                }
            };
            // Logged after unlocking: event formatters read the slot too.
            if installing && previous.is_none() {
                debug!(task = %id, "task has no context scope, using a task-keyed slot");
            }
            previous
        }
        ActiveSlot::Thread => THREAD_TOP.with(|slot| slot.replace(top)),
    }
}

/// Whether the caller runs inside a task-local context scope, as opposed to one
/// of the fallback slots.
pub fn in_flow_scope() -> bool {
    FLOW_TOP.try_with(|_| ()).is_ok()
}

/// A captured view of a flow's context stack.
///
/// Capturing is O(1): the snapshot shares the nodes of the flow it was taken from.
#[derive(Clone, Default)]
pub struct ContextSnapshot {
    top: Option<Arc<ContextNode>>,
}

impl ContextSnapshot {
    pub fn capture() -> Self {
        Self { top: current_top() }
    }

    pub const fn empty() -> Self {
        Self { top: None }
    }

    pub fn depth(&self) -> usize {
        self.top.as_deref().map_or(0, ContextNode::depth)
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    pub fn top(&self) -> Option<&Arc<ContextNode>> {
        self.top.as_ref()
    }

    /// Frames of this snapshot, most recent first.
    pub fn frames(&self) -> Frames<'_> {
        match self.top.as_deref() {
            Some(top) => top.frames(),
            None => Frames::default(),
        }
    }

    pub fn objects(&self) -> Vec<FrameValue> {
        self.frames().map(|node| node.value().clone()).collect()
    }

    /// Returns a snapshot with one more frame on top. `self` is left unchanged.
    pub fn with_frame<T>(&self, value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Self {
            top: Some(ContextNode::new(self.top.clone(), FrameValue::new(value))),
        }
    }

    /// Runs `future` with this snapshot as its own context slot.
    pub fn scope<F: Future>(self, future: F) -> ContextFuture<F> {
        ContextFuture {
            inner: FLOW_TOP.scope(RefCell::new(self.top), future),
        }
    }

    /// Installs this snapshot in the active slot until the guard drops.
    ///
    /// Used to carry a context onto a plain thread, e.g. a blocking pool worker.
    /// Whatever the thread pushes while the guard is alive is discarded when the
    /// previous top is restored.
    pub fn enter(&self) -> SnapshotGuard {
        let previous = replace_top(self.top.clone());
        SnapshotGuard {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl fmt::Debug for ContextSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.frames().map(ContextNode::value))
            .finish()
    }
}

/// Restores the previous context when dropped. See [`ContextSnapshot::enter`].
#[must_use = "the snapshot is only installed while the guard is alive"]
pub struct SnapshotGuard {
    previous: Option<Arc<ContextNode>>,
    // The guard restores a per-thread slot, so it must not migrate.
    _not_send: PhantomData<*const ()>,
}

impl Drop for SnapshotGuard {
    fn drop(&mut self) {
        replace_top(self.previous.take());
    }
}

/// A future running with its own context slot. Created by [`ContextSnapshot::scope`].
pub struct ContextFuture<F: Future> {
    inner: TaskLocalFuture<Slot, F>,
}

impl<F: Future> Future for ContextFuture<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // SAFETY: projecting to `inner`, which is structurally pinned and never
        // moved out of.
        let inner = unsafe { self.map_unchecked_mut(|this| &mut this.inner) };
        inner.poll(cx)
    }
}

/// Runs `future` with a fork of the caller's current context.
pub fn in_current_context<F: Future>(future: F) -> ContextFuture<F> {
    ContextSnapshot::capture().scope(future)
}
