//! Context-forking task spawning, mirroring [`tokio::task`].
//!
//! Every spawn captures the caller's context stack and installs the capture as the
//! child's own slot. The child starts with the parent's frames; pushes and pops on
//! either side afterwards stay on that side.
//!
//! | Item | Tokio equivalent |
//! |---|---|
//! | [`JoinSet`] | [`tokio::task::JoinSet`] |
//! | [`JoinHandle`] | [`tokio::task::JoinHandle`] (re-exported) |
//! | [`spawn`] | [`tokio::task::spawn`] |
//! | [`spawn_blocking`] | [`tokio::task::spawn_blocking`] |
//! | [`FutureExt`] | *(crumbs extension)* |

pub mod joinset;

pub use self::joinset::*;
pub use tokio::task::JoinHandle;

use std::fmt;
use std::future::{Future, IntoFuture};

use crumbs_runtime::{ContextFuture, ContextSnapshot};
use tracing::trace;

/// Extension trait for running any future on a fork of the current context.
///
/// Tokio's `join!` and `select!` poll their branches inside the parent task, so
/// branches share one slot unless each is forked:
///
/// ```rust,no_run
/// use crumbs_tokio::task::FutureExt as _;
///
/// # async fn demo() {
/// let _request = crumbs_runtime::push("request");
/// tokio::join!(
///     fetch_user().with_frame("user"),
///     fetch_orders().with_frame("orders"),
/// );
/// # }
/// # async fn fetch_user() {}
/// # async fn fetch_orders() {}
/// ```
pub trait FutureExt: IntoFuture + Sized {
    /// Runs this future on a fork of the caller's context.
    fn in_current_context(self) -> ContextFuture<Self::IntoFuture> {
        ContextSnapshot::capture().scope(self.into_future())
    }

    /// Runs this future on a fork of the caller's context with `value` pushed on top.
    fn with_frame<T>(self, value: T) -> ContextFuture<Self::IntoFuture>
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        ContextSnapshot::capture()
            .with_frame(value)
            .scope(self.into_future())
    }
}

impl<F: IntoFuture + Sized> FutureExt for F {}

/// Spawns a task on a fork of the current context, like [`tokio::task::spawn`].
pub fn spawn<T, F>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let snapshot = ContextSnapshot::capture();
    trace!(depth = snapshot.depth(), "forking context into spawned task");
    tokio::task::spawn(snapshot.scope(future))
}

/// Runs `f` on the blocking pool with a fork of the current context, like
/// [`tokio::task::spawn_blocking`].
///
/// The pool thread gets the capture for the duration of `f` only; anything `f`
/// leaves pushed is dropped when it returns.
pub fn spawn_blocking<T, F>(f: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let snapshot = ContextSnapshot::capture();
    trace!(
        depth = snapshot.depth(),
        "forking context into blocking task"
    );
    tokio::task::spawn_blocking(move || {
        let _entered = snapshot.enter();
        f()
    })
}
