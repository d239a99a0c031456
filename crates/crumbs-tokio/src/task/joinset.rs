use std::future::Future;

use crumbs_runtime::ContextSnapshot;
use tokio::task::{AbortHandle, JoinError};
use tracing::trace;

/// Context-forking equivalent of [`tokio::task::JoinSet`].
///
/// Each spawned future starts from the context of the caller of [`JoinSet::spawn`].
pub struct JoinSet<T> {
    inner: tokio::task::JoinSet<T>,
}

impl<T> JoinSet<T>
where
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: tokio::task::JoinSet::new(),
        }
    }

    /// Spawns a future into the set, matching [`tokio::task::JoinSet::spawn`].
    pub fn spawn<F>(&mut self, future: F) -> AbortHandle
    where
        F: Future<Output = T> + Send + 'static,
    {
        let snapshot = ContextSnapshot::capture();
        trace!(
            depth = snapshot.depth(),
            "forking context into join set task"
        );
        self.inner.spawn(snapshot.scope(future))
    }

    /// Returns whether the set is empty, matching [`tokio::task::JoinSet::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of tasks still tracked, like [`tokio::task::JoinSet::len`].
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Aborts all in-flight tasks, equivalent to [`tokio::task::JoinSet::abort_all`].
    pub fn abort_all(&mut self) {
        self.inner.abort_all();
    }

    /// Waits for one task to complete, matching [`tokio::task::JoinSet::join_next`].
    pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
        self.inner.join_next().await
    }

    /// Waits for every task, matching [`tokio::task::JoinSet::join_all`].
    pub async fn join_all(self) -> Vec<T> {
        self.inner.join_all().await
    }
}

impl<T> Default for JoinSet<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crumbs_runtime::{get_all_messages, in_current_context, push};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn each_member_starts_from_the_spawn_site_context() {
        in_current_context(async {
            let _request = push("request");
            let mut set = JoinSet::new();
            for worker in 0..4 {
                let _slot = push(format!("slot-{worker}"));
                set.spawn(async move {
                    let _work = push(format!("worker-{worker}"));
                    tokio::task::yield_now().await;
                    get_all_messages(None)
                });
            }
            assert_eq!(set.len(), 4);

            let mut views = Vec::new();
            while let Some(joined) = set.join_next().await {
                views.push(joined.expect("worker should not panic"));
            }
            views.sort();
            for (worker, view) in views.iter().enumerate() {
                assert_eq!(
                    view,
                    &vec![
                        format!("worker-{worker}"),
                        format!("slot-{worker}"),
                        "request".to_string(),
                    ]
                );
            }
            assert!(set.is_empty());
            assert_eq!(get_all_messages(None), vec!["request"]);
        })
        .await;
    }

    #[tokio::test]
    async fn abort_all_cancels_members() {
        let mut set: JoinSet<()> = JoinSet::default();
        set.spawn(std::future::pending());
        set.abort_all();
        let joined = set
            .join_next()
            .await
            .expect("the aborted task is still reported");
        assert!(joined.expect_err("task was aborted").is_cancelled());
    }
}
