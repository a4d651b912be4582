//! Environment driving the background [`Task`]s of a [`Service`].
//!
//! [`Service`]: crate::Service

use std::{
    error::Error,
    future::{Future, IntoFuture},
};

use derive_more::Display;
use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Environment driving named [`Task`]s on the current thread.
///
/// Nothing runs until the [`Background`] is awaited. It resolves once all the
/// [`Task`]s finish, or as soon as any of them fails.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set the [`Task`]s are spawned onto.
    set: task::LocalSet,

    /// Names of the spawned [`Task`]s along with their handles.
    tasks: Vec<(&'static str, task::JoinHandle<Result<(), Failure>>)>,
}

impl Background {
    /// Spawns the provided `task` under the given `name`.
    pub fn spawn<F, E>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        log::debug!(task = name, "spawning background task");
        let handle = self.set.spawn_local(async move {
            task.await.map_err(|e| Failure::new(name, e))
        });
        self.tasks.push((name, handle));
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Failure>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, tasks } = self;
        let finished = future::try_join_all(tasks.into_iter().map(
            |(name, handle)| {
                handle.map(move |res| {
                    // Panicked or aborted.
                    res.unwrap_or_else(|e| Err(Failure::new(name, e)))
                })
            },
        ));
        async move { set.run_until(finished).await.map(drop) }.boxed_local()
    }
}

/// Failure of a [`Background`] [`Task`].
#[derive(Debug, Display)]
#[display("`{name}` background task failed: {cause}")]
pub struct Failure {
    /// Name of the failed [`Task`].
    pub name: &'static str,

    /// Cause of the failure.
    cause: Box<dyn Error>,
}

impl Failure {
    /// Creates a new [`Failure`] of the [`Task`] with the provided `name`.
    fn new(name: &'static str, cause: impl Error + 'static) -> Self {
        Self {
            name,
            cause: Box::new(cause),
        }
    }
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.cause)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use derive_more::{Display, Error};

    use super::Background;

    #[derive(Debug, Display, Error)]
    #[display("boom")]
    struct Boom;

    #[tokio::test]
    async fn runs_tasks_only_when_awaited() {
        let runs = Rc::new(Cell::new(0));
        let mut bg = Background::default();
        for _ in 0..3 {
            let runs = Rc::clone(&runs);
            bg.spawn("count", async move {
                runs.set(runs.get() + 1);
                Ok::<_, Boom>(())
            });
        }
        assert_eq!(runs.get(), 0);

        bg.await.unwrap();

        assert_eq!(runs.get(), 3);
    }

    #[tokio::test]
    async fn reports_failed_task_by_name() {
        let mut bg = Background::default();
        bg.spawn("endless", futures::future::pending::<Result<(), Boom>>());
        bg.spawn("failing", async { Err(Boom) });

        let failure = bg.await.unwrap_err();

        assert_eq!(failure.name, "failing");
        assert_eq!(failure.to_string(), "`failing` background task failed: boom");
    }
}
