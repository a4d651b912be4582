//! [`CleanExpiredSessions`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::user::{session, Session},
    infra::{database, Database},
    Service,
};

use super::Task;

/// Configuration for [`CleanExpiredSessions`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between expired [`Session`]s cleaning.
    pub interval: time::Duration,
}

/// [`Task`] for deleting expired [`Session`]s.
#[derive(Clone, Copy, Debug)]
pub struct CleanExpiredSessions<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<CleanExpiredSessions<Self>, Config>>> for Service<Db>
where
    CleanExpiredSessions<Service<Db>>:
        Task<Perform<()>, Ok = (), Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CleanExpiredSessions<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CleanExpiredSessions {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::CleanExpiredSessions` failed: {e}");
            });
        }
    }
}

impl<Db> Task<Perform<()>> for CleanExpiredSessions<Service<Db>>
where
    Db: Database<
        Delete<By<Session, session::ExpirationDateTime>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let now = session::ExpirationDateTime::now();
        log::debug!("deleting `Session`s expired by {}", now.to_rfc3339());
        self.service
            .database()
            .execute(Delete(By::new(now)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`CleanExpiredSessions`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::operations::{By, Insert, Perform, Select};

    use super::{CleanExpiredSessions, Config};
    use crate::{
        domain::user::{self, session, Session},
        infra::{database::Memory, Database as _},
        task::Task as _,
        test_support::service,
    };

    #[tokio::test]
    async fn deletes_only_expired_sessions() {
        let svc = service(Memory::new());
        let db = svc.database();

        let now = session::ExpirationDateTime::now();
        let expired = Session {
            token: session::Token::generate(),
            user_id: user::Id::new(),
            expires_at: now - Duration::from_secs(1),
        };
        let alive = Session {
            token: session::Token::generate(),
            user_id: user::Id::new(),
            expires_at: now + Duration::from_secs(3600),
        };
        db.execute(Insert(expired.clone())).await.unwrap();
        db.execute(Insert(alive.clone())).await.unwrap();

        let task = CleanExpiredSessions {
            config: Config {
                interval: Duration::from_secs(60),
            },
            service: svc.clone(),
        };
        task.execute(Perform(())).await.unwrap();

        let select = |token: session::Token| {
            db.execute(Select(By::<Option<Session>, _>::new(token)))
        };
        assert!(select(expired.token).await.unwrap().is_none());
        assert!(select(alive.token).await.unwrap().is_some());
    }
}
