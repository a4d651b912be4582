//! [`Command`] for renewing a [`Session`].

use common::operations::{By, Commit, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for prolonging a [`Session`] for the configured lifetime
/// starting from now.
#[derive(Clone, Debug, From)]
pub struct RenewUserSession {
    /// Token of the [`Session`] to renew.
    pub token: session::Token,
}

impl<Db> Command<RenewUserSession> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Session>, session::Token>>,
            Ok = Option<Session>,
            Err = Traced<database::Error>,
        > + Database<Update<Session>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RenewUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RenewUserSession { token } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Expired `Session` cannot be revived.
        let mut session = tx
            .execute(Select(By::<Option<Session>, _>::new(token)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|s| !s.is_expired_at(session::ExpirationDateTime::now()))
            .ok_or(E::InvalidSession)
            .map_err(tracerr::wrap!())?;

        session.prolong(self.config().session_lifetime);
        tx.execute(Update(session.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(session)
    }
}

/// Error of [`RenewUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Session`] is missing or expired.
    #[display("Invalid or expired `Session`")]
    InvalidSession,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::operations::{By, Insert, Select};

    use super::{ExecutionError, RenewUserSession};
    use crate::{
        command::Command as _,
        domain::user::{self, session, Session},
        infra::{database::Memory, Database as _},
        test_support::{service, user},
    };

    #[tokio::test]
    async fn prolongs_session() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;
        let session = Session {
            token: session::Token::generate(),
            user_id: u.id,
            expires_at: session::ExpirationDateTime::now()
                + Duration::from_secs(60),
        };
        db.execute(Insert(session.clone())).await.unwrap();

        let renewed = svc
            .execute(RenewUserSession {
                token: session.token.clone(),
            })
            .await
            .unwrap();

        assert!(renewed.expires_at > session.expires_at);
        let stored = db
            .execute(Select(By::<Option<Session>, _>::new(session.token)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.expires_at, renewed.expires_at);
    }

    #[tokio::test]
    async fn refuses_to_revive_expired_session() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;
        let session = Session {
            token: session::Token::generate(),
            user_id: u.id,
            expires_at: session::ExpirationDateTime::now()
                - Duration::from_secs(1),
        };
        db.execute(Insert(session.clone())).await.unwrap();

        let err = svc
            .execute(RenewUserSession {
                token: session.token,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidSession));
    }
}
