//! [`Command`] for deleting a [`Session`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Session`] (logging out).
///
/// Deleting a missing [`Session`] succeeds.
#[derive(Clone, Debug, From)]
pub struct DeleteUserSession {
    /// Token of the [`Session`] to delete.
    pub token: session::Token,
}

impl<Db> Command<DeleteUserSession> for Service<Db>
where
    Db: Database<
        Delete<By<Session, session::Token>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        let DeleteUserSession { token } = cmd;

        self.database()
            .execute(Delete(By::<Session, _>::new(token)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`DeleteUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod tests {
    use common::operations::{By, Select};

    use super::DeleteUserSession;
    use crate::{
        command::{Command as _, CreateUserSession},
        domain::user::{self, session, Session},
        infra::{database::Memory, Database as _},
        test_support::{service, user},
    };

    #[tokio::test]
    async fn deletes_session() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;
        let created = svc
            .execute(CreateUserSession::ByUserId(u.id))
            .await
            .unwrap();

        svc.execute(DeleteUserSession {
            token: created.token.clone(),
        })
        .await
        .unwrap();

        let found = db
            .execute(Select(By::<Option<Session>, _>::new(created.token)))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn ignores_missing_session() {
        let svc = service(Memory::new());

        svc.execute(DeleteUserSession {
            token: session::Token::generate(),
        })
        .await
        .unwrap();
    }
}
