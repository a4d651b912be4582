//! [`Command`] for deleting a [`User`].

use common::{
    operations::{By, Commit, Delete, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Appointment;
use crate::{
    domain::{user, user::Session, User},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deleting a [`User`].
///
/// [`User`] is kept in the [`Database`] as deleted, while all its [`Session`]s
/// are removed and it's unassigned from the unfinished [`Appointment`]s it
/// serves as a barber.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteUser {
    /// ID of the [`User`] to delete.
    pub user_id: user::Id,
}

impl<Db> Command<DeleteUser> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Delete<By<Session, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Update<read::appointment::BarberUnassignment>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteUser { user_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<User, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        user.deleted_at = Some(now.coerce());
        tx.execute(Update(user))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Delete(By::<Session, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Update(read::appointment::BarberUnassignment {
            barber_id: user_id,
            updated_at: now.coerce(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`DeleteUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod tests {
    use common::operations::{By, Select};

    use super::{DeleteUser, ExecutionError};
    use crate::{
        command::{Command as _, CreateUserSession},
        domain::{
            user::{self, Session},
            User,
        },
        infra::{database::Memory, Database as _},
        test_support::{service, user},
    };

    #[tokio::test]
    async fn soft_deletes_user_and_its_sessions() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;
        let created = svc
            .execute(CreateUserSession::ByUserId(u.id))
            .await
            .unwrap();

        svc.execute(DeleteUser { user_id: u.id }).await.unwrap();

        let found = db
            .execute(Select(By::<Option<User>, _>::new(u.id)))
            .await
            .unwrap();
        assert!(found.is_none());
        let session = db
            .execute(Select(By::<Option<Session>, _>::new(created.token)))
            .await
            .unwrap();
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn frees_email_of_deleted_user() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;

        svc.execute(DeleteUser { user_id: u.id }).await.unwrap();

        let found = db
            .execute(Select(By::<Option<User>, _>::new(u.email)))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn fails_on_unknown_user() {
        let svc = service(Memory::new());

        let err = svc
            .execute(DeleteUser {
                user_id: user::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
