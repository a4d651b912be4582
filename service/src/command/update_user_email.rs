//! [`Command`] for changing the [`user::Email`] a [`User`] logs in with.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{self, Constraint},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for changing the [`user::Email`] a [`User`] logs in with.
#[derive(Clone, Debug)]
pub struct UpdateUserEmail {
    /// ID of the [`User`] whose [`user::Email`] should be changed.
    pub user_id: user::Id,

    /// New [`user::Email`] of the [`User`].
    pub email: user::Email,
}

impl<Db> Command<UpdateUserEmail> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateUserEmail,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserEmail { user_id, email } = cmd;

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
        if user.email == email {
            return Ok(user);
        }

        let holder = tx
            .execute(Select(By::<Option<User>, _>::new(email.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if holder.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        user.email = email;
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| email_occupied(e, &user.email))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| email_occupied(e, &user.email))?;

        Ok(user)
    }
}

/// Reports a concurrently taken [`user::Email`] as
/// [`ExecutionError::EmailOccupied`].
fn email_occupied(
    e: Traced<ExecutionError>,
    email: &user::Email,
) -> Traced<ExecutionError> {
    if matches!(
        e.as_ref(),
        ExecutionError::Db(db) if db.violated() == Some(Constraint::UserEmail),
    ) {
        tracerr::new!(ExecutionError::EmailOccupied(email.clone()))
    } else {
        e
    }
}

/// Error of [`UpdateUserEmail`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::Email`] belongs to another [`User`].
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod tests {
    use common::operations::{By, Select};

    use super::{ExecutionError, UpdateUserEmail};
    use crate::{
        command::Command as _,
        domain::{user, User},
        infra::{database::Memory, Database as _},
        test_support::{service, user},
    };

    #[tokio::test]
    async fn moves_login_to_new_email() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;
        let email = user::Email::new("New.Mail@example.com").unwrap();

        let updated = svc
            .execute(UpdateUserEmail {
                user_id: u.id,
                email: email.clone(),
            })
            .await
            .unwrap();

        assert_eq!(updated.email.to_string(), "new.mail@example.com");
        let by_old = db
            .execute(Select(By::<Option<User>, _>::new(u.email)))
            .await
            .unwrap();
        let by_new = db
            .execute(Select(By::<Option<User>, _>::new(email)))
            .await
            .unwrap();
        assert!(by_old.is_none());
        assert_eq!(by_new.map(|u| u.id), Some(u.id));
    }

    #[tokio::test]
    async fn keeps_same_email() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;

        let updated = svc
            .execute(UpdateUserEmail {
                user_id: u.id,
                email: u.email.clone(),
            })
            .await
            .unwrap();

        assert_eq!(updated.email, u.email);
    }

    #[tokio::test]
    async fn rejects_email_of_another_user() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;
        let other = user(&db, user::Role::Barber).await;

        let err = svc
            .execute(UpdateUserEmail {
                user_id: u.id,
                email: other.email,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
    }
}
