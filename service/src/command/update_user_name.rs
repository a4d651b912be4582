//! [`Command`] for renaming a [`User`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Name;
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for renaming a [`User`].
#[derive(Clone, Debug)]
pub struct UpdateUserName {
    /// ID of the [`User`] to rename.
    pub user_id: user::Id,

    /// New [`Name`] of the [`User`].
    pub name: user::Name,
}

impl<Db> Command<UpdateUserName> for Service<Db>
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
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateUserName,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserName { user_id, name } = cmd;

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
        if user.name == name {
            return Ok(user);
        }

        user.name = name;
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUserName`] [`Command`] execution.
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

    use super::{ExecutionError, UpdateUserName};
    use crate::{
        command::{Command as _, DeleteUser},
        domain::{user, User},
        infra::{database::Memory, Database as _},
        test_support::{service, user},
    };

    #[tokio::test]
    async fn renames_user() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Barber).await;

        let renamed = svc
            .execute(UpdateUserName {
                user_id: u.id,
                name: user::Name::new("Sweeney Todd").unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(renamed.name.to_string(), "Sweeney Todd");
        let stored = db
            .execute(Select(By::<Option<User>, _>::new(u.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, renamed.name);
    }

    #[tokio::test]
    async fn fails_on_deleted_user() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;
        svc.execute(DeleteUser { user_id: u.id }).await.unwrap();

        let err = svc
            .execute(UpdateUserName {
                user_id: u.id,
                name: user::Name::new("Ghost").unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(id) if *id == u.id));
    }
}
