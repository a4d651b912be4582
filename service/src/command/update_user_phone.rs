//! [`Command`] for setting or removing the [`user::Phone`] of a [`User`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for setting or removing the [`user::Phone`] of a [`User`].
#[derive(Clone, Debug)]
pub struct UpdateUserPhone {
    /// ID of the [`User`] whose [`user::Phone`] should be updated.
    pub user_id: user::Id,

    /// New [`user::Phone`] of the [`User`].
    ///
    /// [`None`] removes the current one.
    pub phone: Option<user::Phone>,
}

impl<Db> Command<UpdateUserPhone> for Service<Db>
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
        cmd: UpdateUserPhone,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserPhone { user_id, phone } = cmd;

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
        if user.phone == phone {
            return Ok(user);
        }

        user.phone = phone;
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUserPhone`] [`Command`] execution.
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
    use super::UpdateUserPhone;
    use crate::{
        command::Command as _,
        domain::user,
        infra::database::Memory,
        test_support::{service, user},
    };

    #[tokio::test]
    async fn sets_and_removes_phone() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;
        let phone = user::Phone::new("+1 555-123-4567").unwrap();

        let set = svc
            .execute(UpdateUserPhone {
                user_id: u.id,
                phone: Some(phone.clone()),
            })
            .await
            .unwrap();
        let removed = svc
            .execute(UpdateUserPhone {
                user_id: u.id,
                phone: None,
            })
            .await
            .unwrap();

        assert_eq!(set.phone, Some(phone));
        assert_eq!(removed.phone, None);
    }
}
