//! [`Command`] for creating a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password, Phone, Role, Specialty};
use crate::{
    domain::{user, User},
    infra::{
        database::{self, Constraint},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Debug)]
pub struct CreateUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Phone`] of a new [`User`].
    pub phone: Option<user::Phone>,

    /// [`Role`] of a new [`User`].
    pub role: user::Role,

    /// [`Specialty`]s of a new [`User`].
    pub specialties: Vec<user::Specialty>,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
            phone,
            role,
            specialties,
        } = cmd;

        let password_hash = user::PasswordHash::new(password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let u = tx
            .execute(Select(By::<Option<User>, _>::new(email.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let user = User {
            id: user::Id::new(),
            name,
            email,
            password_hash,
            phone,
            role,
            shop_id: None,
            specialties,
            created_at: DateTime::now().coerce(),
            deleted_at: None,
        };

        tx.execute(Insert(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if matches!(
                    e.as_ref(),
                    E::Db(db) if db.violated() == Some(Constraint::UserEmail),
                ) {
                    tracerr::new!(E::EmailOccupied(user.email.clone()))
                } else {
                    e
                }
            })?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),

    /// Failed to hash the [`user::Password`].
    #[display("Failed to hash `Password`: {_0}")]
    #[from]
    PasswordHashing(argon2::password_hash::Error),
}

#[cfg(test)]
mod tests {
    use secrecy::SecretBox;

    use super::{CreateUser, ExecutionError};
    use crate::{
        command::Command as _,
        domain::user,
        infra::database::Memory,
        test_support::service,
    };

    fn cmd(email: &str) -> CreateUser {
        CreateUser {
            name: user::Name::new("Jane Doe").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new("secret-password").unwrap(),
            )),
            phone: None,
            role: user::Role::Client,
            specialties: vec![],
        }
    }

    #[tokio::test]
    async fn creates_user_with_hashed_password() {
        let svc = service(Memory::new());

        let user = svc.execute(cmd("jane@example.com")).await.unwrap();

        assert_eq!(user.email.to_string(), "jane@example.com");
        assert!(user
            .password_hash
            .verify(&user::Password::new("secret-password").unwrap())
            .unwrap());
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let svc = service(Memory::new());
        drop(svc.execute(cmd("jane@example.com")).await.unwrap());

        let err = svc.execute(cmd("JANE@example.com")).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
    }
}
