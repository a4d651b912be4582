//! [`Command`] for creating a [`Session`].

use common::operations::{
    By, Commit, Delete, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{session::Token, Email, Password};
use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`].
///
/// Any other [`Session`] of the [`User`] is deleted.
#[derive(Debug, From)]
pub enum CreateUserSession {
    /// Create a new [`Session`] by [`User`] credentials.
    ByCredentials {
        /// [`Email`] of a [`User`].
        email: user::Email,

        /// [`Password`] of a [`User`].
        password: SecretBox<user::Password>,
    },

    /// Create a new [`Session`] by [`User`] ID.
    ByUserId(user::Id),
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Token`] of the created [`Session`].
    pub token: session::Token,

    /// [`User`] whose [`Session`] has been created.
    pub user: User,

    /// [`DateTime`] when the [`Session`] expires.
    ///
    /// [`DateTime`]: common::DateTime
    pub expires_at: session::ExpirationDateTime,
}

impl<Db> Command<CreateUserSession> for Service<Db>
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
        > + Database<
            Delete<By<Session, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Insert<Session>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use CreateUserSession as Cmd;
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let user = match cmd {
            Cmd::ByCredentials { email, password } => {
                let user = tx
                    .execute(Select(By::<Option<User>, _>::new(email)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::WrongCredentials)
                    .map_err(tracerr::wrap!())?;

                let matches = user
                    .password_hash
                    .verify(password.expose_secret())
                    .map_err(tracerr::from_and_wrap!(=> E))?;
                if !matches {
                    return Err(tracerr::new!(E::WrongCredentials));
                }

                user
            }
            Cmd::ByUserId(user_id) => tx
                .execute(Select(By::<Option<User>, _>::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::UserNotExists(user_id))
                .map_err(tracerr::wrap!())?,
        };

        // Avoid concurrent `Session`s creation for the same `User`.
        tx.execute(Lock(By::<User, _>::new(user.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Delete(By::<Session, _>::new(user.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let session = Session {
            token: session::Token::generate(),
            user_id: user.id,
            expires_at: session::ExpirationDateTime::now()
                + self.config().session_lifetime,
        };
        tx.execute(Insert(session.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(Output {
            token: session.token,
            user,
            expires_at: session.expires_at,
        })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Stored [`user::PasswordHash`] cannot be verified.
    #[display("Failed to verify `PasswordHash`: {_0}")]
    #[from]
    PasswordHashing(argon2::password_hash::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`CreateUserSession::ByCredentials`] contains wrong credentials.
    #[display("Wrong `User` credentials")]
    WrongCredentials,
}

#[cfg(test)]
mod tests {
    use common::operations::{By, Select};
    use secrecy::SecretBox;

    use super::{CreateUserSession, ExecutionError};
    use crate::{
        command::Command as _,
        domain::user::{self, Session},
        infra::{database::Memory, Database as _},
        test_support::{service, user, PASSWORD},
    };

    fn credentials(email: &user::Email, password: &str) -> CreateUserSession {
        CreateUserSession::ByCredentials {
            email: email.clone(),
            password: SecretBox::new(Box::new(
                user::Password::new(password).unwrap(),
            )),
        }
    }

    #[tokio::test]
    async fn creates_session_by_credentials() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;

        let out = svc.execute(credentials(&u.email, PASSWORD)).await.unwrap();

        assert_eq!(out.user.id, u.id);
        assert_eq!(out.token.as_ref().len(), 64);
        let stored = db
            .execute(Select(By::<Option<Session>, _>::new(out.token)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, u.id);
        assert_eq!(stored.expires_at, out.expires_at);
    }

    #[tokio::test]
    async fn hides_which_credential_is_wrong() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;

        let wrong_password = svc
            .execute(credentials(&u.email, "wrong-password"))
            .await
            .unwrap_err();
        let unknown_email = svc
            .execute(credentials(
                &user::Email::new("nobody@example.com").unwrap(),
                PASSWORD,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            wrong_password.as_ref(),
            ExecutionError::WrongCredentials,
        ));
        assert!(matches!(
            unknown_email.as_ref(),
            ExecutionError::WrongCredentials,
        ));
    }

    #[tokio::test]
    async fn replaces_previous_sessions() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;

        let first = svc
            .execute(CreateUserSession::ByUserId(u.id))
            .await
            .unwrap();
        let second = svc
            .execute(CreateUserSession::ByUserId(u.id))
            .await
            .unwrap();

        assert_ne!(first.token, second.token);
        let select = |token| {
            db.execute(Select(By::<Option<Session>, _>::new(token)))
        };
        assert!(select(first.token).await.unwrap().is_none());
        assert!(select(second.token).await.unwrap().is_some());
    }
}
