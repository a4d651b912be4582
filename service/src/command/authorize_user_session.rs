//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`Session`] token.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

/// Output of [`AuthorizeUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Authorized [`Session`].
    pub session: Session,

    /// [`read::user::Profile`] of the [`User`] owning the [`Session`].
    pub profile: read::user::Profile,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
            Select<By<Option<Session>, session::Token>>,
            Ok = Option<Session>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        // Expired `Session`s are invalid even before being swept.
        let session = self
            .database()
            .execute(Select(By::<Option<Session>, _>::new(token)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|s| !s.is_expired_at(session::ExpirationDateTime::now()))
            .ok_or(E::InvalidSession)
            .map_err(tracerr::wrap!())?;

        let user = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvalidSession)
            .map_err(tracerr::wrap!())?;

        Ok(Output {
            session,
            profile: user.into(),
        })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Session`] is missing, expired or belongs to a deleted [`User`].
    #[display("Invalid or expired `Session`")]
    InvalidSession,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::operations::Insert;

    use super::{AuthorizeUserSession, ExecutionError};
    use crate::{
        command::{Command as _, CreateUserSession, DeleteUser},
        domain::user::{self, session, Session},
        infra::{database::Memory, Database as _},
        test_support::{service, user},
    };

    #[tokio::test]
    async fn authorizes_fresh_session() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Barber).await;
        let created = svc
            .execute(CreateUserSession::ByUserId(u.id))
            .await
            .unwrap();

        let out = svc
            .execute(AuthorizeUserSession {
                token: created.token.clone(),
            })
            .await
            .unwrap();

        assert_eq!(out.session.token, created.token);
        assert_eq!(out.profile.id, u.id);
        assert_eq!(out.profile.role, user::Role::Barber);
    }

    #[tokio::test]
    async fn rejects_unknown_token() {
        let svc = service(Memory::new());

        let err = svc
            .execute(AuthorizeUserSession {
                token: session::Token::generate(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidSession));
    }

    #[tokio::test]
    async fn rejects_session_created_beyond_its_lifetime() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;

        // Created 25 hours ago with a 24 hours lifetime.
        let session = Session {
            token: session::Token::generate(),
            user_id: u.id,
            expires_at: session::ExpirationDateTime::now()
                - Duration::from_secs(60 * 60),
        };
        db.execute(Insert(session.clone())).await.unwrap();

        let err = svc
            .execute(AuthorizeUserSession {
                token: session.token,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidSession));
    }

    #[tokio::test]
    async fn rejects_session_of_deleted_user() {
        let db = Memory::new();
        let svc = service(db.clone());
        let u = user(&db, user::Role::Client).await;
        let created = svc
            .execute(CreateUserSession::ByUserId(u.id))
            .await
            .unwrap();

        // Sessions are removed along with the user, but a stale row must not
        // authorize either.
        let stale = Session {
            token: session::Token::generate(),
            user_id: u.id,
            expires_at: created.expires_at,
        };
        svc.execute(DeleteUser { user_id: u.id }).await.unwrap();
        db.execute(Insert(stale.clone())).await.unwrap();

        for token in [created.token, stale.token] {
            let err = svc
                .execute(AuthorizeUserSession { token })
                .await
                .unwrap_err();
            assert!(matches!(err.as_ref(), ExecutionError::InvalidSession));
        }
    }
}
