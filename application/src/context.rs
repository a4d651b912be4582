//! [`Context`]-related definitions.

use std::{
    fmt,
    future::{self, Future},
};

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use common::DateTime;
use service::{
    command::{self, Command as _},
    domain::user::{self, session},
    read,
};
use tokio::{sync::OnceCell, task};
use tracing as log;

use crate::{define_error, AsError, Error, Service};

/// Request context.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Parts of the HTTP request.
    parts: http::request::Parts,

    /// Current [`Session`].
    current_session: OnceCell<Session>,

    /// Last authentication [`Error`].
    auth_error: OnceCell<Error>,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Sets the current [`Session`] for this [`Context`].
    pub async fn set_current_session(&self, session: Session) {
        _ = self
            .current_session
            .get_or_init(|| future::ready(session))
            .await;
    }

    /// Returns the current [`Session`] for this [`Context`].
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request is not authorized;
    /// - the provided authentication token is invalid or expired.
    pub async fn current_session(&self) -> Result<Session, Error> {
        self.current_session
            .get_or_try_init(|| async {
                match self
                    .auth_error
                    .get_or_try_init(|| async {
                        match self.do_authentication().await {
                            Ok(u) => Err(u),
                            Err(e) => Ok(e),
                        }
                    })
                    .await
                {
                    Ok(e) => Err(e),
                    Err(u) => Ok(u),
                }
            })
            .await
            .cloned()
            .map_err(Clone::clone)
    }

    /// Returns the [`session::Token`] provided in the `Authorization` header,
    /// without checking it.
    ///
    /// # Errors
    ///
    /// Errors if the `Authorization` header is malformed.
    pub async fn bearer_token(&self) -> Result<Option<session::Token>, Error> {
        match self
            .parts
            .clone()
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
        {
            Ok(TypedHeader(Authorization(bearer))) => {
                #[expect(unsafe_code, reason = "specified in correct header")]
                let token = unsafe {
                    session::Token::new_unchecked(bearer.token().to_owned())
                };
                Ok(Some(token))
            }
            Err(e) if e.is_missing() => Ok(None),
            Err(e) => Err(e.into_error()),
        }
    }

    /// Performs the [`Session`] authentication.
    ///
    /// The authenticated [`Session`] is renewed in background, so the
    /// returned expiration is the one the renewal is going to set.
    ///
    /// # Errors
    ///
    /// Errors if the provided authentication token is missing, invalid or
    /// expired.
    async fn do_authentication(&self) -> Result<Session, Error> {
        let token = self
            .bearer_token()
            .await?
            .ok_or_else(|| Error::from(AuthError::AuthorizationRequired))?;

        let command::authorize_user_session::Output {
            mut session,
            profile,
        } = self
            .service
            .execute(command::AuthorizeUserSession {
                token: token.clone(),
            })
            .await
            .map_err(AsError::into_error)?;

        let service = self.service.clone();
        let renewed = token.clone();
        drop(spawn_renewal(async move {
            service
                .execute(command::RenewUserSession { token: renewed })
                .await
        }));
        session.prolong(self.service.config().session_lifetime);

        Ok(Session {
            user_id: session.user_id,
            token,
            expires_at: session.expires_at.coerce(),
            profile,
        })
    }
}

/// Spawns the provided [`Session`] `renewal`, logging its failure.
fn spawn_renewal<T, E>(
    renewal: impl Future<Output = Result<T, E>> + Send + 'static,
) -> task::JoinHandle<()>
where
    E: fmt::Display,
{
    task::spawn(async move {
        if let Err(e) = renewal.await {
            log::warn!("failed to renew `Session`: {e}");
        }
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        Ok(Self {
            service,
            parts: parts.clone(),
            current_session: OnceCell::new(),
            auth_error: OnceCell::new(),
        })
    }
}

/// User session.
#[derive(Clone, Debug)]
pub struct Session {
    /// ID of the [`User`] associated with this [`Session`].
    ///
    /// [`User`]: service::domain::User
    pub user_id: user::Id,

    /// Authentication token.
    pub token: session::Token,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: DateTime,

    /// [`read::user::Profile`] of the authenticated [`User`].
    ///
    /// [`User`]: service::domain::User
    pub profile: read::user::Profile,
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidSession => Some(AuthError::InvalidSession.into()),
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_SESSION"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid or expired session"]
        InvalidSession,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretBox;
    use service::{
        command::{
            AuthorizeUserSession, Command as _, CreateUser, CreateUserSession,
            RenewUserSession,
        },
        domain::user::{self, session},
        infra::database::Memory,
        task, Config,
    };

    use super::spawn_renewal;

    fn service(db: Memory, lifetime: Duration) -> service::Service<Memory> {
        service::Service::without_tasks(
            Config {
                session_lifetime: lifetime,
                clean_expired_sessions: task::clean_expired_sessions::Config {
                    interval: Duration::from_secs(60),
                },
            },
            db,
        )
    }

    #[tokio::test]
    async fn renews_session_in_background() {
        let db = Memory::new();
        let short = service(db.clone(), Duration::from_secs(60 * 60));
        let long = service(db, Duration::from_secs(48 * 60 * 60));
        let user = short
            .execute(CreateUser {
                name: user::Name::new("Jane Doe").unwrap(),
                email: user::Email::new("jane@example.com").unwrap(),
                password: SecretBox::new(Box::new(
                    user::Password::new("secret-password").unwrap(),
                )),
                phone: None,
                role: user::Role::Client,
                specialties: vec![],
            })
            .await
            .unwrap();
        let created = short
            .execute(CreateUserSession::ByUserId(user.id))
            .await
            .unwrap();

        let token = created.token.clone();
        spawn_renewal(async move {
            long.execute(RenewUserSession { token }).await
        })
        .await
        .unwrap();

        let authorized = short
            .execute(AuthorizeUserSession {
                token: created.token,
            })
            .await
            .unwrap();
        assert!(
            authorized.session.expires_at
                > session::ExpirationDateTime::now()
                    + Duration::from_secs(24 * 60 * 60),
        );
    }

    #[tokio::test]
    async fn swallows_renewal_failure() {
        let svc = service(Memory::new(), Duration::from_secs(60));
        #[expect(unsafe_code, reason = "token is never stored")]
        let token = unsafe { session::Token::new_unchecked("unknown".into()) };

        let finished = spawn_renewal(async move {
            svc.execute(RenewUserSession { token }).await
        })
        .await;

        assert!(finished.is_ok());
    }
}
