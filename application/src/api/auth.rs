//! Authentication endpoints.

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use common::DateTime;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::user::{self, session},
};

use crate::{api, define_error, AsError, Context, Error, Session};

/// Authenticated `User` along with their session.
#[derive(Clone, Debug, Serialize)]
pub struct SessionResponse {
    /// Profile of the authenticated `User`.
    pub user: api::user::Profile,

    /// Token to pass in the `Authorization: Bearer` header.
    pub token: String,

    /// Expiration date and time of the session.
    pub expires_at: DateTime,
}

impl From<command::create_user_session::Output> for SessionResponse {
    fn from(output: command::create_user_session::Output) -> Self {
        let command::create_user_session::Output {
            token,
            user,
            expires_at,
        } = output;
        Self {
            user: user.into(),
            token: token.to_string(),
            expires_at: expires_at.coerce(),
        }
    }
}

/// Request of [`register()`].
#[derive(Clone, Debug, Deserialize)]
pub struct RegisterRequest {
    /// Full name of a new `User`.
    pub name: Option<String>,

    /// Email address of a new `User`.
    pub email: Option<String>,

    /// Password of a new `User`.
    pub password: Option<String>,

    /// Phone number of a new `User`.
    pub phone: Option<String>,

    /// Role of a new `User`, `client` by default.
    pub role: Option<String>,

    /// Specialties of a new barber `User`.
    #[serde(default)]
    pub specialties: Vec<String>,
}

/// Registers a new `User` and creates a session for them.
///
/// # Errors
///
/// Possible error codes:
/// - `EMAIL_OCCUPIED` - provided email is used by another `User`;
/// - `MISSING_FIELD`/`INVALID_FIELD` - request is malformed.
#[tracing::instrument(skip_all)]
pub async fn register(
    ctx: Context,
    req: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), Error> {
    let Json(req) = req.map_err(AsError::into_error)?;
    let password: user::Password = api::required("password", req.password)?;

    let user = ctx
        .service()
        .execute(command::CreateUser {
            name: api::required("name", req.name)?,
            email: api::required("email", req.email)?,
            password: secrecy::SecretBox::init_with(move || password),
            phone: api::optional("phone", req.phone)?,
            role: api::optional("role", req.role)?.unwrap_or(user::Role::Client),
            specialties: req
                .specialties
                .iter()
                .map(|s| api::required("specialties", Some(s)))
                .collect::<Result<_, _>>()?,
        })
        .await
        .map_err(AsError::into_error)?;

    let output = ctx
        .service()
        .execute(command::CreateUserSession::ByUserId(user.id))
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(output.into())))
}

/// Request of [`login()`].
#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address of the `User`.
    pub email: Option<String>,

    /// Password of the `User`.
    pub password: Option<String>,
}

/// Creates a new session by the `User` credentials, replacing any previous
/// one.
///
/// # Errors
///
/// Possible error codes:
/// - `WRONG_CREDENTIALS` - provided credentials does not match any `User`.
#[tracing::instrument(skip_all)]
pub async fn login(
    ctx: Context,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, Error> {
    let Json(req) = req.map_err(AsError::into_error)?;
    // Malformed credentials cannot match any `User`.
    let (Ok(email), Ok(password)) = (
        api::required::<user::Email>("email", req.email),
        api::required::<user::Password>("password", req.password),
    ) else {
        return Err(AuthError::WrongCredentials.into());
    };

    let output = ctx
        .service()
        .execute(command::CreateUserSession::ByCredentials {
            email,
            password: secrecy::SecretBox::init_with(move || password),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(output.into()))
}

/// Response of [`verify()`].
#[derive(Clone, Debug, Serialize)]
pub struct VerifyResponse {
    /// Profile of the authenticated `User`.
    pub user: api::user::Profile,

    /// Expiration date and time of the session.
    pub expires_at: DateTime,
}

/// Verifies the provided session, prolonging it.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - no session token provided;
/// - `INVALID_SESSION` - session token is invalid or expired.
#[tracing::instrument(skip_all)]
pub async fn verify(ctx: Context) -> Result<Json<VerifyResponse>, Error> {
    let Session {
        profile,
        expires_at,
        ..
    } = ctx.current_session().await?;

    Ok(Json(VerifyResponse {
        user: profile.into(),
        expires_at,
    }))
}

/// Response of [`logout()`].
#[derive(Clone, Copy, Debug, Serialize)]
pub struct LogoutResponse {
    /// Human-readable confirmation.
    pub message: &'static str,
}

/// Deletes the provided session.
///
/// Unknown sessions are ignored.
///
/// # Errors
///
/// Possible error codes:
/// - `TOKEN_REQUIRED` - no session token provided.
#[tracing::instrument(skip_all)]
pub async fn logout(ctx: Context) -> Result<Json<LogoutResponse>, Error> {
    let token: session::Token = ctx
        .bearer_token()
        .await?
        .ok_or_else(|| Error::from(AuthError::TokenRequired))?;

    ctx.service()
        .execute(command::DeleteUserSession { token })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(LogoutResponse {
        message: "Logged out",
    }))
}

define_error! {
    enum AuthError {
        #[code = "EMAIL_OCCUPIED"]
        #[status = BAD_REQUEST]
        #[message = "Provided email is used by another `User`"]
        EmailOccupied,

        #[code = "TOKEN_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "Session token is required"]
        TokenRequired,

        #[code = "WRONG_CREDENTIALS"]
        #[status = UNAUTHORIZED]
        #[message = "Provided credentials does not match any `User`"]
        WrongCredentials,
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(AuthError::EmailOccupied.into()),
            Self::PasswordHashing(_) => None,
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PasswordHashing(_) => None,
            Self::UserNotExists(_) | Self::WrongCredentials => {
                Some(AuthError::WrongCredentials.into())
            }
        }
    }
}

impl AsError for command::delete_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use service::command::create_user_session::ExecutionError;

    use crate::AsError as _;

    #[test]
    fn hides_credentials_mismatch_reason() {
        let err = ExecutionError::WrongCredentials.into_error();

        assert_eq!(err.code, "WRONG_CREDENTIALS");
        assert_eq!(err.status_code, http::StatusCode::UNAUTHORIZED);
    }
}
