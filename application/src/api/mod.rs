//! REST API definitions.

pub mod appointment;
pub mod auth;
pub mod shop;
pub mod treatment;
pub mod user;

use std::{fmt, str::FromStr};

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use derive_more::{Display, Error as StdError};
use serde::Serialize;
use service::{domain, read};
use tracing as log;

use crate::{define_error, AsError, Error};

/// Creates a [`Router`] serving the whole REST API.
///
/// [`Service`] must be provided as an [`Extension`] layer.
///
/// [`Extension`]: axum::Extension
/// [`Service`]: crate::Service
pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify", get(auth::verify))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/users", get(user::list))
        .route(
            "/api/users/:id",
            get(user::get).put(user::update).delete(user::delete),
        )
        .route("/api/users/:id/shop", put(user::assign_shop))
        .route("/api/shops", get(shop::list).post(shop::create))
        .route(
            "/api/shops/:id",
            get(shop::get).put(shop::update).delete(shop::delete),
        )
        .route("/api/services", get(treatment::list).post(treatment::create))
        .route(
            "/api/services/:id",
            get(treatment::get)
                .put(treatment::update)
                .delete(treatment::delete),
        )
        .route(
            "/api/appointments",
            get(appointment::list).post(appointment::create),
        )
        .route(
            "/api/appointments/:id",
            get(appointment::get).put(appointment::update),
        )
        .route("/api/appointments/:id/cancel", put(appointment::cancel))
        .route(
            "/api/appointments/client/:id",
            get(appointment::list_by_client).delete(appointment::purge),
        )
}

/// Status of the server.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Health {
    /// Always `ok` while the server responds.
    pub status: &'static str,
}

/// Reports that the server is alive.
#[expect(clippy::unused_async, reason = "`async` is required by `axum`")]
async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

define_error! {
    enum PrivilegeError {
        #[code = "FORBIDDEN"]
        #[status = FORBIDDEN]
        #[message = "Not enough privileges to perform the operation"]
        Forbidden,
    }
}

/// Lets the `initiator` through if they're an administrator or one of the
/// `allowed` [`User`]s.
///
/// # Errors
///
/// With [`PrivilegeError::Forbidden`] otherwise.
///
/// [`User`]: service::domain::User
pub fn authorize(
    initiator: &read::user::Profile,
    allowed: impl IntoIterator<Item = Option<domain::user::Id>>,
) -> Result<(), Error> {
    if initiator.role == domain::user::Role::Admin
        || allowed.into_iter().flatten().any(|id| id == initiator.id)
    {
        return Ok(());
    }
    log::debug!(user.id = %initiator.id, "forbidden");
    Err(PrivilegeError::Forbidden.into())
}

/// Error of a request field.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum FieldError {
    /// Required field is absent.
    #[display("`{_0}` field is required")]
    Missing(#[error(not(source))] &'static str),

    /// Field value is malformed.
    #[display("`{_0}` field is invalid")]
    Invalid(#[error(not(source))] &'static str),
}

impl AsError for FieldError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Missing(_) => Error::bad_request("MISSING_FIELD", self),
            Self::Invalid(_) => Error::bad_request("INVALID_FIELD", self),
        })
    }
}

/// Parses the required `value` of the request field with the provided
/// `name`.
///
/// # Errors
///
/// If the `value` is absent or cannot be parsed.
pub fn required<T: FromStr>(
    name: &'static str,
    value: Option<impl AsRef<str>>,
) -> Result<T, Error> {
    optional(name, value)?
        .ok_or_else(|| FieldError::Missing(name).into_error())
}

/// Parses the optional `value` of the request field with the provided
/// `name`.
///
/// # Errors
///
/// If the `value` is present but cannot be parsed.
pub fn optional<T: FromStr>(
    name: &'static str,
    value: Option<impl AsRef<str>>,
) -> Result<Option<T>, Error> {
    value
        .map(|v| v.as_ref().parse())
        .transpose()
        .map_err(|_| FieldError::Invalid(name).into_error())
}

/// Checks the parsed `value` of the request field with the provided `name`.
///
/// # Errors
///
/// If the `value` is [`None`].
pub fn valid<T>(name: &'static str, value: Option<T>) -> Result<T, Error> {
    value.ok_or_else(|| FieldError::Invalid(name).into_error())
}

/// Formats the provided `values` as [`String`]s.
fn strings<T: fmt::Display>(values: &[T]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

/// Parses the optional `value` of a removable request field with the
/// provided `name`.
///
/// An empty `value` means removal, so `Some(None)` is returned for it.
///
/// # Errors
///
/// If the `value` is neither empty nor can be parsed.
pub fn removable<T: FromStr>(
    name: &'static str,
    value: Option<impl AsRef<str>>,
) -> Result<Option<Option<T>>, Error> {
    value
        .map(|v| {
            let v = v.as_ref();
            (!v.is_empty()).then_some(v).map(str::parse).transpose()
        })
        .transpose()
        .map_err(|_| FieldError::Invalid(name).into_error())
}

#[cfg(test)]
pub(crate) fn profile(role: domain::user::Role) -> read::user::Profile {
    let id = domain::user::Id::new();
    read::user::Profile {
        id,
        name: domain::user::Name::new("Jane Doe").unwrap(),
        email: domain::user::Email::new(format!("{id}@example.com")).unwrap(),
        phone: None,
        role,
        shop_id: None,
        specialties: vec![],
    }
}

#[cfg(test)]
mod tests {
    use common::Date;
    use service::domain::{appointment, user};

    use super::{authorize, optional, profile, removable, required};

    #[test]
    fn reports_missing_and_invalid_fields() {
        let missing = required::<Date>("date", None::<&str>).unwrap_err();
        let invalid =
            required::<Date>("date", Some("01/03/2025")).unwrap_err();

        assert_eq!(missing.code, "MISSING_FIELD");
        assert_eq!(missing.message, "`date` field is required");
        assert_eq!(invalid.code, "INVALID_FIELD");
        assert_eq!(invalid.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parses_present_fields() {
        let status =
            optional::<appointment::Status>("status", Some("confirmed"));
        let absent =
            optional::<appointment::Status>("status", None::<String>);

        assert_eq!(status.unwrap(), Some(appointment::Status::Confirmed));
        assert_eq!(absent.unwrap(), None);
        assert!(
            optional::<appointment::Status>("status", Some("done")).is_err(),
        );
    }

    #[test]
    fn treats_empty_removable_field_as_removal() {
        let removed = removable::<Date>("date", Some("")).unwrap();
        let set = removable::<Date>("date", Some("2025-03-01")).unwrap();
        let kept = removable::<Date>("date", None::<&str>).unwrap();

        assert_eq!(removed, Some(None));
        assert!(matches!(set, Some(Some(_))));
        assert_eq!(kept, None);
        assert!(removable::<Date>("date", Some("soon")).is_err());
    }

    #[test]
    fn lets_allowed_users_through() {
        let me = profile(user::Role::Client);

        assert!(authorize(&me, [Some(me.id)]).is_ok());
        assert!(
            authorize(&me, [None, Some(user::Id::new()), Some(me.id)]).is_ok(),
        );
    }

    #[test]
    fn forbids_others() {
        let me = profile(user::Role::Owner);

        let err = authorize(&me, [None, Some(user::Id::new())]).unwrap_err();

        assert_eq!(err.code, "FORBIDDEN");
        assert_eq!(err.status_code, http::StatusCode::FORBIDDEN);
        assert!(authorize(&me, []).is_err());
    }

    #[test]
    fn lets_admins_through() {
        let me = profile(user::Role::Admin);

        assert!(authorize(&me, []).is_ok());
        assert!(authorize(&me, [Some(user::Id::new())]).is_ok());
    }
}
