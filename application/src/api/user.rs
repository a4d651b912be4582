//! [`User`]-related definitions.
//!
//! [`User`]: service::domain::User

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    Json,
};
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{shop, user},
    query, read,
};

use crate::{api, define_error, AsError, Context, Error};

/// Public profile of a `User`.
#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    /// ID of the `User`.
    pub id: user::Id,

    /// Full name of the `User`.
    pub name: String,

    /// Email address of the `User`.
    pub email: String,

    /// Phone number of the `User`.
    pub phone: Option<String>,

    /// Role of the `User`: `client`, `barber`, `owner` or `admin`.
    pub role: String,

    /// ID of the shop the `User` works at.
    pub shop_id: Option<shop::Id>,

    /// Specialties of the `User`.
    pub specialties: Vec<String>,
}

impl From<read::user::Profile> for Profile {
    fn from(profile: read::user::Profile) -> Self {
        let read::user::Profile {
            id,
            name,
            email,
            phone,
            role,
            shop_id,
            specialties,
        } = profile;
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(|p| p.to_string()),
            role: role.to_string(),
            shop_id,
            specialties: api::strings(&specialties),
        }
    }
}

impl From<service::domain::User> for Profile {
    fn from(user: service::domain::User) -> Self {
        read::user::Profile::from(user).into()
    }
}

/// Filter of [`list()`].
#[derive(Clone, Debug, Deserialize)]
pub struct ListFilter {
    /// Role of the listed `User`s.
    pub role: Option<String>,

    /// ID of the shop the listed `User`s work at.
    pub shop_id: Option<shop::Id>,
}

/// Lists `User`s ordered by name.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_FIELD` - `role` is unknown.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    filter: Result<Query<ListFilter>, QueryRejection>,
) -> Result<Json<Vec<Profile>>, Error> {
    _ = ctx.current_session().await?;
    let Query(filter) = filter.map_err(AsError::into_error)?;

    let users = ctx
        .service()
        .execute(query::users::List::by(read::user::list::Filter {
            role: api::optional("role", filter.role)?,
            shop_id: filter.shop_id,
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Returns the `User` with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `USER_NOT_EXISTS` - `User` with the provided ID does not exist.
#[tracing::instrument(skip_all, fields(user.id = %id))]
pub async fn get(
    ctx: Context,
    Path(id): Path<user::Id>,
) -> Result<Json<Profile>, Error> {
    _ = ctx.current_session().await?;

    profile_of(&ctx, id).await.map(|p| Json(p.into()))
}

/// Request of [`update()`].
///
/// Only present fields are changed.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateRequest {
    /// New full name.
    pub name: Option<String>,

    /// New email address.
    pub email: Option<String>,

    /// New phone number, or an empty string to remove it.
    pub phone: Option<String>,

    /// New password.
    pub password: Option<String>,

    /// Current password, required to change one's own password.
    pub old_password: Option<String>,
}

/// Updates the `User` with the provided ID.
///
/// Only the `User` themself or an administrator may do that. Administrators
/// may change passwords of other `User`s without knowing them.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `USER_NOT_EXISTS` - `User` with the provided ID does not exist;
/// - `EMAIL_OCCUPIED` - new email is used by another `User`;
/// - `WRONG_PASSWORD` - provided current password is wrong;
/// - `MISSING_FIELD`/`INVALID_FIELD` - request is malformed.
#[tracing::instrument(skip_all, fields(user.id = %id))]
pub async fn update(
    ctx: Context,
    Path(id): Path<user::Id>,
    req: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Profile>, Error> {
    let me = ctx.current_session().await?.profile;
    api::authorize(&me, [Some(id)])?;
    let Json(req) = req.map_err(AsError::into_error)?;

    let name = api::optional::<user::Name>("name", req.name)?;
    let email = api::optional::<user::Email>("email", req.email)?;
    let phone = api::removable::<user::Phone>("phone", req.phone)?;
    let password = api::optional::<user::Password>("password", req.password)?
        .map(|new| {
            let old = if me.id == id {
                Some(api::required::<user::Password>(
                    "old_password",
                    req.old_password,
                )?)
            } else {
                api::optional::<user::Password>(
                    "old_password",
                    req.old_password,
                )?
            };
            Ok::<_, Error>((new, old))
        })
        .transpose()?;

    let mut profile = profile_of(&ctx, id).await?;
    if let Some(name) = name {
        profile = ctx
            .service()
            .execute(command::UpdateUserName { user_id: id, name })
            .await
            .map_err(AsError::into_error)?
            .into();
    }
    if let Some(phone) = phone {
        profile = ctx
            .service()
            .execute(command::UpdateUserPhone { user_id: id, phone })
            .await
            .map_err(AsError::into_error)?
            .into();
    }
    if let Some(email) = email {
        profile = ctx
            .service()
            .execute(command::UpdateUserEmail { user_id: id, email })
            .await
            .map_err(AsError::into_error)?
            .into();
    }
    if let Some((new, old)) = password {
        profile = ctx
            .service()
            .execute(command::UpdateUserPassword {
                user_id: id,
                new_password: SecretBox::new(Box::new(new)),
                old_password: old.map(|p| SecretBox::new(Box::new(p))),
            })
            .await
            .map_err(AsError::into_error)?
            .into();
    }

    Ok(Json(profile.into()))
}

/// Deletes the `User` with the provided ID along with their sessions.
///
/// Only the `User` themself or an administrator may do that.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `USER_NOT_EXISTS` - `User` with the provided ID does not exist.
#[tracing::instrument(skip_all, fields(user.id = %id))]
pub async fn delete(
    ctx: Context,
    Path(id): Path<user::Id>,
) -> Result<StatusCode, Error> {
    let me = ctx.current_session().await?.profile;
    api::authorize(&me, [Some(id)])?;

    ctx.service()
        .execute(command::DeleteUser { user_id: id })
        .await
        .map_err(AsError::into_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Request of [`assign_shop()`].
#[derive(Clone, Debug, Deserialize)]
pub struct AssignShopRequest {
    /// ID of the shop to assign the barber to, or `null` to unassign.
    pub shop_id: Option<String>,
}

/// Assigns the barber `User` with the provided ID to a shop.
///
/// Allowed to the barber themself, to the owners of both the current and the
/// new shop, and to administrators.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `USER_NOT_EXISTS` - `User` with the provided ID does not exist;
/// - `NOT_BARBER` - `User` with the provided ID is not a barber;
/// - `SHOP_NOT_EXISTS` - shop with the provided ID does not exist.
#[tracing::instrument(skip_all, fields(user.id = %id))]
pub async fn assign_shop(
    ctx: Context,
    Path(id): Path<user::Id>,
    req: Result<Json<AssignShopRequest>, JsonRejection>,
) -> Result<Json<Profile>, Error> {
    let me = ctx.current_session().await?.profile;
    let Json(req) = req.map_err(AsError::into_error)?;
    let shop_id = api::optional("shop_id", req.shop_id)?;

    let current = profile_of(&ctx, id).await?.shop_id;
    let mut allowed = vec![Some(id)];
    for shop in [current, shop_id].into_iter().flatten() {
        allowed.push(api::shop::owner_of(&ctx, shop).await?);
    }
    api::authorize(&me, allowed)?;

    let user = ctx
        .service()
        .execute(command::AssignBarberToShop {
            barber_id: id,
            shop_id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(user.into()))
}

/// Returns the [`read::user::Profile`] of the `User` with the provided ID.
///
/// # Errors
///
/// If the `User` doesn't exist.
async fn profile_of(
    ctx: &Context,
    id: user::Id,
) -> Result<read::user::Profile, Error> {
    ctx.service()
        .execute(query::user::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| UserError::NotExists.into())
}

define_error! {
    enum UserError {
        #[code = "NOT_BARBER"]
        #[status = BAD_REQUEST]
        #[message = "`User` is not a barber"]
        NotBarber,

        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the provided ID does not exist"]
        NotExists,

        #[code = "WRONG_PASSWORD"]
        #[status = BAD_REQUEST]
        #[message = "Provided current password is wrong"]
        WrongPassword,
    }
}

impl AsError for command::delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
        }
    }
}

impl AsError for command::assign_barber_to_shop::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::NotBarber(_) => UserError::NotBarber.into(),
            Self::ShopNotExists(_) => api::shop::ShopError::NotExists.into(),
            Self::UserNotExists(_) => UserError::NotExists.into(),
        })
    }
}

impl AsError for command::update_user_name::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
        }
    }
}

impl AsError for command::update_user_phone::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
        }
    }
}

impl AsError for command::update_user_email::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::EmailOccupied(_) => api::auth::AuthError::EmailOccupied.into(),
            Self::UserNotExists(_) => UserError::NotExists.into(),
        })
    }
}

impl AsError for command::update_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::PasswordHashing(_) => return None,
            Self::UserNotExists(_) => UserError::NotExists.into(),
            Self::WrongPassword => UserError::WrongPassword.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use service::{
        command::{
            delete_user::ExecutionError, update_user_email,
            update_user_password,
        },
        domain::{shop, user},
        read,
    };

    use super::Profile;
    use crate::AsError as _;

    #[test]
    fn exposes_kinds_as_strings() {
        let profile = Profile::from(read::user::Profile {
            id: user::Id::new(),
            name: user::Name::new("Jane Doe").unwrap(),
            email: user::Email::new("jane@example.com").unwrap(),
            phone: None,
            role: user::Role::Barber,
            shop_id: Some(shop::Id::new()),
            specialties: vec![user::Specialty::new("fades").unwrap()],
        });

        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["role"], "barber");
        assert_eq!(json["specialties"], serde_json::json!(["fades"]));
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn maps_wrong_password_to_bad_request() {
        let err = update_user_password::ExecutionError::WrongPassword
            .into_error();

        assert_eq!(err.code, "WRONG_PASSWORD");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn maps_taken_email_to_occupied() {
        let err = update_user_email::ExecutionError::EmailOccupied(
            user::Email::new("jane@example.com").unwrap(),
        )
        .into_error();

        assert_eq!(err.code, "EMAIL_OCCUPIED");
    }

    #[test]
    fn maps_missing_user_to_not_found() {
        let err = ExecutionError::UserNotExists(user::Id::new()).into_error();

        assert_eq!(err.code, "USER_NOT_EXISTS");
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
    }
}
