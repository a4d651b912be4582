//! Shop-related definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    Json,
};
use common::DateTime;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, shop, user},
    query, read,
};

use crate::{api, define_error, AsError, Context, Error};

/// Barbershop.
#[derive(Clone, Debug, Serialize)]
pub struct Shop {
    /// ID of this `Shop`.
    pub id: shop::Id,

    /// Name of this `Shop`.
    pub name: String,

    /// Street address of this `Shop`.
    pub address: String,

    /// City this `Shop` is located in.
    pub city: String,

    /// Contact phone number of this `Shop`.
    pub phone: Option<String>,

    /// ID of the `User` owning this `Shop`.
    pub owner_id: user::Id,

    /// Human-readable opening hours of this `Shop`.
    pub schedule: Option<String>,

    /// Date and time when this `Shop` was created.
    pub created_at: DateTime,
}

impl From<domain::Shop> for Shop {
    fn from(shop: domain::Shop) -> Self {
        let domain::Shop {
            id,
            name,
            address,
            city,
            phone,
            owner_id,
            schedule,
            created_at,
        } = shop;
        Self {
            id,
            name: name.to_string(),
            address: address.to_string(),
            city: city.to_string(),
            phone: phone.map(|p| p.to_string()),
            owner_id,
            schedule: schedule.map(|s| s.to_string()),
            created_at: created_at.coerce(),
        }
    }
}

/// Request of [`create()`].
#[derive(Clone, Debug, Deserialize)]
pub struct CreateRequest {
    /// Name of a new `Shop`.
    pub name: Option<String>,

    /// Street address of a new `Shop`.
    pub address: Option<String>,

    /// City of a new `Shop`.
    pub city: Option<String>,

    /// Contact phone number of a new `Shop`.
    pub phone: Option<String>,

    /// ID of the owning `User`, the authenticated one by default.
    pub owner_id: Option<String>,

    /// Human-readable opening hours of a new `Shop`.
    pub schedule: Option<String>,
}

/// Creates a new `Shop`.
///
/// Only administrators may create `Shop`s owned by somebody else.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `OWNER_NOT_EXISTS` - owning `User` does not exist;
/// - `NOT_OWNER` - owning `User` cannot own shops;
/// - `MISSING_FIELD`/`INVALID_FIELD` - request is malformed.
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    req: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Shop>), Error> {
    let me = ctx.current_session().await?.profile;
    let Json(req) = req.map_err(AsError::into_error)?;

    let owner_id = api::optional("owner_id", req.owner_id)?.unwrap_or(me.id);
    api::authorize(&me, [Some(owner_id)])?;

    let shop = ctx
        .service()
        .execute(command::CreateShop {
            name: api::required("name", req.name)?,
            address: api::required("address", req.address)?,
            city: api::required("city", req.city)?,
            phone: api::optional("phone", req.phone)?,
            owner_id,
            schedule: api::optional("schedule", req.schedule)?,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(shop.into())))
}

/// Returns the `Shop` with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `SHOP_NOT_EXISTS` - `Shop` with the provided ID does not exist.
#[tracing::instrument(skip_all, fields(shop.id = %id))]
pub async fn get(
    ctx: Context,
    Path(id): Path<shop::Id>,
) -> Result<Json<Shop>, Error> {
    _ = ctx.current_session().await?;

    ctx.service()
        .execute(query::shop::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|s| Json(s.into()))
        .ok_or_else(|| ShopError::NotExists.into())
}

/// Request of [`update()`].
///
/// Only present fields are changed.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateRequest {
    /// New name.
    pub name: Option<String>,

    /// New street address.
    pub address: Option<String>,

    /// New city.
    pub city: Option<String>,

    /// New contact phone number, or an empty string to remove it.
    pub phone: Option<String>,

    /// New opening hours, or an empty string to remove them.
    pub schedule: Option<String>,

    /// ID of the `User` to hand the `Shop` over to.
    pub owner_id: Option<String>,
}

/// Updates the `Shop` with the provided ID.
///
/// Only its owner or an administrator may do that.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `SHOP_NOT_EXISTS` - `Shop` with the provided ID does not exist;
/// - `OWNER_NOT_EXISTS` - new owning `User` does not exist;
/// - `NOT_OWNER` - new owning `User` cannot own shops;
/// - `INVALID_FIELD` - request is malformed.
#[tracing::instrument(skip_all, fields(shop.id = %id))]
pub async fn update(
    ctx: Context,
    Path(id): Path<shop::Id>,
    req: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Shop>, Error> {
    let me = ctx.current_session().await?.profile;
    let owner = owner_of(&ctx, id)
        .await?
        .ok_or_else(|| Error::from(ShopError::NotExists))?;
    api::authorize(&me, [Some(owner)])?;
    let Json(req) = req.map_err(AsError::into_error)?;

    let shop = ctx
        .service()
        .execute(command::UpdateShop {
            shop_id: id,
            name: api::optional("name", req.name)?,
            address: api::optional("address", req.address)?,
            city: api::optional("city", req.city)?,
            phone: api::removable("phone", req.phone)?,
            schedule: api::removable("schedule", req.schedule)?,
            owner_id: api::optional("owner_id", req.owner_id)?,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(shop.into()))
}

/// Deletes the `Shop` with the provided ID, unassigning its barbers and
/// removing its services.
///
/// Only its owner or an administrator may do that.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `SHOP_NOT_EXISTS` - `Shop` with the provided ID does not exist;
/// - `SHOP_HAS_APPOINTMENTS` - `Shop` has appointments.
#[tracing::instrument(skip_all, fields(shop.id = %id))]
pub async fn delete(
    ctx: Context,
    Path(id): Path<shop::Id>,
) -> Result<StatusCode, Error> {
    let me = ctx.current_session().await?.profile;
    let owner = owner_of(&ctx, id)
        .await?
        .ok_or_else(|| Error::from(ShopError::NotExists))?;
    api::authorize(&me, [Some(owner)])?;

    ctx.service()
        .execute(command::DeleteShop { shop_id: id })
        .await
        .map_err(AsError::into_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the ID of the `User` owning the `Shop` with the provided ID, if
/// the `Shop` exists.
///
/// # Errors
///
/// If failed to query the `Shop`.
pub async fn owner_of(
    ctx: &Context,
    id: shop::Id,
) -> Result<Option<user::Id>, Error> {
    Ok(ctx
        .service()
        .execute(query::shop::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|s| s.owner_id))
}

/// Filter of [`list()`].
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ListFilter {
    /// ID of the `User` owning the listed `Shop`s.
    pub owner_id: Option<user::Id>,
}

/// Lists `Shop`s ordered by name.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    filter: Result<Query<ListFilter>, QueryRejection>,
) -> Result<Json<Vec<Shop>>, Error> {
    _ = ctx.current_session().await?;
    let Query(ListFilter { owner_id }) = filter.map_err(AsError::into_error)?;

    let shops = ctx
        .service()
        .execute(query::shops::List::by(read::shop::list::Filter { owner_id }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(shops.into_iter().map(Into::into).collect()))
}

define_error! {
    enum ShopError {
        #[code = "NOT_OWNER"]
        #[status = BAD_REQUEST]
        #[message = "`User` cannot own shops"]
        NotOwner,

        #[code = "SHOP_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Shop` with the provided ID does not exist"]
        NotExists,

        #[code = "OWNER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Owning `User` does not exist"]
        OwnerNotExists,

        #[code = "SHOP_HAS_APPOINTMENTS"]
        #[status = BAD_REQUEST]
        #[message = "`Shop` with appointments cannot be deleted"]
        HasAppointments,
    }
}

impl AsError for command::create_shop::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::NotOwner(_) => ShopError::NotOwner.into(),
            Self::OwnerNotExists(_) => ShopError::OwnerNotExists.into(),
        })
    }
}

impl AsError for command::update_shop::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::NotOwner(_) => ShopError::NotOwner.into(),
            Self::OwnerNotExists(_) => ShopError::OwnerNotExists.into(),
            Self::ShopNotExists(_) => ShopError::NotExists.into(),
        })
    }
}

impl AsError for command::delete_shop::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::HasAppointments(_) => ShopError::HasAppointments.into(),
            Self::ShopNotExists(_) => ShopError::NotExists.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use service::{command::delete_shop, domain::shop};

    use crate::AsError as _;

    #[test]
    fn maps_booked_shop_deletion_to_bad_request() {
        let err = delete_shop::ExecutionError::HasAppointments(shop::Id::new())
            .into_error();

        assert_eq!(err.code, "SHOP_HAS_APPOINTMENTS");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }
}
