//! Treatment-related definitions.
//!
//! Treatments are exposed as `services` of a barbershop.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    Json,
};
use common::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, appointment, shop, treatment, user},
    query, read,
};

use crate::{api, define_error, AsError, Context, Error};

/// Service offered by a shop or by a single barber.
#[derive(Clone, Debug, Serialize)]
pub struct Treatment {
    /// ID of this `Treatment`.
    pub id: treatment::Id,

    /// Name of this `Treatment`.
    pub name: String,

    /// Description of this `Treatment`.
    pub description: Option<String>,

    /// Price of this `Treatment`.
    pub price: Decimal,

    /// Duration of this `Treatment` in minutes.
    pub duration: Option<u16>,

    /// ID of the shop offering this `Treatment`.
    pub shop_id: Option<shop::Id>,

    /// ID of the barber offering this `Treatment`.
    pub barber_id: Option<user::Id>,

    /// Date and time when this `Treatment` was created.
    pub created_at: DateTime,
}

impl From<domain::Treatment> for Treatment {
    fn from(treatment: domain::Treatment) -> Self {
        let domain::Treatment {
            id,
            name,
            description,
            price,
            duration,
            owner,
            created_at,
        } = treatment;
        Self {
            id,
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            price: price.into(),
            duration: duration.map(appointment::Duration::minutes),
            shop_id: owner.shop_id(),
            barber_id: owner.barber_id(),
            created_at: created_at.coerce(),
        }
    }
}

/// Request of [`create()`].
#[derive(Clone, Debug, Deserialize)]
pub struct CreateRequest {
    /// Name of a new `Treatment`.
    pub name: Option<String>,

    /// Description of a new `Treatment`.
    pub description: Option<String>,

    /// Price of a new `Treatment`.
    pub price: Option<Decimal>,

    /// Duration of a new `Treatment` in minutes.
    pub duration: Option<u16>,

    /// ID of the shop offering a new `Treatment`.
    pub shop_id: Option<String>,

    /// ID of the barber offering a new `Treatment`.
    pub barber_id: Option<String>,
}

/// Creates a new `Treatment` offered either by a shop or by a barber.
///
/// Only the owner of the shop, the barber themself or an administrator may do
/// that.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `AMBIGUOUS_OWNER` - not exactly one of `shop_id` and `barber_id` is
///                       provided;
/// - `SHOP_NOT_EXISTS` - shop with the provided ID does not exist;
/// - `USER_NOT_EXISTS` - barber with the provided ID does not exist;
/// - `NOT_BARBER` - `User` with the provided ID is not a barber;
/// - `MISSING_FIELD`/`INVALID_FIELD` - request is malformed.
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    req: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Treatment>), Error> {
    let me = ctx.current_session().await?.profile;
    let Json(req) = req.map_err(AsError::into_error)?;

    let owner = match (
        api::optional("shop_id", req.shop_id)?,
        api::optional("barber_id", req.barber_id)?,
    ) {
        (Some(shop_id), None) => treatment::Owner::Shop(shop_id),
        (None, Some(barber_id)) => treatment::Owner::Barber(barber_id),
        (Some(_), Some(_)) | (None, None) => {
            return Err(TreatmentError::AmbiguousOwner.into());
        }
    };
    api::authorize(&me, [Some(manager_of(&ctx, owner).await?)])?;

    let price = req
        .price
        .ok_or_else(|| api::FieldError::Missing("price").into_error())?;
    let price = api::valid("price", treatment::Price::new(price))?;
    let duration = req
        .duration
        .map(|d| api::valid("duration", appointment::Duration::from_minutes(d)))
        .transpose()?;

    let treatment = ctx
        .service()
        .execute(command::CreateTreatment {
            name: api::required("name", req.name)?,
            description: api::optional("description", req.description)?,
            price,
            duration,
            owner,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(treatment.into())))
}

/// Returns the `Treatment` with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `TREATMENT_NOT_EXISTS` - `Treatment` with the provided ID does not
///                            exist.
#[tracing::instrument(skip_all, fields(treatment.id = %id))]
pub async fn get(
    ctx: Context,
    Path(id): Path<treatment::Id>,
) -> Result<Json<Treatment>, Error> {
    _ = ctx.current_session().await?;

    ctx.service()
        .execute(query::treatment::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|t| Json(t.into()))
        .ok_or_else(|| TreatmentError::NotExists.into())
}

/// Request of [`update()`].
///
/// Only present fields are changed.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateRequest {
    /// New name.
    pub name: Option<String>,

    /// New description, or an empty string to remove it.
    pub description: Option<String>,

    /// New price.
    pub price: Option<Decimal>,

    /// New duration in minutes.
    pub duration: Option<u16>,
}

/// Updates the `Treatment` with the provided ID.
///
/// Only the one offering it or an administrator may do that.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `TREATMENT_NOT_EXISTS` - `Treatment` with the provided ID does not
///                            exist;
/// - `INVALID_FIELD` - request is malformed.
#[tracing::instrument(skip_all, fields(treatment.id = %id))]
pub async fn update(
    ctx: Context,
    Path(id): Path<treatment::Id>,
    req: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Treatment>, Error> {
    let me = ctx.current_session().await?.profile;
    let current = treatment_of(&ctx, id).await?;
    api::authorize(&me, [Some(manager_of(&ctx, current.owner).await?)])?;
    let Json(req) = req.map_err(AsError::into_error)?;

    let treatment = ctx
        .service()
        .execute(command::UpdateTreatment {
            treatment_id: id,
            name: api::optional("name", req.name)?,
            description: api::removable("description", req.description)?,
            price: req
                .price
                .map(|p| api::valid("price", treatment::Price::new(p)))
                .transpose()?,
            duration: req
                .duration
                .map(|d| {
                    api::valid("duration", appointment::Duration::from_minutes(d))
                        .map(Some)
                })
                .transpose()?,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(treatment.into()))
}

/// Deletes the `Treatment` with the provided ID, unless it was ever booked.
///
/// Only the one offering it or an administrator may do that.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `TREATMENT_NOT_EXISTS` - `Treatment` with the provided ID does not
///                            exist;
/// - `TREATMENT_HAS_APPOINTMENTS` - `Treatment` has been booked.
#[tracing::instrument(skip_all, fields(treatment.id = %id))]
pub async fn delete(
    ctx: Context,
    Path(id): Path<treatment::Id>,
) -> Result<StatusCode, Error> {
    let me = ctx.current_session().await?.profile;
    let current = treatment_of(&ctx, id).await?;
    api::authorize(&me, [Some(manager_of(&ctx, current.owner).await?)])?;

    ctx.service()
        .execute(command::DeleteTreatment { treatment_id: id })
        .await
        .map_err(AsError::into_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the `Treatment` with the provided ID.
///
/// # Errors
///
/// If the `Treatment` doesn't exist.
async fn treatment_of(
    ctx: &Context,
    id: treatment::Id,
) -> Result<domain::Treatment, Error> {
    ctx.service()
        .execute(query::treatment::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| TreatmentError::NotExists.into())
}

/// Returns the ID of the `User` managing `Treatment`s of the provided
/// [`treatment::Owner`].
///
/// # Errors
///
/// If the owning shop doesn't exist.
async fn manager_of(
    ctx: &Context,
    owner: treatment::Owner,
) -> Result<user::Id, Error> {
    match owner {
        treatment::Owner::Shop(id) => api::shop::owner_of(ctx, id)
            .await?
            .ok_or_else(|| api::shop::ShopError::NotExists.into()),
        treatment::Owner::Barber(id) => Ok(id),
    }
}

/// Filter of [`list()`].
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ListFilter {
    /// ID of the shop offering the listed `Treatment`s.
    pub shop_id: Option<shop::Id>,

    /// ID of the barber offering the listed `Treatment`s.
    pub barber_id: Option<user::Id>,
}

/// Lists `Treatment`s offered by the shop or by the barber, ordered by name.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    filter: Result<Query<ListFilter>, QueryRejection>,
) -> Result<Json<Vec<Treatment>>, Error> {
    _ = ctx.current_session().await?;
    let Query(ListFilter { shop_id, barber_id }) =
        filter.map_err(AsError::into_error)?;

    let treatments = ctx
        .service()
        .execute(query::treatments::List::by(
            read::treatment::list::Filter { shop_id, barber_id },
        ))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(treatments.into_iter().map(Into::into).collect()))
}

define_error! {
    enum TreatmentError {
        #[code = "AMBIGUOUS_OWNER"]
        #[status = BAD_REQUEST]
        #[message = "Exactly one of `shop_id` and `barber_id` must be \
                     provided"]
        AmbiguousOwner,

        #[code = "TREATMENT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Treatment` with the provided ID does not exist"]
        NotExists,

        #[code = "TREATMENT_HAS_APPOINTMENTS"]
        #[status = BAD_REQUEST]
        #[message = "`Treatment` that has been booked cannot be deleted"]
        HasAppointments,
    }
}

impl AsError for command::create_treatment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::BarberNotExists(_) => api::user::UserError::NotExists.into(),
            Self::NotBarber(_) => api::user::UserError::NotBarber.into(),
            Self::ShopNotExists(_) => api::shop::ShopError::NotExists.into(),
        })
    }
}

impl AsError for command::update_treatment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::TreatmentNotExists(_) => {
                Some(TreatmentError::NotExists.into())
            }
        }
    }
}

impl AsError for command::delete_treatment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::HasAppointments(_) => TreatmentError::HasAppointments.into(),
            Self::TreatmentNotExists(_) => TreatmentError::NotExists.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use service::{command::delete_treatment, domain::treatment};

    use crate::AsError as _;

    #[test]
    fn maps_booked_treatment_deletion_to_bad_request() {
        let err = delete_treatment::ExecutionError::HasAppointments(
            treatment::Id::new(),
        )
        .into_error();

        assert_eq!(err.code, "TREATMENT_HAS_APPOINTMENTS");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }
}
