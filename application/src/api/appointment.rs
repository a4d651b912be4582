//! Appointment-related definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    Json,
};
use common::{Date, DateTime, Time};
use serde::{Deserialize, Serialize};
use service::{
    command::{self, update_appointment::Patch, Command as _},
    domain::{appointment, shop, treatment, user},
    query, read,
};

use crate::{api, define_error, AsError, Context, Error};

/// Appointment along with the names of the entities it references.
#[derive(Clone, Debug, Serialize)]
pub struct Appointment {
    /// ID of this `Appointment`.
    pub id: appointment::Id,

    /// Date of this `Appointment`.
    pub date: Date,

    /// Start time of this `Appointment`.
    pub time: Time,

    /// Duration of this `Appointment` in minutes.
    pub duration: u16,

    /// ID of the client who booked this `Appointment`.
    pub client_id: user::Id,

    /// ID of the barber serving this `Appointment`, if still assigned.
    pub barber_id: Option<user::Id>,

    /// ID of the booked treatment.
    pub treatment_id: treatment::Id,

    /// ID of the shop this `Appointment` takes place in.
    pub shop_id: shop::Id,

    /// Status of this `Appointment`: `pending`, `confirmed`, `in_progress`,
    /// `completed`, `cancelled` or `no_show`.
    pub status: String,

    /// Notes left by the client.
    pub notes: Option<String>,

    /// Date and time when this `Appointment` was booked.
    pub created_at: DateTime,

    /// Date and time when this `Appointment` was changed last time.
    pub updated_at: DateTime,

    /// Name of the client.
    pub client_name: Option<String>,

    /// Name of the barber.
    pub barber_name: Option<String>,

    /// Name of the booked treatment.
    pub treatment_name: Option<String>,

    /// Name of the shop.
    pub shop_name: Option<String>,
}

impl From<read::appointment::Details> for Appointment {
    fn from(details: read::appointment::Details) -> Self {
        let read::appointment::Details {
            appointment:
                service::domain::Appointment {
                    id,
                    slot,
                    client_id,
                    barber_id,
                    treatment_id,
                    shop_id,
                    status,
                    notes,
                    created_at,
                    updated_at,
                },
            client_name,
            barber_name,
            treatment_name,
            shop_name,
        } = details;
        Self {
            id,
            date: slot.date,
            time: slot.time,
            duration: slot.duration.minutes(),
            client_id,
            barber_id,
            treatment_id,
            shop_id,
            status: status.to_string(),
            notes: notes.map(|n| n.to_string()),
            created_at: created_at.coerce(),
            updated_at: updated_at.coerce(),
            client_name: client_name.map(|n| n.to_string()),
            barber_name: barber_name.map(|n| n.to_string()),
            treatment_name: treatment_name.map(|n| n.to_string()),
            shop_name: shop_name.map(|n| n.to_string()),
        }
    }
}

/// Request of [`create()`].
#[derive(Clone, Debug, Deserialize)]
pub struct CreateRequest {
    /// Date of a new `Appointment` (`YYYY-MM-DD`).
    pub date: Option<String>,

    /// Start time of a new `Appointment` (`HH:MM`).
    pub time: Option<String>,

    /// Duration of a new `Appointment` in minutes.
    ///
    /// The one of the booked treatment is used if omitted.
    pub duration: Option<u16>,

    /// ID of the client booking a new `Appointment`.
    pub client_id: Option<String>,

    /// ID of the barber to serve a new `Appointment`.
    pub barber_id: Option<String>,

    /// ID of the booked treatment.
    pub treatment_id: Option<String>,

    /// ID of the shop a new `Appointment` takes place in.
    pub shop_id: Option<String>,

    /// Initial status: `pending` (default) or `confirmed`.
    pub status: Option<String>,

    /// Notes of the client.
    pub notes: Option<String>,
}

/// Books a new `Appointment`.
///
/// Clients may book only for themselves.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `SLOT_OCCUPIED` - the barber has another `Appointment` overlapping the
///                     requested one;
/// - `INVALID_STATUS` - initial status is neither `pending` nor
///                      `confirmed`;
/// - `USER_NOT_EXISTS` - client or barber does not exist;
/// - `NOT_BARBER` - `User` assigned as barber is not a barber;
/// - `SHOP_NOT_EXISTS` - shop does not exist;
/// - `MISSING_FIELD`/`INVALID_FIELD` - request is malformed.
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    req: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), Error> {
    let me = ctx.current_session().await?.profile;
    let Json(req) = req.map_err(AsError::into_error)?;

    let cmd = command::CreateAppointment {
        date: api::required("date", req.date)?,
        time: api::required("time", req.time)?,
        duration: duration(req.duration)?,
        client_id: api::required("client_id", req.client_id)?,
        barber_id: api::required("barber_id", req.barber_id)?,
        treatment_id: api::required("treatment_id", req.treatment_id)?,
        shop_id: api::required("shop_id", req.shop_id)?,
        status: api::optional("status", req.status)?,
        notes: api::optional("notes", req.notes)?,
    };
    if me.role == user::Role::Client {
        api::authorize(&me, [Some(cmd.client_id)])?;
    }
    let details = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(details.into())))
}

/// Returns the `Appointment` with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `APPOINTMENT_NOT_EXISTS` - `Appointment` with the provided ID does not
///                              exist.
#[tracing::instrument(skip_all, fields(appointment.id = %id))]
pub async fn get(
    ctx: Context,
    Path(id): Path<appointment::Id>,
) -> Result<Json<Appointment>, Error> {
    _ = ctx.current_session().await?;

    ctx.service()
        .execute(query::appointment::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|d| Json(d.into()))
        .ok_or_else(|| AppointmentError::NotExists.into())
}

/// Filter of [`list()`].
///
/// Present criteria are combined.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ListFilter {
    /// ID of the client who booked the listed `Appointment`s.
    pub client_id: Option<user::Id>,

    /// ID of the barber serving the listed `Appointment`s.
    pub barber_id: Option<user::Id>,

    /// ID of the shop the listed `Appointment`s take place in.
    pub shop_id: Option<shop::Id>,
}

/// Lists `Appointment`s, the latest first.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    filter: Result<Query<ListFilter>, QueryRejection>,
) -> Result<Json<Vec<Appointment>>, Error> {
    _ = ctx.current_session().await?;
    let Query(ListFilter {
        client_id,
        barber_id,
        shop_id,
    }) = filter.map_err(AsError::into_error)?;

    let list = ctx
        .service()
        .execute(query::appointments::List::by(
            read::appointment::list::Filter {
                client_id,
                barber_id,
                shop_id,
            },
        ))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(list.into_iter().map(Into::into).collect()))
}

/// Lists `Appointment`s of the client with the provided ID, the latest
/// first.
#[tracing::instrument(skip_all, fields(user.id = %client_id))]
pub async fn list_by_client(
    ctx: Context,
    Path(client_id): Path<user::Id>,
) -> Result<Json<Vec<Appointment>>, Error> {
    _ = ctx.current_session().await?;

    let list = ctx
        .service()
        .execute(query::appointments::List::by(
            read::appointment::list::Filter {
                client_id: Some(client_id),
                ..read::appointment::list::Filter::default()
            },
        ))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(list.into_iter().map(Into::into).collect()))
}

/// Request of [`update()`].
///
/// Only present fields are changed.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateRequest {
    /// New date (`YYYY-MM-DD`).
    pub date: Option<String>,

    /// New start time (`HH:MM`).
    pub time: Option<String>,

    /// New duration in minutes.
    pub duration: Option<u16>,

    /// ID of the new barber.
    pub barber_id: Option<String>,

    /// ID of the new treatment.
    pub treatment_id: Option<String>,

    /// ID of the new shop.
    pub shop_id: Option<String>,

    /// New status.
    pub status: Option<String>,

    /// New notes.
    pub notes: Option<String>,
}

/// Updates the `Appointment` with the provided ID.
///
/// Only its barber, the owner of its shop or an administrator may move it to
/// `confirmed`, `in_progress`, `completed` or `no_show`. Other changes are
/// allowed to its client too.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `APPOINTMENT_NOT_EXISTS` - `Appointment` with the provided ID does not
///                              exist;
/// - `INVALID_STATUS_TRANSITION` - status cannot be changed this way;
/// - `SLOT_OCCUPIED` - the barber has another `Appointment` overlapping the
///                     requested one;
/// - `USER_NOT_EXISTS` - new barber does not exist;
/// - `NOT_BARBER` - `User` assigned as barber is not a barber;
/// - `SHOP_NOT_EXISTS` - new shop does not exist;
/// - `INVALID_FIELD` - request is malformed.
#[tracing::instrument(skip_all, fields(appointment.id = %id))]
pub async fn update(
    ctx: Context,
    Path(id): Path<appointment::Id>,
    req: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Appointment>, Error> {
    let me = ctx.current_session().await?.profile;
    let Json(req) = req.map_err(AsError::into_error)?;

    let patch = Patch {
        date: api::optional("date", req.date)?,
        time: api::optional("time", req.time)?,
        duration: duration(req.duration)?,
        barber_id: api::optional("barber_id", req.barber_id)?,
        treatment_id: api::optional("treatment_id", req.treatment_id)?,
        shop_id: api::optional("shop_id", req.shop_id)?,
        status: api::optional("status", req.status)?,
        notes: api::optional("notes", req.notes)?,
    };
    let participants = Participants::of(&ctx, id).await?;
    api::authorize(&me, participants.editors(patch.status))?;

    let details = ctx
        .service()
        .execute(command::UpdateAppointment { id, patch })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(details.into()))
}

/// Cancels the `Appointment` with the provided ID, freeing its slot.
///
/// Allowed to its client, its barber, the owner of its shop and
/// administrators.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `APPOINTMENT_NOT_EXISTS` - `Appointment` with the provided ID does not
///                              exist;
/// - `INVALID_STATUS_TRANSITION` - `Appointment` is already completed or
///                                 missed.
#[tracing::instrument(skip_all, fields(appointment.id = %id))]
pub async fn cancel(
    ctx: Context,
    Path(id): Path<appointment::Id>,
) -> Result<Json<Appointment>, Error> {
    let me = ctx.current_session().await?.profile;
    let participants = Participants::of(&ctx, id).await?;
    api::authorize(&me, participants.editors(None))?;

    let details = ctx
        .service()
        .execute(command::CancelAppointment { id })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(details.into()))
}

/// Parameters of [`purge()`].
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PurgeParams {
    /// Whether to keep the `Appointment`s that are neither completed nor
    /// cancelled.
    ///
    /// `true` if omitted.
    pub keep_active: Option<bool>,
}

/// Deletes `Appointment`s of the client with the provided ID.
///
/// Only the client themself or an administrator may do that.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - not enough privileges;
/// - `INVALID_QUERY` - `keep_active` is not a boolean.
#[tracing::instrument(skip_all, fields(user.id = %client_id))]
pub async fn purge(
    ctx: Context,
    Path(client_id): Path<user::Id>,
    params: Result<Query<PurgeParams>, QueryRejection>,
) -> Result<StatusCode, Error> {
    let me = ctx.current_session().await?.profile;
    api::authorize(&me, [Some(client_id)])?;
    let Query(PurgeParams { keep_active }) =
        params.map_err(AsError::into_error)?;

    _ = ctx
        .service()
        .execute(command::PurgeClientAppointments {
            client_id,
            keep_active: keep_active.unwrap_or(true),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// `User`s involved into an `Appointment`.
#[derive(Clone, Copy, Debug)]
struct Participants {
    /// ID of the client who booked the `Appointment`.
    client_id: user::Id,

    /// ID of the barber serving the `Appointment`.
    barber_id: Option<user::Id>,

    /// ID of the `User` owning the shop of the `Appointment`.
    shop_owner_id: Option<user::Id>,
}

impl Participants {
    /// Looks up the [`Participants`] of the `Appointment` with the provided
    /// ID.
    ///
    /// # Errors
    ///
    /// If the `Appointment` doesn't exist.
    async fn of(ctx: &Context, id: appointment::Id) -> Result<Self, Error> {
        let details = ctx
            .service()
            .execute(query::appointment::ById::by(id))
            .await
            .map_err(AsError::into_error)?
            .ok_or_else(|| Error::from(AppointmentError::NotExists))?;
        let appointment = &details.appointment;
        Ok(Self {
            client_id: appointment.client_id,
            barber_id: appointment.barber_id,
            shop_owner_id: api::shop::owner_of(ctx, appointment.shop_id)
                .await?,
        })
    }

    /// Returns the `User`s allowed to edit the `Appointment`, optionally
    /// setting the provided [`appointment::Status`].
    fn editors(
        self,
        status: Option<appointment::Status>,
    ) -> [Option<user::Id>; 3] {
        use appointment::Status as S;

        let staff_only = matches!(
            status,
            Some(S::Confirmed | S::InProgress | S::Completed | S::NoShow),
        );
        [
            (!staff_only).then_some(self.client_id),
            self.barber_id,
            self.shop_owner_id,
        ]
    }
}

/// Parses the optional `minutes` of an [`appointment::Duration`].
fn duration(
    minutes: Option<u16>,
) -> Result<Option<appointment::Duration>, Error> {
    minutes
        .map(|m| api::valid("duration", appointment::Duration::from_minutes(m)))
        .transpose()
}

define_error! {
    enum AppointmentError {
        #[code = "INVALID_STATUS"]
        #[status = BAD_REQUEST]
        #[message = "`Appointment` may only be created `pending` or \
                     `confirmed`"]
        InvalidInitialStatus,

        #[code = "INVALID_STATUS_TRANSITION"]
        #[status = BAD_REQUEST]
        #[message = "`Appointment` status cannot be changed this way"]
        InvalidStatusTransition,

        #[code = "APPOINTMENT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Appointment` with the provided ID does not exist"]
        NotExists,

        #[code = "SLOT_OCCUPIED"]
        #[status = BAD_REQUEST]
        #[message = "Barber has another `Appointment` at the requested time"]
        SlotOccupied,
    }
}

impl AsError for command::create_appointment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use api::{shop::ShopError, user::UserError};

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::BarberNotExists(_) | Self::ClientNotExists(_) => {
                UserError::NotExists.into()
            }
            Self::InvalidInitialStatus(_) => {
                AppointmentError::InvalidInitialStatus.into()
            }
            Self::NotBarber(_) => UserError::NotBarber.into(),
            Self::ShopNotExists(_) => ShopError::NotExists.into(),
            Self::SlotOccupied => AppointmentError::SlotOccupied.into(),
        })
    }
}

impl AsError for command::update_appointment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use api::{shop::ShopError, user::UserError};

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::AppointmentNotExists(_) => AppointmentError::NotExists.into(),
            Self::BarberNotExists(_) => UserError::NotExists.into(),
            Self::InvalidStatusTransition { .. } => {
                AppointmentError::InvalidStatusTransition.into()
            }
            Self::NotBarber(_) => UserError::NotBarber.into(),
            Self::ShopNotExists(_) => ShopError::NotExists.into(),
            Self::SlotOccupied => AppointmentError::SlotOccupied.into(),
        })
    }
}

impl AsError for command::cancel_appointment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::AppointmentNotExists(_) => AppointmentError::NotExists.into(),
            Self::InvalidStatusTransition { .. } => {
                AppointmentError::InvalidStatusTransition.into()
            }
        })
    }
}

impl AsError for command::purge_client_appointments::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use service::{
        command::{cancel_appointment, create_appointment},
        domain::{appointment, user},
        read,
    };

    use super::{duration, Participants};
    use crate::{api, AsError as _};

    fn participants() -> Participants {
        Participants {
            client_id: user::Id::new(),
            barber_id: Some(user::Id::new()),
            shop_owner_id: Some(user::Id::new()),
        }
    }

    fn as_user(id: user::Id, role: user::Role) -> read::user::Profile {
        read::user::Profile {
            id,
            ..api::profile(role)
        }
    }

    #[test]
    fn maps_conflicts_to_bad_request() {
        let err = create_appointment::ExecutionError::SlotOccupied.into_error();

        assert_eq!(err.code, "SLOT_OCCUPIED");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn maps_terminal_cancellation_to_bad_request() {
        let err = cancel_appointment::ExecutionError::InvalidStatusTransition {
            from: appointment::Status::Completed,
        }
        .into_error();

        assert_eq!(err.code, "INVALID_STATUS_TRANSITION");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rejects_zero_duration() {
        assert!(duration(None).unwrap().is_none());
        assert_eq!(duration(Some(45)).unwrap().map(|d| d.minutes()), Some(45));
        assert_eq!(duration(Some(0)).unwrap_err().code, "INVALID_FIELD");
    }

    #[test]
    fn leaves_service_statuses_to_staff() {
        use appointment::Status as S;

        let p = participants();
        let client = as_user(p.client_id, user::Role::Client);
        let barber = as_user(p.barber_id.unwrap(), user::Role::Barber);
        let owner = as_user(p.shop_owner_id.unwrap(), user::Role::Owner);

        for status in [S::Confirmed, S::InProgress, S::Completed, S::NoShow] {
            let editors = p.editors(Some(status));
            assert_eq!(
                api::authorize(&client, editors).unwrap_err().code,
                "FORBIDDEN",
            );
            assert!(api::authorize(&barber, editors).is_ok());
            assert!(api::authorize(&owner, editors).is_ok());
        }
    }

    #[test]
    fn lets_participants_reschedule_and_cancel() {
        use appointment::Status as S;

        let p = participants();
        let client = as_user(p.client_id, user::Role::Client);
        let barber = as_user(p.barber_id.unwrap(), user::Role::Barber);
        let stranger = api::profile(user::Role::Client);
        let other_barber = api::profile(user::Role::Barber);
        let admin = api::profile(user::Role::Admin);

        for status in [None, Some(S::Pending), Some(S::Cancelled)] {
            let editors = p.editors(status);
            assert!(api::authorize(&client, editors).is_ok());
            assert!(api::authorize(&barber, editors).is_ok());
            assert!(api::authorize(&admin, editors).is_ok());
            assert!(api::authorize(&stranger, editors).is_err());
            assert!(api::authorize(&other_barber, editors).is_err());
        }
    }
}
