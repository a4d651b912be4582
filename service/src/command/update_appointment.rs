//! [`Command`] for updating an [`Appointment`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    Date, DateTime, Time,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{appointment, shop, treatment, user, Appointment, Shop, User},
    infra::{
        database::{self, Constraint},
        Database,
    },
    read, Service,
};

use super::Command;

/// [`Command`] for updating an [`Appointment`].
///
/// Only the fields present in the [`Patch`] are changed.
#[derive(Clone, Debug)]
pub struct UpdateAppointment {
    /// ID of the [`Appointment`] to update.
    pub id: appointment::Id,

    /// Changes to apply.
    pub patch: Patch,
}

/// Changes of an [`Appointment`].
#[derive(Clone, Debug, Default)]
pub struct Patch {
    /// New [`Date`].
    pub date: Option<Date>,

    /// New start [`Time`].
    pub time: Option<Time>,

    /// New [`appointment::Duration`].
    pub duration: Option<appointment::Duration>,

    /// ID of the new barber [`User`].
    pub barber_id: Option<user::Id>,

    /// ID of the new [`Treatment`].
    ///
    /// [`Treatment`]: crate::domain::Treatment
    pub treatment_id: Option<treatment::Id>,

    /// ID of the new [`Shop`].
    pub shop_id: Option<shop::Id>,

    /// New [`appointment::Status`].
    pub status: Option<appointment::Status>,

    /// New [`appointment::Notes`].
    pub notes: Option<appointment::Notes>,
}

impl Patch {
    /// Applies this [`Patch`] to the provided [`Appointment`].
    fn apply(self, appointment: &mut Appointment) {
        let Self {
            date,
            time,
            duration,
            barber_id,
            treatment_id,
            shop_id,
            status,
            notes,
        } = self;

        let slot = &mut appointment.slot;
        slot.date = date.unwrap_or(slot.date);
        slot.time = time.unwrap_or(slot.time);
        slot.duration = duration.unwrap_or(slot.duration);
        appointment.barber_id = barber_id.or(appointment.barber_id);
        appointment.treatment_id =
            treatment_id.unwrap_or(appointment.treatment_id);
        appointment.shop_id = shop_id.unwrap_or(appointment.shop_id);
        appointment.status = status.unwrap_or(appointment.status);
        appointment.notes = notes.or(appointment.notes.take());
    }
}

impl<Db> Command<UpdateAppointment> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Appointment, appointment::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<read::appointment::ScheduleLock, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Appointment>, appointment::Id>>,
            Ok = Option<Appointment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Shop>, shop::Id>>,
            Ok = Option<Shop>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    read::appointment::Schedule,
                    read::appointment::schedule::Selector,
                >,
            >,
            Ok = read::appointment::Schedule,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<read::appointment::Details>, appointment::Id>>,
            Ok = Option<read::appointment::Details>,
            Err = Traced<database::Error>,
        > + Database<Update<Appointment>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = read::appointment::Details;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateAppointment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateAppointment { id, patch } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Appointment`.
        tx.execute(Lock(By::<Appointment, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let current = tx
            .execute(Select(By::<Option<Appointment>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::AppointmentNotExists(id))
            .map_err(tracerr::wrap!())?;

        let mut updated = current.clone();
        patch.apply(&mut updated);

        if !current.status.can_become(updated.status) {
            return Err(tracerr::new!(E::InvalidStatusTransition {
                from: current.status,
                to: updated.status,
            }));
        }

        if updated.barber_id != current.barber_id {
            if let Some(barber_id) = updated.barber_id {
                let barber = tx
                    .execute(Select(By::<Option<User>, _>::new(barber_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::BarberNotExists(barber_id))
                    .map_err(tracerr::wrap!())?;
                if !barber.is_barber() {
                    return Err(tracerr::new!(E::NotBarber(barber_id)));
                }
            }
        }
        if updated.shop_id != current.shop_id {
            drop(
                tx.execute(Select(By::<Option<Shop>, _>::new(updated.shop_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::ShopNotExists(updated.shop_id))
                    .map_err(tracerr::wrap!())?,
            );
        }

        let rescheduled = updated.slot != current.slot
            || updated.barber_id != current.barber_id;
        if let Some(barber_id) = updated
            .barber_id
            .filter(|_| rescheduled && updated.status.occupies_slot())
        {
            // Serialize bookings of the same barber until `Commit`.
            tx.execute(Lock(By::<read::appointment::ScheduleLock, _>::new(
                barber_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let schedule = tx
                .execute(Select(By::<read::appointment::Schedule, _>::new(
                    read::appointment::schedule::Selector {
                        barber_id,
                        date: updated.slot.date,
                    },
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if let Some(occupant) =
                schedule.collision(barber_id, &updated.slot, Some(id))
            {
                log::debug!(
                    "`Slot` {} of barber `{barber_id}` collides with \
                     `Appointment(id: {})`",
                    updated.slot,
                    occupant.id,
                );
                return Err(tracerr::new!(E::SlotOccupied));
            }
        }

        updated.updated_at = DateTime::now().coerce();
        tx.execute(Update(updated))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(slot_occupied)?;

        let details = tx
            .execute(Select(By::<Option<read::appointment::Details>, _>::new(
                id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::AppointmentNotExists(id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(slot_occupied)?;

        Ok(details)
    }
}

/// Error of [`UpdateAppointment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Appointment`] doesn't exist.
    #[display("`Appointment(id: {_0})` does not exist")]
    AppointmentNotExists(#[error(not(source))] appointment::Id),

    /// Barber [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    BarberNotExists(#[error(not(source))] user::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`appointment::Status`] cannot be changed this way.
    #[display("`Appointment` cannot become `{to}` from `{from}`")]
    InvalidStatusTransition {
        /// Current [`appointment::Status`].
        from: appointment::Status,

        /// Requested [`appointment::Status`].
        to: appointment::Status,
    },

    /// [`User`] is not a barber.
    #[display("`User(id: {_0})` is not a barber")]
    NotBarber(#[error(not(source))] user::Id),

    /// [`Shop`] doesn't exist.
    #[display("`Shop(id: {_0})` does not exist")]
    ShopNotExists(#[error(not(source))] shop::Id),

    /// Barber has another [`Appointment`] overlapping the requested
    /// [`appointment::Slot`].
    #[display("Requested `Slot` is occupied")]
    SlotOccupied,
}

/// Reports a violated [`Constraint::AppointmentSlot`] as
/// [`ExecutionError::SlotOccupied`].
fn slot_occupied(e: Traced<ExecutionError>) -> Traced<ExecutionError> {
    if matches!(
        e.as_ref(),
        ExecutionError::Db(db) if db.violated() == Some(Constraint::AppointmentSlot),
    ) {
        tracerr::new!(ExecutionError::SlotOccupied)
    } else {
        e
    }
}

#[cfg(test)]
mod tests {
    use futures::future;

    use super::{ExecutionError, Patch, UpdateAppointment};
    use crate::{
        command::{create_appointment, Command as _, CreateAppointment},
        domain::{appointment, user},
        infra::database::Memory,
        read,
        test_support::{at, service, shop, treatment, user},
        Service,
    };

    struct Booking {
        svc: Service<Memory>,
        db: Memory,
        first: read::appointment::Details,
    }

    /// Books a 30 minutes [`appointment::Slot`] at `2025-03-01 10:00`.
    async fn booking() -> Booking {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let shop = shop(&db, &owner).await;
        let treatment = treatment(&db, &shop, Some(30)).await;
        let client = user(&db, user::Role::Client).await;
        let barber = user(&db, user::Role::Barber).await;
        let (date, time) = at("2025-03-01", "10:00");
        let first = svc
            .execute(CreateAppointment {
                date,
                time,
                duration: None,
                client_id: client.id,
                barber_id: barber.id,
                treatment_id: treatment.id,
                shop_id: shop.id,
                status: None,
                notes: None,
            })
            .await
            .unwrap();
        Booking { svc, db, first }
    }

    async fn book_another(
        b: &Booking,
        time: &str,
    ) -> read::appointment::Details {
        let (date, time) = at("2025-03-01", time);
        b.svc
            .execute(CreateAppointment {
                date,
                time,
                duration: None,
                client_id: b.first.client_id,
                barber_id: b.first.barber_id.unwrap(),
                treatment_id: b.first.treatment_id,
                shop_id: b.first.shop_id,
                status: None,
                notes: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn changes_only_patched_fields() {
        let b = booking().await;

        let updated = b
            .svc
            .execute(UpdateAppointment {
                id: b.first.id,
                patch: Patch {
                    notes: Some(appointment::Notes::new("x").unwrap()),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(
            updated.notes.as_ref().map(ToString::to_string).as_deref(),
            Some("x"),
        );
        assert_eq!(updated.slot, b.first.slot);
        assert_eq!(updated.status, b.first.status);
        assert_eq!(updated.barber_id, b.first.barber_id);
        assert_eq!(updated.client_id, b.first.client_id);
        assert_eq!(updated.treatment_id, b.first.treatment_id);
        assert_eq!(updated.shop_id, b.first.shop_id);
        assert_eq!(updated.created_at, b.first.created_at);
        assert_eq!(updated.client_name, b.first.client_name);
    }

    #[tokio::test]
    async fn keeps_terminal_status_final() {
        let b = booking().await;

        let completed = b
            .svc
            .execute(UpdateAppointment {
                id: b.first.id,
                patch: Patch {
                    status: Some(appointment::Status::Completed),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(completed.status, appointment::Status::Completed);
        assert_eq!(completed.slot, b.first.slot);
        assert_eq!(completed.notes, b.first.notes);

        let err = b
            .svc
            .execute(UpdateAppointment {
                id: b.first.id,
                patch: Patch {
                    status: Some(appointment::Status::Confirmed),
                    ..Patch::default()
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidStatusTransition {
                from: appointment::Status::Completed,
                to: appointment::Status::Confirmed,
            },
        ));
    }

    #[tokio::test]
    async fn rejects_moving_onto_occupied_slot() {
        let b = booking().await;
        let second = book_another(&b, "11:00").await;

        let err = b
            .svc
            .execute(UpdateAppointment {
                id: second.id,
                patch: Patch {
                    time: Some(at("2025-03-01", "10:15").1),
                    ..Patch::default()
                },
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SlotOccupied));
    }

    #[tokio::test]
    async fn moves_within_own_window() {
        let b = booking().await;

        let moved = b
            .svc
            .execute(UpdateAppointment {
                id: b.first.id,
                patch: Patch {
                    time: Some(at("2025-03-01", "10:15").1),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(moved.slot.time, at("2025-03-01", "10:15").1);
    }

    #[tokio::test]
    async fn fails_on_unknown_appointment() {
        let b = booking().await;

        let err = b
            .svc
            .execute(UpdateAppointment {
                id: appointment::Id::new(),
                patch: Patch::default(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::AppointmentNotExists(_),
        ));
    }

    #[tokio::test]
    async fn reassigns_barber_checking_their_schedule() {
        let b = booking().await;
        let other = user(&b.db, user::Role::Barber).await;
        let client = user(&b.db, user::Role::Client).await;

        let err = b
            .svc
            .execute(UpdateAppointment {
                id: b.first.id,
                patch: Patch {
                    barber_id: Some(client.id),
                    ..Patch::default()
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotBarber(_)));

        let moved = b
            .svc
            .execute(UpdateAppointment {
                id: b.first.id,
                patch: Patch {
                    barber_id: Some(other.id),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(moved.barber_id, Some(other.id));
        assert_eq!(moved.barber_name, Some(other.name));
    }

    fn move_to(
        appointment: &read::appointment::Details,
        time: &str,
    ) -> UpdateAppointment {
        UpdateAppointment {
            id: appointment.id,
            patch: Patch {
                time: Some(at("2025-03-01", time).1),
                ..Patch::default()
            },
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn moves_only_one_appointment_into_contended_window() {
        let b = booking().await;
        let mut booked = vec![];
        for hour in 13..21 {
            booked.push(book_another(&b, &format!("{hour}:00")).await);
        }

        // Distinct start times, pairwise overlapping.
        let results = future::join_all(booked.iter().enumerate().map(
            |(i, a)| b.svc.execute(move_to(a, &format!("10:{:02}", 30 + i * 2))),
        ))
        .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| {
            matches!(e.as_ref(), ExecutionError::SlotOccupied)
        }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn races_booking_against_move_into_same_window() {
        let b = booking().await;
        let second = book_another(&b, "12:00").await;
        let (date, time) = at("2025-03-01", "11:10");

        let (moved, created) = future::join(
            b.svc.execute(move_to(&second, "11:00")),
            b.svc.execute(CreateAppointment {
                date,
                time,
                duration: None,
                client_id: b.first.client_id,
                barber_id: b.first.barber_id.unwrap(),
                treatment_id: b.first.treatment_id,
                shop_id: b.first.shop_id,
                status: None,
                notes: None,
            }),
        )
        .await;

        match (moved, created) {
            (Ok(_), Err(e)) => assert!(matches!(
                e.as_ref(),
                create_appointment::ExecutionError::SlotOccupied,
            )),
            (Err(e), Ok(_)) => {
                assert!(matches!(e.as_ref(), ExecutionError::SlotOccupied));
            }
            (moved, created) => panic!(
                "expected exactly one booking to win, got {moved:?} and \
                 {created:?}",
            ),
        }
    }
}
