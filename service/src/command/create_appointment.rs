//! [`Command`] for booking a new [`Appointment`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    Date, DateTime, Time,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        appointment, shop, treatment, user, Appointment, Shop, Treatment, User,
    },
    infra::{
        database::{self, Constraint},
        Database,
    },
    read, Service,
};

use super::Command;

/// [`Command`] for booking a new [`Appointment`].
#[derive(Clone, Debug)]
pub struct CreateAppointment {
    /// [`Date`] of a new [`Appointment`].
    pub date: Date,

    /// Start [`Time`] of a new [`Appointment`].
    pub time: Time,

    /// [`appointment::Duration`] of a new [`Appointment`].
    ///
    /// If [`None`], then the one of the booked [`Treatment`] is used, or
    /// [`appointment::Duration::DEFAULT`] if it has none.
    pub duration: Option<appointment::Duration>,

    /// ID of the client [`User`] booking a new [`Appointment`].
    pub client_id: user::Id,

    /// ID of the barber [`User`] to serve a new [`Appointment`].
    pub barber_id: user::Id,

    /// ID of the booked [`Treatment`].
    pub treatment_id: treatment::Id,

    /// ID of the [`Shop`] a new [`Appointment`] takes place in.
    pub shop_id: shop::Id,

    /// Initial [`appointment::Status`] of a new [`Appointment`].
    ///
    /// [`appointment::Status::Pending`] if [`None`].
    pub status: Option<appointment::Status>,

    /// [`appointment::Notes`] of the client.
    pub notes: Option<appointment::Notes>,
}

impl<Db> Command<CreateAppointment> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<read::appointment::ScheduleLock, user::Id>>,
            Ok = (),
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
            Select<By<Option<Treatment>, treatment::Id>>,
            Ok = Option<Treatment>,
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
        > + Database<Insert<Appointment>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = read::appointment::Details;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateAppointment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateAppointment {
            date,
            time,
            duration,
            client_id,
            barber_id,
            treatment_id,
            shop_id,
            status,
            notes,
        } = cmd;

        let status = status.unwrap_or_default();
        if !status.is_initial() {
            return Err(tracerr::new!(E::InvalidInitialStatus(status)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serialize bookings of the same barber until `Commit`.
        tx.execute(Lock(By::<read::appointment::ScheduleLock, _>::new(
            barber_id,
        )))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let client = tx
            .execute(Select(By::<Option<User>, _>::new(client_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ClientNotExists(client_id))
            .map_err(tracerr::wrap!())?;
        let barber = tx
            .execute(Select(By::<Option<User>, _>::new(barber_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BarberNotExists(barber_id))
            .map_err(tracerr::wrap!())?;
        if !barber.is_barber() {
            return Err(tracerr::new!(E::NotBarber(barber_id)));
        }
        let shop = tx
            .execute(Select(By::<Option<Shop>, _>::new(shop_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ShopNotExists(shop_id))
            .map_err(tracerr::wrap!())?;
        let treatment = tx
            .execute(Select(By::<Option<Treatment>, _>::new(treatment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let duration = duration
            .or_else(|| treatment.as_ref().and_then(|t| t.duration))
            .unwrap_or_default();
        let slot = appointment::Slot {
            date,
            time,
            duration,
        };

        let schedule = tx
            .execute(Select(By::<read::appointment::Schedule, _>::new(
                read::appointment::schedule::Selector { barber_id, date },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(occupant) = schedule.collision(barber_id, &slot, None) {
            log::debug!(
                "`Slot` {slot} of barber `{barber_id}` collides with \
                 `Appointment(id: {})`",
                occupant.id,
            );
            return Err(tracerr::new!(E::SlotOccupied));
        }

        let now = DateTime::now();
        let appointment = Appointment {
            id: appointment::Id::new(),
            slot,
            client_id,
            barber_id: Some(barber_id),
            treatment_id,
            shop_id,
            status,
            notes,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };
        tx.execute(Insert(appointment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(slot_occupied)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(slot_occupied)?;

        Ok(read::appointment::Details {
            appointment,
            client_name: Some(client.name),
            barber_name: Some(barber.name),
            treatment_name: treatment.map(|t| t.name),
            shop_name: Some(shop.name),
        })
    }
}

/// Error of [`CreateAppointment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Barber [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    BarberNotExists(#[error(not(source))] user::Id),

    /// Client [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    ClientNotExists(#[error(not(source))] user::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Appointment`] cannot be created in the provided
    /// [`appointment::Status`].
    #[display("`Appointment` cannot be created as `{_0}`")]
    InvalidInitialStatus(#[error(not(source))] appointment::Status),

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
    use common::operations::{By, Select};
    use futures::future;

    use super::{CreateAppointment, ExecutionError};
    use crate::{
        command::{CancelAppointment, Command as _},
        domain::{appointment, treatment, user, Appointment, Shop, User},
        infra::{database::Memory, Database as _},
        test_support::{at, service, shop, treatment, user},
    };

    struct Fixture {
        db: Memory,
        client: User,
        barber: User,
        shop: Shop,
        treatment_id: treatment::Id,
    }

    async fn fixture(treatment_minutes: Option<u16>) -> Fixture {
        let db = Memory::new();
        let owner = user(&db, user::Role::Owner).await;
        let shop = shop(&db, &owner).await;
        let treatment_id = treatment(&db, &shop, treatment_minutes).await.id;
        Fixture {
            client: user(&db, user::Role::Client).await,
            barber: user(&db, user::Role::Barber).await,
            db,
            shop,
            treatment_id,
        }
    }

    fn book(f: &Fixture, date: &str, time: &str) -> CreateAppointment {
        let (date, time) = at(date, time);
        CreateAppointment {
            date,
            time,
            duration: None,
            client_id: f.client.id,
            barber_id: f.barber.id,
            treatment_id: f.treatment_id,
            shop_id: f.shop.id,
            status: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn books_pending_appointment_with_names() {
        let f = fixture(Some(30)).await;
        let svc = service(f.db.clone());

        let booked = svc.execute(book(&f, "2025-03-01", "10:00")).await.unwrap();

        assert_eq!(booked.status, appointment::Status::Pending);
        assert_eq!(booked.barber_id, Some(f.barber.id));
        assert_eq!(booked.client_name, Some(f.client.name.clone()));
        assert_eq!(booked.barber_name, Some(f.barber.name.clone()));
        assert_eq!(booked.shop_name, Some(f.shop.name.clone()));
        assert!(booked.treatment_name.is_some());
        let stored = f
            .db
            .execute(Select(By::<Option<Appointment>, _>::new(booked.id)))
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn resolves_duration() {
        let f = fixture(Some(45)).await;
        let svc = service(f.db.clone());

        let explicit = svc
            .execute(CreateAppointment {
                duration: appointment::Duration::from_minutes(15),
                ..book(&f, "2025-03-01", "09:00")
            })
            .await
            .unwrap();
        let of_treatment =
            svc.execute(book(&f, "2025-03-01", "10:00")).await.unwrap();
        let fallback = svc
            .execute(CreateAppointment {
                treatment_id: treatment::Id::new(),
                ..book(&f, "2025-03-01", "11:00")
            })
            .await
            .unwrap();

        assert_eq!(explicit.slot.duration.minutes(), 15);
        assert_eq!(of_treatment.slot.duration.minutes(), 45);
        assert_eq!(fallback.slot.duration, appointment::Duration::DEFAULT);
        assert!(fallback.treatment_name.is_none());
    }

    #[tokio::test]
    async fn uses_default_duration_for_treatment_without_one() {
        let f = fixture(None).await;
        let svc = service(f.db.clone());

        let booked = svc.execute(book(&f, "2025-03-01", "10:00")).await.unwrap();

        assert_eq!(booked.slot.duration.minutes(), 30);
    }

    #[tokio::test]
    async fn rejects_double_booking_until_cancelled() {
        let f = fixture(Some(30)).await;
        let svc = service(f.db.clone());

        let first = svc.execute(book(&f, "2025-03-01", "10:00")).await.unwrap();

        let err = svc
            .execute(book(&f, "2025-03-01", "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::SlotOccupied));

        drop(svc.execute(CancelAppointment { id: first.id }).await.unwrap());

        let second = svc.execute(book(&f, "2025-03-01", "10:00")).await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn rejects_overlapping_windows() {
        let f = fixture(Some(60)).await;
        let svc = service(f.db.clone());
        drop(svc.execute(book(&f, "2025-03-01", "10:00")).await.unwrap());

        let err = svc
            .execute(book(&f, "2025-03-01", "10:30"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::SlotOccupied));

        // Back-to-back windows don't overlap.
        drop(svc.execute(book(&f, "2025-03-01", "11:00")).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_overlap_across_midnight() {
        let f = fixture(Some(60)).await;
        let svc = service(f.db.clone());
        drop(svc.execute(book(&f, "2025-03-01", "23:30")).await.unwrap());

        let err = svc
            .execute(book(&f, "2025-03-02", "00:00"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SlotOccupied));
    }

    #[tokio::test]
    async fn allows_same_slot_for_other_barber() {
        let f = fixture(Some(30)).await;
        let svc = service(f.db.clone());
        let other = user(&f.db, user::Role::Owner).await;
        drop(svc.execute(book(&f, "2025-03-01", "10:00")).await.unwrap());

        let booked = svc
            .execute(CreateAppointment {
                barber_id: other.id,
                ..book(&f, "2025-03-01", "10:00")
            })
            .await
            .unwrap();

        assert_eq!(booked.barber_id, Some(other.id));
    }

    #[tokio::test]
    async fn validates_participants_and_status() {
        let f = fixture(Some(30)).await;
        let svc = service(f.db.clone());

        let not_barber = svc
            .execute(CreateAppointment {
                barber_id: f.client.id,
                ..book(&f, "2025-03-01", "10:00")
            })
            .await
            .unwrap_err();
        let no_client = svc
            .execute(CreateAppointment {
                client_id: user::Id::new(),
                ..book(&f, "2025-03-01", "10:00")
            })
            .await
            .unwrap_err();
        let completed = svc
            .execute(CreateAppointment {
                status: Some(appointment::Status::Completed),
                ..book(&f, "2025-03-01", "10:00")
            })
            .await
            .unwrap_err();
        let confirmed = svc
            .execute(CreateAppointment {
                status: Some(appointment::Status::Confirmed),
                ..book(&f, "2025-03-01", "10:00")
            })
            .await
            .unwrap();

        assert!(matches!(not_barber.as_ref(), ExecutionError::NotBarber(_)));
        assert!(matches!(
            no_client.as_ref(),
            ExecutionError::ClientNotExists(_),
        ));
        assert!(matches!(
            completed.as_ref(),
            ExecutionError::InvalidInitialStatus(_),
        ));
        assert_eq!(confirmed.status, appointment::Status::Confirmed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn books_contended_slot_only_once() {
        let f = fixture(Some(30)).await;
        let svc = service(f.db.clone());

        let results = future::join_all(
            (0..8).map(|_| svc.execute(book(&f, "2025-03-01", "10:00"))),
        )
        .await;

        let booked = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(booked, 1);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| {
            matches!(e.as_ref(), ExecutionError::SlotOccupied)
        }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn books_overlapping_windows_only_once() {
        let f = fixture(Some(60)).await;
        let svc = service(f.db.clone());

        // Distinct start times, so only the schedule check can tell them
        // apart.
        let results = future::join_all((0..8).map(|i| {
            svc.execute(book(&f, "2025-03-01", &format!("10:{:02}", i * 5)))
        }))
        .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| {
            matches!(e.as_ref(), ExecutionError::SlotOccupied)
        }));
    }
}
