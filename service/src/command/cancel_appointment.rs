//! [`Command`] for cancelling an [`Appointment`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{appointment, Appointment},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for cancelling an [`Appointment`], freeing its
/// [`appointment::Slot`].
///
/// Cancelling an already cancelled [`Appointment`] succeeds again.
#[derive(Clone, Copy, Debug, From)]
pub struct CancelAppointment {
    /// ID of the [`Appointment`] to cancel.
    pub id: appointment::Id,
}

impl<Db> Command<CancelAppointment> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Appointment, appointment::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Appointment>, appointment::Id>>,
            Ok = Option<Appointment>,
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
        cmd: CancelAppointment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelAppointment { id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Appointment, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut appointment = tx
            .execute(Select(By::<Option<Appointment>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::AppointmentNotExists(id))
            .map_err(tracerr::wrap!())?;

        let to = appointment::Status::Cancelled;
        if !appointment.status.can_become(to) {
            return Err(tracerr::new!(E::InvalidStatusTransition {
                from: appointment.status,
            }));
        }
        appointment.status = to;
        appointment.updated_at = DateTime::now().coerce();

        tx.execute(Update(appointment))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

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
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(details)
    }
}

/// Error of [`CancelAppointment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Appointment`] doesn't exist.
    #[display("`Appointment(id: {_0})` does not exist")]
    AppointmentNotExists(#[error(not(source))] appointment::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Appointment`] has already reached a terminal
    /// [`appointment::Status`].
    #[display("`Appointment` cannot be cancelled from `{from}`")]
    InvalidStatusTransition {
        /// Current [`appointment::Status`].
        from: appointment::Status,
    },
}

#[cfg(test)]
mod tests {
    use super::{CancelAppointment, ExecutionError};
    use crate::{
        command::{
            update_appointment::Patch, Command as _, CreateAppointment,
            UpdateAppointment,
        },
        domain::{appointment, user},
        infra::database::Memory,
        read,
        test_support::{at, service, shop, treatment, user},
        Service,
    };

    async fn book(
        svc: &Service<Memory>,
        db: &Memory,
    ) -> read::appointment::Details {
        let owner = user(db, user::Role::Owner).await;
        let shop = shop(db, &owner).await;
        let treatment = treatment(db, &shop, None).await;
        let client = user(db, user::Role::Client).await;
        let barber = user(db, user::Role::Barber).await;
        let (date, time) = at("2025-03-01", "10:00");
        svc.execute(CreateAppointment {
            date,
            time,
            duration: None,
            client_id: client.id,
            barber_id: barber.id,
            treatment_id: treatment.id,
            shop_id: shop.id,
            status: Some(appointment::Status::Confirmed),
            notes: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn cancels_repeatedly() {
        let db = Memory::new();
        let svc = service(db.clone());
        let booked = book(&svc, &db).await;

        let first = svc.execute(CancelAppointment { id: booked.id }).await;
        let second = svc.execute(CancelAppointment { id: booked.id }).await;

        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.status, appointment::Status::Cancelled);
        assert_eq!(second.status, appointment::Status::Cancelled);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.slot, booked.slot);
        assert_eq!(second.barber_name, booked.barber_name);
    }

    #[tokio::test]
    async fn refuses_terminal_appointments() {
        let terminals =
            [appointment::Status::Completed, appointment::Status::NoShow];
        for terminal in terminals {
            let db = Memory::new();
            let svc = service(db.clone());
            let booked = book(&svc, &db).await;
            drop(
                svc.execute(UpdateAppointment {
                    id: booked.id,
                    patch: Patch {
                        status: Some(terminal),
                        ..Patch::default()
                    },
                })
                .await
                .unwrap(),
            );

            let err = svc
                .execute(CancelAppointment { id: booked.id })
                .await
                .unwrap_err();

            assert!(
                matches!(
                    err.as_ref(),
                    ExecutionError::InvalidStatusTransition { from }
                        if *from == terminal,
                ),
                "cancelled from `{terminal}`",
            );
        }
    }

    #[tokio::test]
    async fn fails_on_unknown_appointment() {
        let svc = service(Memory::new());

        let err = svc
            .execute(CancelAppointment {
                id: appointment::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::AppointmentNotExists(_),
        ));
    }
}
