//! [`Command`] for deleting a [`Treatment`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Appointment;
use crate::{
    domain::{treatment, Treatment},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deleting a [`Treatment`] nobody has ever booked.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteTreatment {
    /// ID of the [`Treatment`] to delete.
    pub treatment_id: treatment::Id,
}

impl<Db> Command<DeleteTreatment> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Treatment>, treatment::Id>>,
            Ok = Option<Treatment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<read::appointment::Count, read::appointment::Reference>,
            >,
            Ok = read::appointment::Count,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Treatment, treatment::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Treatment, treatment::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteTreatment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteTreatment { treatment_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Treatment, _>::new(treatment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        drop(
            tx.execute(Select(By::<Option<Treatment>, _>::new(treatment_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::TreatmentNotExists(treatment_id))
                .map_err(tracerr::wrap!())?,
        );

        let read::appointment::Count(booked) = tx
            .execute(Select(By::new(
                read::appointment::Reference::Treatment(treatment_id),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if booked > 0 {
            return Err(tracerr::new!(E::HasAppointments(treatment_id)));
        }

        tx.execute(Delete(By::<Treatment, _>::new(treatment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`DeleteTreatment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Treatment`] is booked by [`Appointment`]s.
    #[display("`Treatment(id: {_0})` has appointments")]
    HasAppointments(#[error(not(source))] treatment::Id),

    /// [`Treatment`] doesn't exist.
    #[display("`Treatment(id: {_0})` does not exist")]
    TreatmentNotExists(#[error(not(source))] treatment::Id),
}

#[cfg(test)]
mod tests {
    use common::operations::{By, Select};

    use super::{DeleteTreatment, ExecutionError};
    use crate::{
        command::{CancelAppointment, Command as _, CreateAppointment},
        domain::{user, Treatment},
        infra::{database::Memory, Database as _},
        test_support::{at, service, shop, treatment, user},
    };

    #[tokio::test]
    async fn removes_unbooked_treatment() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let s = shop(&db, &owner).await;
        let t = treatment(&db, &s, Some(30)).await;

        svc.execute(DeleteTreatment { treatment_id: t.id })
            .await
            .unwrap();

        let found = db
            .execute(Select(By::<Option<Treatment>, _>::new(t.id)))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn refuses_treatment_booked_even_if_cancelled() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let client = user(&db, user::Role::Client).await;
        let s = shop(&db, &owner).await;
        let t = treatment(&db, &s, Some(30)).await;
        let (date, time) = at("2025-03-01", "10:00");
        let booked = svc
            .execute(CreateAppointment {
                date,
                time,
                duration: None,
                client_id: client.id,
                barber_id: owner.id,
                treatment_id: t.id,
                shop_id: s.id,
                status: None,
                notes: None,
            })
            .await
            .unwrap();
        drop(
            svc.execute(CancelAppointment {
                id: booked.id,
            })
            .await
            .unwrap(),
        );

        let err = svc
            .execute(DeleteTreatment { treatment_id: t.id })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::HasAppointments(_)));
    }
}
