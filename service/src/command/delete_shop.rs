//! [`Command`] for deleting a [`Shop`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Appointment, Treatment};
use crate::{
    domain::{shop, Shop},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deleting a [`Shop`].
///
/// Barbers working at the [`Shop`] are unassigned from it and its
/// [`Treatment`]s are removed. A [`Shop`] with any [`Appointment`]s can't be
/// deleted.
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteShop {
    /// ID of the [`Shop`] to delete.
    pub shop_id: shop::Id,
}

impl<Db> Command<DeleteShop> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Shop>, shop::Id>>,
            Ok = Option<Shop>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<read::appointment::Count, read::appointment::Reference>,
            >,
            Ok = read::appointment::Count,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Shop, shop::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Shop, shop::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteShop) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteShop { shop_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Shop, _>::new(shop_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        drop(
            tx.execute(Select(By::<Option<Shop>, _>::new(shop_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::ShopNotExists(shop_id))
                .map_err(tracerr::wrap!())?,
        );

        let read::appointment::Count(booked) = tx
            .execute(Select(By::new(read::appointment::Reference::Shop(
                shop_id,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if booked > 0 {
            return Err(tracerr::new!(E::HasAppointments(shop_id)));
        }

        tx.execute(Delete(By::<Shop, _>::new(shop_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`DeleteShop`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Shop`] is referenced by [`Appointment`]s.
    #[display("`Shop(id: {_0})` has appointments")]
    HasAppointments(#[error(not(source))] shop::Id),

    /// [`Shop`] doesn't exist.
    #[display("`Shop(id: {_0})` does not exist")]
    ShopNotExists(#[error(not(source))] shop::Id),
}

#[cfg(test)]
mod tests {
    use common::operations::{By, Select};

    use super::{DeleteShop, ExecutionError};
    use crate::{
        command::{AssignBarberToShop, Command as _, CreateAppointment},
        domain::{treatment, user, Shop, Treatment, User},
        infra::{database::Memory, Database as _},
        test_support::{at, service, shop, treatment, user},
    };

    #[tokio::test]
    async fn removes_shop_with_its_treatments() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let s = shop(&db, &owner).await;
        let t = treatment(&db, &s, Some(30)).await;

        svc.execute(DeleteShop { shop_id: s.id }).await.unwrap();

        let shop = db
            .execute(Select(By::<Option<Shop>, _>::new(s.id)))
            .await
            .unwrap();
        let treatment = db
            .execute(Select(By::<Option<Treatment>, treatment::Id>::new(t.id)))
            .await
            .unwrap();
        assert!(shop.is_none());
        assert!(treatment.is_none());
    }

    #[tokio::test]
    async fn unassigns_barbers() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let s = shop(&db, &owner).await;
        let barber = user(&db, user::Role::Barber).await;
        svc.execute(AssignBarberToShop {
            barber_id: barber.id,
            shop_id: Some(s.id),
        })
        .await
        .unwrap();

        svc.execute(DeleteShop { shop_id: s.id }).await.unwrap();

        let barber = db
            .execute(Select(By::<Option<User>, _>::new(barber.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(barber.shop_id, None);
    }

    #[tokio::test]
    async fn refuses_shop_with_appointments() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let client = user(&db, user::Role::Client).await;
        let s = shop(&db, &owner).await;
        let t = treatment(&db, &s, Some(30)).await;
        let (date, time) = at("2025-03-01", "10:00");
        drop(
            svc.execute(CreateAppointment {
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
            .unwrap(),
        );

        let err = svc.execute(DeleteShop { shop_id: s.id }).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::HasAppointments(_)));
        let shop = db
            .execute(Select(By::<Option<Shop>, _>::new(s.id)))
            .await
            .unwrap();
        assert!(shop.is_some());
    }
}
