//! [`Command`] for assigning a barber to a [`Shop`].

use common::operations::{By, Commit, Lock, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{shop, user, Shop, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for assigning a barber to a [`Shop`], replacing the previous
/// affiliation, or for unassigning them from any.
#[derive(Clone, Copy, Debug)]
pub struct AssignBarberToShop {
    /// ID of the barber [`User`].
    pub barber_id: user::Id,

    /// ID of the [`Shop`] to assign the barber to.
    ///
    /// [`None`] unassigns the barber from their current [`Shop`].
    pub shop_id: Option<shop::Id>,
}

impl<Db> Command<AssignBarberToShop> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Shop>, shop::Id>>,
            Ok = Option<Shop>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AssignBarberToShop,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AssignBarberToShop { barber_id, shop_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<User, _>::new(barber_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut barber = tx
            .execute(Select(By::<Option<User>, _>::new(barber_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(barber_id))
            .map_err(tracerr::wrap!())?;
        if !barber.is_barber() {
            return Err(tracerr::new!(E::NotBarber(barber_id)));
        }

        if let Some(id) = shop_id {
            drop(
                tx.execute(Select(By::<Option<Shop>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::ShopNotExists(id))
                    .map_err(tracerr::wrap!())?,
            );
        }
        if barber.shop_id == shop_id {
            return Ok(barber);
        }

        barber.shop_id = shop_id;
        tx.execute(Update(barber.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(barber)
    }
}

/// Error of [`AssignBarberToShop`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] is not a barber.
    #[display("`User(id: {_0})` is not a barber")]
    NotBarber(#[error(not(source))] user::Id),

    /// [`Shop`] doesn't exist.
    #[display("`Shop(id: {_0})` does not exist")]
    ShopNotExists(#[error(not(source))] shop::Id),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod tests {
    use super::{AssignBarberToShop, ExecutionError};
    use crate::{
        command::Command as _,
        domain::{shop, user},
        infra::database::Memory,
        test_support::{service, shop, user},
    };

    #[tokio::test]
    async fn assigns_and_unassigns_barber() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let shop = shop(&db, &owner).await;
        let barber = user(&db, user::Role::Barber).await;

        let assigned = svc
            .execute(AssignBarberToShop {
                barber_id: barber.id,
                shop_id: Some(shop.id),
            })
            .await
            .unwrap();
        assert_eq!(assigned.shop_id, Some(shop.id));

        let unassigned = svc
            .execute(AssignBarberToShop {
                barber_id: barber.id,
                shop_id: None,
            })
            .await
            .unwrap();
        assert_eq!(unassigned.shop_id, None);
    }

    #[tokio::test]
    async fn rejects_clients_and_unknown_shops() {
        let db = Memory::new();
        let svc = service(db.clone());
        let client = user(&db, user::Role::Client).await;
        let barber = user(&db, user::Role::Barber).await;

        let not_barber = svc
            .execute(AssignBarberToShop {
                barber_id: client.id,
                shop_id: None,
            })
            .await
            .unwrap_err();
        let no_shop = svc
            .execute(AssignBarberToShop {
                barber_id: barber.id,
                shop_id: Some(shop::Id::new()),
            })
            .await
            .unwrap_err();

        assert!(matches!(not_barber.as_ref(), ExecutionError::NotBarber(_)));
        assert!(matches!(no_shop.as_ref(), ExecutionError::ShopNotExists(_)));
    }
}
