//! [`Command`] for editing a [`Shop`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{shop, user, Shop, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for editing a [`Shop`].
///
/// Fields left as [`None`] keep their current values.
#[derive(Clone, Debug, Default)]
pub struct UpdateShop {
    /// ID of the [`Shop`] to edit.
    pub shop_id: shop::Id,

    /// New [`shop::Name`] of the [`Shop`].
    pub name: Option<shop::Name>,

    /// New [`shop::Address`] of the [`Shop`].
    pub address: Option<shop::Address>,

    /// New [`shop::City`] of the [`Shop`].
    pub city: Option<shop::City>,

    /// New [`user::Phone`] of the [`Shop`], or `Some(None)` to remove it.
    pub phone: Option<Option<user::Phone>>,

    /// New [`shop::Schedule`] of the [`Shop`], or `Some(None)` to remove it.
    pub schedule: Option<Option<shop::Schedule>>,

    /// ID of the [`User`] to hand the [`Shop`] over to.
    pub owner_id: Option<user::Id>,
}

impl<Db> Command<UpdateShop> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Shop>, shop::Id>>,
            Ok = Option<Shop>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Shop, shop::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Shop>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Shop;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateShop) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateShop {
            shop_id,
            name,
            address,
            city,
            phone,
            schedule,
            owner_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Shop, _>::new(shop_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut shop = tx
            .execute(Select(By::<Option<Shop>, _>::new(shop_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ShopNotExists(shop_id))
            .map_err(tracerr::wrap!())?;

        if let Some(id) = owner_id.filter(|id| *id != shop.owner_id) {
            let owner = tx
                .execute(Select(By::<Option<User>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::OwnerNotExists(id))
                .map_err(tracerr::wrap!())?;
            if !owner.is_shop_owner() {
                return Err(tracerr::new!(E::NotOwner(id)));
            }
            shop.owner_id = id;
        }
        if let Some(name) = name {
            shop.name = name;
        }
        if let Some(address) = address {
            shop.address = address;
        }
        if let Some(city) = city {
            shop.city = city;
        }
        if let Some(phone) = phone {
            shop.phone = phone;
        }
        if let Some(schedule) = schedule {
            shop.schedule = schedule;
        }

        tx.execute(Update(shop.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(shop)
    }
}

/// Error of [`UpdateShop`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] is not allowed to own a [`Shop`].
    #[display("`User(id: {_0})` cannot own a `Shop`")]
    NotOwner(#[error(not(source))] user::Id),

    /// New owner [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    OwnerNotExists(#[error(not(source))] user::Id),

    /// [`Shop`] doesn't exist.
    #[display("`Shop(id: {_0})` does not exist")]
    ShopNotExists(#[error(not(source))] shop::Id),
}

#[cfg(test)]
mod tests {
    use super::{ExecutionError, UpdateShop};
    use crate::{
        command::Command as _,
        domain::{shop, user},
        infra::database::Memory,
        test_support::{service, shop, user},
    };

    #[tokio::test]
    async fn patches_provided_fields_only() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let s = shop(&db, &owner).await;

        let updated = svc
            .execute(UpdateShop {
                shop_id: s.id,
                city: Some(shop::City::new("Shelbyville").unwrap()),
                schedule: Some(shop::Schedule::new("Mon-Fri 10-18")),
                ..UpdateShop::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.city.to_string(), "Shelbyville");
        assert_eq!(updated.name, s.name);
        assert_eq!(updated.address, s.address);
        assert!(updated.schedule.is_some());
    }

    #[tokio::test]
    async fn hands_shop_over_to_owners_only() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let next = user(&db, user::Role::Owner).await;
        let barber = user(&db, user::Role::Barber).await;
        let s = shop(&db, &owner).await;

        let err = svc
            .execute(UpdateShop {
                shop_id: s.id,
                owner_id: Some(barber.id),
                ..UpdateShop::default()
            })
            .await
            .unwrap_err();
        let updated = svc
            .execute(UpdateShop {
                shop_id: s.id,
                owner_id: Some(next.id),
                ..UpdateShop::default()
            })
            .await
            .unwrap();

        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));
        assert_eq!(updated.owner_id, next.id);
    }

    #[tokio::test]
    async fn fails_on_unknown_shop() {
        let svc = service(Memory::new());

        let err = svc
            .execute(UpdateShop {
                shop_id: shop::Id::new(),
                ..UpdateShop::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ShopNotExists(_)));
    }
}
