//! [`Command`] for creating a new [`Shop`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{shop, user, Shop, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Shop`].
#[derive(Clone, Debug)]
pub struct CreateShop {
    /// [`shop::Name`] of a new [`Shop`].
    pub name: shop::Name,

    /// [`shop::Address`] of a new [`Shop`].
    pub address: shop::Address,

    /// [`shop::City`] of a new [`Shop`].
    pub city: shop::City,

    /// [`user::Phone`] of a new [`Shop`].
    pub phone: Option<user::Phone>,

    /// ID of the [`User`] owning a new [`Shop`].
    pub owner_id: user::Id,

    /// [`shop::Schedule`] of a new [`Shop`].
    pub schedule: Option<shop::Schedule>,
}

impl<Db> Command<CreateShop> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Shop>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Shop;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateShop) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateShop {
            name,
            address,
            city,
            phone,
            owner_id,
            schedule,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let owner = tx
            .execute(Select(By::<Option<User>, _>::new(owner_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OwnerNotExists(owner_id))
            .map_err(tracerr::wrap!())?;
        if !owner.is_shop_owner() {
            return Err(tracerr::new!(E::NotOwner(owner_id)));
        }

        let shop = Shop {
            id: shop::Id::new(),
            name,
            address,
            city,
            phone,
            owner_id,
            schedule,
            created_at: DateTime::now().coerce(),
        };
        tx.execute(Insert(shop.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(shop)
    }
}

/// Error of [`CreateShop`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] is not allowed to own a [`Shop`].
    #[display("`User(id: {_0})` cannot own a `Shop`")]
    NotOwner(#[error(not(source))] user::Id),

    /// Owner [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    OwnerNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod tests {
    use super::{CreateShop, ExecutionError};
    use crate::{
        command::Command as _,
        domain::{shop, user},
        infra::database::Memory,
        test_support::{service, user},
    };

    fn cmd(owner_id: user::Id) -> CreateShop {
        CreateShop {
            name: shop::Name::new("Fade Factory").unwrap(),
            address: shop::Address::new("42 Elm St").unwrap(),
            city: shop::City::new("Portland").unwrap(),
            phone: None,
            owner_id,
            schedule: Some(shop::Schedule::new("Mon-Sat 9-19").unwrap()),
        }
    }

    #[tokio::test]
    async fn creates_shop_of_owner() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;

        let shop = svc.execute(cmd(owner.id)).await.unwrap();

        assert_eq!(shop.owner_id, owner.id);
        assert_eq!(shop.name.to_string(), "Fade Factory");
    }

    #[tokio::test]
    async fn rejects_non_owner() {
        let db = Memory::new();
        let svc = service(db.clone());
        let client = user(&db, user::Role::Client).await;

        let err = svc.execute(cmd(client.id)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));
    }
}
