//! [`Command`] for creating a new [`Treatment`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{appointment, shop, treatment, user, Shop, Treatment, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Treatment`].
#[derive(Clone, Debug)]
pub struct CreateTreatment {
    /// [`treatment::Name`] of a new [`Treatment`].
    pub name: treatment::Name,

    /// [`treatment::Description`] of a new [`Treatment`].
    pub description: Option<treatment::Description>,

    /// [`treatment::Price`] of a new [`Treatment`].
    pub price: treatment::Price,

    /// Usual [`appointment::Duration`] of a new [`Treatment`].
    pub duration: Option<appointment::Duration>,

    /// [`treatment::Owner`] offering a new [`Treatment`].
    pub owner: treatment::Owner,
}

impl<Db> Command<CreateTreatment> for Service<Db>
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
        > + Database<Insert<Treatment>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Treatment;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateTreatment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateTreatment {
            name,
            description,
            price,
            duration,
            owner,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        match owner {
            treatment::Owner::Shop(id) => drop(
                tx.execute(Select(By::<Option<Shop>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::ShopNotExists(id))
                    .map_err(tracerr::wrap!())?,
            ),
            treatment::Owner::Barber(id) => {
                let barber = tx
                    .execute(Select(By::<Option<User>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::BarberNotExists(id))
                    .map_err(tracerr::wrap!())?;
                if !barber.is_barber() {
                    return Err(tracerr::new!(E::NotBarber(id)));
                }
            }
        }

        let treatment = Treatment {
            id: treatment::Id::new(),
            name,
            description,
            price,
            duration,
            owner,
            created_at: DateTime::now().coerce(),
        };
        tx.execute(Insert(treatment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(treatment)
    }
}

/// Error of [`CreateTreatment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Barber [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    BarberNotExists(#[error(not(source))] user::Id),

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
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{CreateTreatment, ExecutionError};
    use crate::{
        command::Command as _,
        domain::{appointment, shop, treatment, user},
        infra::database::Memory,
        test_support::{service, shop, user},
    };

    fn cmd(owner: treatment::Owner) -> CreateTreatment {
        CreateTreatment {
            name: treatment::Name::new("Beard trim").unwrap(),
            description: None,
            price: treatment::Price::new(Decimal::new(1500, 2)).unwrap(),
            duration: appointment::Duration::from_minutes(20),
            owner,
        }
    }

    #[tokio::test]
    async fn creates_shop_and_personal_treatments() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let shop = shop(&db, &owner).await;
        let barber = user(&db, user::Role::Barber).await;

        let of_shop = svc
            .execute(cmd(treatment::Owner::Shop(shop.id)))
            .await
            .unwrap();
        let personal = svc
            .execute(cmd(treatment::Owner::Barber(barber.id)))
            .await
            .unwrap();

        assert_eq!(of_shop.owner.shop_id(), Some(shop.id));
        assert_eq!(personal.owner.barber_id(), Some(barber.id));
        assert_eq!(personal.duration.map(|d| d.minutes()), Some(20));
    }

    #[tokio::test]
    async fn rejects_unknown_owners() {
        let db = Memory::new();
        let svc = service(db.clone());
        let client = user(&db, user::Role::Client).await;

        let no_shop = svc
            .execute(cmd(treatment::Owner::Shop(shop::Id::new())))
            .await
            .unwrap_err();
        let not_barber = svc
            .execute(cmd(treatment::Owner::Barber(client.id)))
            .await
            .unwrap_err();

        assert!(matches!(no_shop.as_ref(), ExecutionError::ShopNotExists(_)));
        assert!(matches!(not_barber.as_ref(), ExecutionError::NotBarber(_)));
    }
}
