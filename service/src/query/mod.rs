//! [`Query`] definition.

pub mod appointment;
pub mod appointments;
pub mod shop;
pub mod shops;
pub mod treatment;
pub mod treatments;
pub mod user;
pub mod users;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    infra::{database, Database},
    Service,
};

/// [`Query`] of the [`Service`].
pub use common::Handler as Query;

/// [`Query`] [`Select`]ing a `T`ype from a [`Database`].
#[derive(Clone, Copy, Debug)]
#[expect(clippy::module_name_repetitions, reason = "more readable")]
pub struct DatabaseQuery<T>(T);

impl<W, B> DatabaseQuery<By<W, B>> {
    /// Creates a new [`DatabaseQuery`] selecting a `W` by the provided `B`.
    #[must_use]
    pub fn by(by: B) -> Self {
        Self(By::new(by))
    }
}

impl<Db, W, B> Query<DatabaseQuery<By<W, B>>> for Service<Db>
where
    Db: Database<Select<By<W, B>>, Ok = W, Err = Traced<database::Error>>,
{
    type Ok = W;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        DatabaseQuery(by): DatabaseQuery<By<W, B>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(by))
            .await
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod tests {
    use super::{shops, treatments, user, Query as _};
    use crate::{
        domain::{treatment, user as u},
        infra::database::Memory,
        read,
        test_support::{service, shop, treatment, user as new_user},
    };

    #[tokio::test]
    async fn selects_from_database() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = new_user(&db, u::Role::Owner).await;
        let shop = shop(&db, &owner).await;
        let haircut = treatment(&db, &shop, Some(45)).await;

        let found = svc.execute(user::ById::by(owner.id)).await.unwrap();
        let shops = svc
            .execute(shops::List::by(read::shop::list::Filter {
                owner_id: Some(owner.id),
            }))
            .await
            .unwrap();
        let treatments = svc
            .execute(treatments::List::by(read::treatment::list::Filter {
                shop_id: Some(shop.id),
                barber_id: None,
            }))
            .await
            .unwrap();

        assert_eq!(found.map(|u| u.id), Some(owner.id));
        assert_eq!(shops.iter().map(|s| s.id).collect::<Vec<_>>(), [shop.id]);
        assert_eq!(
            treatments.iter().map(|t| t.id).collect::<Vec<treatment::Id>>(),
            [haircut.id],
        );
    }
}
