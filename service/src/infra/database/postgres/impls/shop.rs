//! [`Shop`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{shop, user, Shop},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Reads a [`Shop`] from the provided [`Row`].
fn from_row(row: &Row) -> Shop {
    Shop {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        city: row.get("city"),
        phone: row.get("phone"),
        owner_id: row.get("owner_id"),
        schedule: row.get("schedule"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Shop>, shop::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Shop>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Shop>, shop::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: shop::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, name, address, city, phone, \
                   owner_id, schedule, created_at \
            FROM shops \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Shop>, read::shop::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Shop>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Shop>, read::shop::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::shop::list::Filter { owner_id } = by.into_inner();
        // Avoid subtle change for SQL.
        let owner_id: Option<user::Id> = owner_id;

        const SQL: &str = "\
            SELECT id, name, address, city, phone, \
                   owner_id, schedule, created_at \
            FROM shops \
            WHERE $1::UUID IS NULL OR owner_id = $1::UUID \
            ORDER BY name ASC";
        Ok(self
            .query(SQL, &[&owner_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Shop>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Shop>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(shop): Insert<Shop>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(shop)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Shop>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(shop): Update<Shop>,
    ) -> Result<Self::Ok, Self::Err> {
        let Shop {
            id,
            name,
            address,
            city,
            phone,
            owner_id,
            schedule,
            created_at,
        } = shop;

        const SQL: &str = "\
            INSERT INTO shops (\
                id, name, address, city, phone, \
                owner_id, schedule, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, $5::VARCHAR, \
                $6::UUID, $7::VARCHAR, $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                address = EXCLUDED.address, \
                city = EXCLUDED.city, \
                phone = EXCLUDED.phone, \
                owner_id = EXCLUDED.owner_id, \
                schedule = EXCLUDED.schedule";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &address,
                &city,
                &phone,
                &owner_id,
                &schedule,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Shop, shop::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Shop, shop::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: shop::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO shops_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Shop, shop::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    /// Deletes the [`Shop`] along with its [`Treatment`]s, releasing the
    /// barbers working at it.
    ///
    /// [`Treatment`]: crate::domain::Treatment
    async fn execute(
        &self,
        Delete(by): Delete<By<Shop, shop::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: shop::Id = by.into_inner();

        for sql in [
            "UPDATE users SET shop_id = NULL WHERE shop_id = $1::UUID",
            "DELETE FROM treatments WHERE shop_id = $1::UUID",
            "DELETE FROM shops WHERE id = $1::UUID",
        ] {
            self.exec(sql, &[&id])
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }
        Ok(())
    }
}
