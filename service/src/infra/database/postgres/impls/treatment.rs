//! [`Treatment`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{appointment, shop, treatment, user, Treatment},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `treatments` table.
const COLUMNS: &str = "\
    id, name, description, price, duration, \
    shop_id, barber_id, created_at";

/// Reads a [`Treatment`] from the provided [`Row`] containing [`COLUMNS`].
fn from_row(row: &Row) -> Treatment {
    let owner = match (
        row.get::<_, Option<shop::Id>>("shop_id"),
        row.get::<_, Option<user::Id>>("barber_id"),
    ) {
        (Some(id), _) => treatment::Owner::Shop(id),
        (None, Some(id)) => treatment::Owner::Barber(id),
        (None, None) => panic!("`treatments_owner_check` is violated"),
    };
    Treatment {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        duration: row
            .get::<_, Option<i32>>("duration")
            .map(|m| {
                u16::try_from(m)
                    .ok()
                    .and_then(appointment::Duration::from_minutes)
            })
            .map(|d| d.expect("`duration` overflow")),
        owner,
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Treatment>, treatment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Treatment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Treatment>, treatment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: treatment::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM treatments \
             WHERE id = $1::UUID \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Treatment>, read::treatment::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Treatment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Treatment>, read::treatment::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::treatment::list::Filter { shop_id, barber_id } =
            by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM treatments \
             WHERE ($1::UUID IS NULL AND $2::UUID IS NULL) \
                OR shop_id = $1::UUID \
                OR barber_id = $2::UUID \
             ORDER BY name ASC",
        );
        Ok(self
            .query(&sql, &[&shop_id, &barber_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Treatment>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Treatment>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(treatment): Insert<Treatment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(treatment))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Treatment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(treatment): Update<Treatment>,
    ) -> Result<Self::Ok, Self::Err> {
        let Treatment {
            id,
            name,
            description,
            price,
            duration,
            owner,
            created_at,
        } = treatment;

        let duration = duration.map(|d| i32::from(d.minutes()));
        let (shop_id, barber_id) = (owner.shop_id(), owner.barber_id());

        const SQL: &str = "\
            INSERT INTO treatments (\
                id, name, description, price, duration, \
                shop_id, barber_id, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::NUMERIC, $5::INT4, \
                $6::UUID, $7::UUID, $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                description = EXCLUDED.description, \
                price = EXCLUDED.price, \
                duration = EXCLUDED.duration, \
                shop_id = EXCLUDED.shop_id, \
                barber_id = EXCLUDED.barber_id";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &description,
                &price,
                &duration,
                &shop_id,
                &barber_id,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Treatment, treatment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Treatment, treatment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: treatment::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO treatments_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Treatment, treatment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Treatment, treatment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: treatment::Id = by.into_inner();

        const SQL: &str = "DELETE FROM treatments WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
