//! [`Appointment`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{appointment, user, Appointment},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `appointments` table.
const COLUMNS: &str = "\
    a.id, a.date, a.time, a.duration, \
    a.client_id, a.barber_id, a.treatment_id, a.shop_id, \
    a.status, a.notes, \
    a.created_at, a.updated_at";

/// Joins resolving the names referenced by [`read::appointment::Details`].
const DETAILS_JOINS: &str = "\
    LEFT JOIN users AS c ON c.id = a.client_id \
    LEFT JOIN users AS b ON b.id = a.barber_id \
    LEFT JOIN treatments AS t ON t.id = a.treatment_id \
    LEFT JOIN shops AS s ON s.id = a.shop_id";

/// Names selected by [`DETAILS_JOINS`].
const DETAILS_COLUMNS: &str = "\
    c.name AS client_name, b.name AS barber_name, \
    t.name AS treatment_name, s.name AS shop_name";

/// The only [`appointment::Status`] of [`Appointment`]s not occupying their
/// slots, as the `appointments_slot_unique` index sees it.
const SLOT_FREEING_STATUS: appointment::Status = appointment::Status::Cancelled;

/// Builds the SQL selecting a barber's [`read::appointment::Schedule`].
///
/// Binds the barber ID, [`SLOT_FREEING_STATUS`] and the date range.
fn schedule_sql() -> String {
    format!(
        "SELECT {COLUMNS} \
         FROM appointments AS a \
         WHERE a.barber_id = $1::UUID \
           AND a.status <> $2::INT2 \
           AND a.date BETWEEN $3::DATE AND $4::DATE \
         ORDER BY a.date ASC, a.time ASC",
    )
}

/// Reads an [`Appointment`] from the provided [`Row`] containing [`COLUMNS`].
fn from_row(row: &Row) -> Appointment {
    Appointment {
        id: row.get("id"),
        slot: appointment::Slot {
            date: row.get("date"),
            time: row.get("time"),
            duration: u16::try_from(row.get::<_, i32>("duration"))
                .ok()
                .and_then(appointment::Duration::from_minutes)
                .expect("`duration` overflow"),
        },
        client_id: row.get("client_id"),
        barber_id: row.get("barber_id"),
        treatment_id: row.get("treatment_id"),
        shop_id: row.get("shop_id"),
        status: row.get("status"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Reads [`read::appointment::Details`] from the provided [`Row`] containing
/// [`COLUMNS`] and [`DETAILS_COLUMNS`].
fn details_from_row(row: &Row) -> read::appointment::Details {
    read::appointment::Details {
        appointment: from_row(row),
        client_name: row.get("client_name"),
        barber_name: row.get("barber_name"),
        treatment_name: row.get("treatment_name"),
        shop_name: row.get("shop_name"),
    }
}

impl<C> Database<Select<By<Option<Appointment>, appointment::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Appointment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Appointment>, appointment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: appointment::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM appointments AS a \
             WHERE a.id = $1::UUID \
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

impl<C> Database<Insert<Appointment>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Appointment>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(appointment): Insert<Appointment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(appointment))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Appointment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(appointment): Update<Appointment>,
    ) -> Result<Self::Ok, Self::Err> {
        let Appointment {
            id,
            slot:
                appointment::Slot {
                    date,
                    time,
                    duration,
                },
            client_id,
            barber_id,
            treatment_id,
            shop_id,
            status,
            notes,
            created_at,
            updated_at,
        } = appointment;

        let duration = i32::from(duration.minutes());

        const SQL: &str = "\
            INSERT INTO appointments (\
                id, date, time, duration, \
                client_id, barber_id, treatment_id, shop_id, \
                status, notes, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::DATE, $3::TIME, $4::INT4, \
                $5::UUID, $6::UUID, $7::UUID, $8::UUID, \
                $9::INT2, $10::VARCHAR, \
                $11::TIMESTAMPTZ, $12::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET date = EXCLUDED.date, \
                time = EXCLUDED.time, \
                duration = EXCLUDED.duration, \
                client_id = EXCLUDED.client_id, \
                barber_id = EXCLUDED.barber_id, \
                treatment_id = EXCLUDED.treatment_id, \
                shop_id = EXCLUDED.shop_id, \
                status = EXCLUDED.status, \
                notes = EXCLUDED.notes, \
                created_at = EXCLUDED.created_at, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &date,
                &time,
                &duration,
                &client_id,
                &barber_id,
                &treatment_id,
                &shop_id,
                &status,
                &notes,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Appointment, appointment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Appointment, appointment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: appointment::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO appointments_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<read::appointment::ScheduleLock, user::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<read::appointment::ScheduleLock, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let barber_id: user::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO barbers_schedule_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&barber_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<
        Select<
            By<read::appointment::Schedule, read::appointment::schedule::Selector>,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::appointment::Schedule;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::appointment::Schedule, read::appointment::schedule::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();
        let (from, to) = selector.range();

        Ok(read::appointment::Schedule(
            self.query(
                &schedule_sql(),
                &[&selector.barber_id, &SLOT_FREEING_STATUS, &from, &to],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect(),
        ))
    }
}

impl<C>
    Database<
        Select<By<read::appointment::Count, read::appointment::Reference>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::appointment::Count;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::appointment::Count, read::appointment::Reference>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        use read::appointment::Reference as R;

        let (shop_id, treatment_id) = match by.into_inner() {
            R::Shop(id) => (Some(id), None),
            R::Treatment(id) => (None, Some(id)),
        };

        const SQL: &str = "\
            SELECT COUNT(*) AS count \
            FROM appointments \
            WHERE shop_id = $1::UUID \
               OR treatment_id = $2::UUID";
        let count: i64 = self
            .query_opt(SQL, &[&shop_id, &treatment_id])
            .await
            .map_err(tracerr::wrap!())?
            .map_or(0, |row| row.get("count"));
        Ok(read::appointment::Count(u64::try_from(count).unwrap_or_default()))
    }
}

impl<C>
    Database<Select<By<Option<read::appointment::Details>, appointment::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<read::appointment::Details>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<read::appointment::Details>, appointment::Id>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: appointment::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS}, {DETAILS_COLUMNS} \
             FROM appointments AS a \
             {DETAILS_JOINS} \
             WHERE a.id = $1::UUID \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(details_from_row))
    }
}

impl<C>
    Database<
        Select<
            By<Vec<read::appointment::Details>, read::appointment::list::Filter>,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<read::appointment::Details>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::appointment::Details>, read::appointment::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::appointment::list::Filter {
            client_id,
            barber_id,
            shop_id,
        } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS}, {DETAILS_COLUMNS} \
             FROM appointments AS a \
             {DETAILS_JOINS} \
             WHERE ($1::UUID IS NULL OR a.client_id = $1::UUID) \
               AND ($2::UUID IS NULL OR a.barber_id = $2::UUID) \
               AND ($3::UUID IS NULL OR a.shop_id = $3::UUID) \
             ORDER BY a.date DESC, a.time DESC, a.created_at DESC",
        );
        Ok(self
            .query(&sql, &[&client_id, &barber_id, &shop_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(details_from_row)
            .collect())
    }
}

impl<C>
    Database<
        Delete<
            By<
                read::appointment::purge::Purged,
                read::appointment::purge::Selector,
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::appointment::purge::Purged;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<
            By<
                read::appointment::purge::Purged,
                read::appointment::purge::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::appointment::purge::Selector {
            client_id,
            keep_active,
        } = by.into_inner();

        const SQL: &str = "\
            DELETE FROM appointments \
            WHERE client_id = $1::UUID \
              AND (NOT $2::BOOL OR status IN ($3::INT2, $4::INT2)) \
            RETURNING id";
        Ok(self
            .query(
                SQL,
                &[
                    &client_id,
                    &keep_active,
                    &appointment::Status::Completed,
                    &appointment::Status::Cancelled,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| row.get("id"))
            .collect())
    }
}

impl<C> Database<Update<read::appointment::BarberUnassignment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(unassignment): Update<read::appointment::BarberUnassignment>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::appointment::BarberUnassignment {
            barber_id,
            updated_at,
        } = unassignment;

        const SQL: &str = "\
            UPDATE appointments \
            SET barber_id = NULL, \
                updated_at = $2::TIMESTAMPTZ \
            WHERE barber_id = $1::UUID \
              AND status NOT IN ($3::INT2, $4::INT2, $5::INT2)";
        self.exec(
            SQL,
            &[
                &barber_id,
                &updated_at,
                &appointment::Status::Completed,
                &appointment::Status::Cancelled,
                &appointment::Status::NoShow,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::{schedule_sql, SLOT_FREEING_STATUS};
    use crate::domain::appointment;

    #[test]
    fn schedule_skips_only_slot_freeing_status() {
        let sql = schedule_sql();

        assert!(sql.contains("a.status <> $2::INT2"), "{sql}");
        assert!(!sql.contains(" IN ("), "{sql}");
        for s in (0..=u8::MAX).filter_map(|v| appointment::Status::try_from(v).ok())
        {
            assert_eq!(s != SLOT_FREEING_STATUS, s.occupies_slot(), "{s}");
        }
    }

    #[test]
    fn slot_index_skips_the_same_status() {
        let schema = include_str!("../../../../../../migrations/V1__init.sql");
        let index = schema
            .split(';')
            .find(|stmt| stmt.contains("appointments_slot_unique"))
            .unwrap();

        assert!(
            index.contains(&format!("status <> {}", SLOT_FREEING_STATUS.u8())),
            "{index}",
        );
    }
}
