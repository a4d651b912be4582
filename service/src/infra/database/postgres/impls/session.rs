//! [`Session`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Update};
use tracerr::Traced;

use crate::{
    domain::user::{self, session, Session},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Session>, session::Token>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Session>, session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        const SQL: &str = "\
            SELECT token, user_id, expires_at \
            FROM sessions \
            WHERE token = $1::VARCHAR \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&token])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Session {
                token: row.get("token"),
                user_id: row.get("user_id"),
                expires_at: row.get("expires_at"),
            }))
    }
}

impl<C> Database<Insert<Session>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(session): Insert<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        let Session {
            token,
            user_id,
            expires_at,
        } = session;

        const SQL: &str = "\
            INSERT INTO sessions (token, user_id, expires_at) \
            VALUES ($1::VARCHAR, $2::UUID, $3::TIMESTAMPTZ)";
        self.exec(SQL, &[&token, &user_id, &expires_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Session>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(session): Update<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            UPDATE sessions \
            SET expires_at = $2::TIMESTAMPTZ \
            WHERE token = $1::VARCHAR";
        self.exec(SQL, &[&session.token, &session.expires_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Session, session::Token>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE token = $1::VARCHAR";
        self.exec(SQL, &[&token])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Session, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE user_id = $1::UUID";
        self.exec(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Session, session::ExpirationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE expires_at <= $1::TIMESTAMPTZ";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
