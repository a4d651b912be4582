//! [`Command`] for deleting the [`Appointment`]s history of a client.

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::{appointment::Status, Appointment};
use crate::{
    domain::user,
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for hard deleting the [`Appointment`]s of a client.
#[derive(Clone, Copy, Debug)]
pub struct PurgeClientAppointments {
    /// ID of the client [`User`] whose [`Appointment`]s should be deleted.
    ///
    /// [`User`]: crate::domain::User
    pub client_id: user::Id,

    /// Whether to delete only the [`Appointment`]s in [`Status::Completed`]
    /// or [`Status::Cancelled`], keeping the rest.
    pub keep_active: bool,
}

impl<Db> Command<PurgeClientAppointments> for Service<Db>
where
    Db: Database<
        Delete<
            By<
                read::appointment::purge::Purged,
                read::appointment::purge::Selector,
            >,
        >,
        Ok = read::appointment::purge::Purged,
        Err = Traced<database::Error>,
    >,
{
    /// Number of the deleted [`Appointment`]s.
    type Ok = usize;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: PurgeClientAppointments,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let PurgeClientAppointments {
            client_id,
            keep_active,
        } = cmd;

        let purged = self
            .database()
            .execute(Delete(
                By::<read::appointment::purge::Purged, _>::new(
                    read::appointment::purge::Selector {
                        client_id,
                        keep_active,
                    },
                ),
            ))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::debug!(
            "Deleted {} `Appointment`s of client `{client_id}`",
            purged.len(),
        );

        Ok(purged.len())
    }
}

/// Error of [`PurgeClientAppointments`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
