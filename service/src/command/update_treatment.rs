//! [`Command`] for editing a [`Treatment`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{appointment, treatment, Treatment},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for editing a [`Treatment`].
///
/// Fields left as [`None`] keep their current values. The
/// [`treatment::Owner`] can't be changed.
#[derive(Clone, Debug, Default)]
pub struct UpdateTreatment {
    /// ID of the [`Treatment`] to edit.
    pub treatment_id: treatment::Id,

    /// New [`treatment::Name`] of the [`Treatment`].
    pub name: Option<treatment::Name>,

    /// New [`treatment::Description`], or `Some(None)` to remove it.
    pub description: Option<Option<treatment::Description>>,

    /// New [`treatment::Price`] of the [`Treatment`].
    pub price: Option<treatment::Price>,

    /// New usual [`appointment::Duration`], or `Some(None)` to remove it.
    pub duration: Option<Option<appointment::Duration>>,
}

impl<Db> Command<UpdateTreatment> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Treatment>, treatment::Id>>,
            Ok = Option<Treatment>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Treatment, treatment::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Treatment>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Treatment;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateTreatment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateTreatment {
            treatment_id,
            name,
            description,
            price,
            duration,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Treatment, _>::new(treatment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut treatment = tx
            .execute(Select(By::<Option<Treatment>, _>::new(treatment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::TreatmentNotExists(treatment_id))
            .map_err(tracerr::wrap!())?;

        if let Some(name) = name {
            treatment.name = name;
        }
        if let Some(description) = description {
            treatment.description = description;
        }
        if let Some(price) = price {
            treatment.price = price;
        }
        if let Some(duration) = duration {
            treatment.duration = duration;
        }

        tx.execute(Update(treatment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(treatment)
    }
}

/// Error of [`UpdateTreatment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Treatment`] doesn't exist.
    #[display("`Treatment(id: {_0})` does not exist")]
    TreatmentNotExists(#[error(not(source))] treatment::Id),
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ExecutionError, UpdateTreatment};
    use crate::{
        command::Command as _,
        domain::{appointment, treatment, user},
        infra::database::Memory,
        test_support::{service, shop, treatment, user},
    };

    #[tokio::test]
    async fn reprices_and_drops_duration() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let s = shop(&db, &owner).await;
        let t = treatment(&db, &s, Some(45)).await;

        let updated = svc
            .execute(UpdateTreatment {
                treatment_id: t.id,
                price: treatment::Price::new(Decimal::new(3000, 2)),
                duration: Some(None),
                ..UpdateTreatment::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.name, t.name);
        assert_eq!(updated.price.to_string(), "30.00");
        assert_eq!(updated.duration, None);
        assert_eq!(updated.owner, t.owner);
    }

    #[tokio::test]
    async fn sets_new_duration() {
        let db = Memory::new();
        let svc = service(db.clone());
        let owner = user(&db, user::Role::Owner).await;
        let s = shop(&db, &owner).await;
        let t = treatment(&db, &s, None).await;

        let updated = svc
            .execute(UpdateTreatment {
                treatment_id: t.id,
                duration: Some(appointment::Duration::from_minutes(20)),
                ..UpdateTreatment::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.duration.map(|d| d.minutes()), Some(20));
    }

    #[tokio::test]
    async fn fails_on_unknown_treatment() {
        let svc = service(Memory::new());

        let err = svc
            .execute(UpdateTreatment {
                treatment_id: treatment::Id::new(),
                ..UpdateTreatment::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::TreatmentNotExists(_),
        ));
    }
}
