//! [`Database`] implementations of the [`Memory`] database.

use std::cmp::Reverse;

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{
        appointment, shop, treatment,
        user::{self, session, Session},
        Appointment, Shop, Treatment, User,
    },
    infra::{
        database::{self, Constraint},
        Database,
    },
    read,
};

use super::{ensure, LockKey, Memory, State, Storage};

impl State {
    /// Checks whether the [`user::Email`] of the provided [`User`] is not
    /// owned by another alive [`User`].
    fn email_is_free(&self, user: &User) -> bool {
        user.deleted_at.is_some()
            || !self.users.values().any(|u| {
                u.id != user.id && u.deleted_at.is_none() && u.email == user.email
            })
    }

    /// Checks whether no other active [`Appointment`] of the same barber
    /// starts at the same time as the provided one.
    fn slot_is_free(&self, appointment: &Appointment) -> bool {
        let Some(barber_id) = appointment.barber_id else {
            return true;
        };
        !appointment.status.occupies_slot()
            || !self.appointments.values().any(|a| {
                a.id != appointment.id
                    && a.occupies(barber_id)
                    && a.slot.date == appointment.slot.date
                    && a.slot.time == appointment.slot.time
            })
    }

    /// Returns the alive [`User`] with the provided ID, if any.
    fn alive_user(&self, id: user::Id) -> Option<&User> {
        self.users.get(&id).filter(|u| u.deleted_at.is_none())
    }

    /// Denormalizes the provided [`Appointment`] into [`read::appointment::Details`].
    fn details(&self, appointment: Appointment) -> read::appointment::Details {
        let name_of = |id: user::Id| self.users.get(&id).map(|u| u.name.clone());
        read::appointment::Details {
            client_name: name_of(appointment.client_id),
            barber_name: appointment.barber_id.and_then(name_of),
            treatment_name: self
                .treatments
                .get(&appointment.treatment_id)
                .map(|t| t.name.clone()),
            shop_name: self
                .shops
                .get(&appointment.shop_id)
                .map(|s| s.name.clone()),
            appointment,
        }
    }
}

impl<C: Storage> Database<Select<By<Option<User>, user::Id>>> for Memory<C> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.alive_user(id).cloned()).await
    }
}

impl<C: Storage> Database<Select<By<Option<User>, user::Email>>> for Memory<C> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        self.read(|s| {
            s.users
                .values()
                .find(|u| u.deleted_at.is_none() && u.email == email)
                .cloned()
        })
        .await
    }
}

impl<C: Storage> Database<Select<By<Option<read::user::Profile>, user::Id>>>
    for Memory<C>
{
    type Ok = Option<read::user::Profile>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<read::user::Profile>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.alive_user(id).cloned().map(Into::into))
            .await
    }
}

impl<C: Storage>
    Database<Select<By<Vec<read::user::Profile>, read::user::list::Filter>>>
    for Memory<C>
{
    type Ok = Vec<read::user::Profile>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::user::Profile>, read::user::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::user::list::Filter { role, shop_id } = by.into_inner();
        let mut users = self
            .read(|s| {
                s.users
                    .values()
                    .filter(|u| {
                        u.deleted_at.is_none()
                            && role.map_or(true, |r| u.role == r)
                            && shop_id.map_or(true, |id| u.shop_id == Some(id))
                    })
                    .cloned()
                    .map(read::user::Profile::from)
                    .collect::<Vec<_>>()
            })
            .await?;
        users.sort_by_key(|u| u.name.to_string());
        Ok(users)
    }
}

impl<C: Storage> Database<Insert<User>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(user)).await.map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Update<User>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(move |s| {
            ensure(s.email_is_free(&user), Constraint::UserEmail)?;
            drop(s.users.insert(user.id, user.clone()));
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Lock<By<User, user::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(LockKey::User(by.into_inner())).await;
        Ok(())
    }
}

impl<C: Storage> Database<Select<By<Option<Session>, session::Token>>>
    for Memory<C>
{
    type Ok = Option<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Session>, session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();
        self.read(|s| s.sessions.get(&token).cloned()).await
    }
}

impl<C: Storage> Database<Insert<Session>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(session): Insert<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(move |s| {
            drop(s.sessions.insert(session.token.clone(), session.clone()));
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Update<Session>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(session): Update<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(move |s| {
            if let Some(existing) = s.sessions.get_mut(&session.token) {
                existing.expires_at = session.expires_at;
            }
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Delete<By<Session, session::Token>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();
        self.write(move |s| {
            drop(s.sessions.remove(&token));
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Delete<By<Session, user::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        self.write(move |s| {
            s.sessions.retain(|_, session| session.user_id != user_id);
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Delete<By<Session, session::ExpirationDateTime>>>
    for Memory<C>
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();
        self.write(move |s| {
            s.sessions.retain(|_, session| !session.is_expired_at(deadline));
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Select<By<Option<Shop>, shop::Id>>> for Memory<C> {
    type Ok = Option<Shop>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Shop>, shop::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.shops.get(&id).cloned()).await
    }
}

impl<C: Storage> Database<Select<By<Vec<Shop>, read::shop::list::Filter>>>
    for Memory<C>
{
    type Ok = Vec<Shop>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Shop>, read::shop::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::shop::list::Filter { owner_id } = by.into_inner();
        let mut shops = self
            .read(|s| {
                s.shops
                    .values()
                    .filter(|shop| owner_id.map_or(true, |id| shop.owner_id == id))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await?;
        shops.sort_by_key(|s| s.name.to_string());
        Ok(shops)
    }
}

impl<C: Storage> Database<Insert<Shop>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(shop): Insert<Shop>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(shop)).await.map_err(tracerr::wrap!())
    }
}

impl<C: Storage> Database<Update<Shop>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(shop): Update<Shop>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(move |s| {
            drop(s.shops.insert(shop.id, shop.clone()));
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Lock<By<Shop, shop::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Shop, shop::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(LockKey::Shop(by.into_inner())).await;
        Ok(())
    }
}

impl<C: Storage> Database<Delete<By<Shop, shop::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Shop, shop::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(move |s| {
            for u in s.users.values_mut() {
                if u.shop_id == Some(id) {
                    u.shop_id = None;
                }
            }
            s.treatments.retain(|_, t| t.owner.shop_id() != Some(id));
            drop(s.shops.remove(&id));
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Select<By<Option<Treatment>, treatment::Id>>>
    for Memory<C>
{
    type Ok = Option<Treatment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Treatment>, treatment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.treatments.get(&id).cloned()).await
    }
}

impl<C: Storage>
    Database<Select<By<Vec<Treatment>, read::treatment::list::Filter>>>
    for Memory<C>
{
    type Ok = Vec<Treatment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Treatment>, read::treatment::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::treatment::list::Filter { shop_id, barber_id } =
            by.into_inner();
        let unfiltered = shop_id.is_none() && barber_id.is_none();
        let mut treatments = self
            .read(|s| {
                s.treatments
                    .values()
                    .filter(|t| {
                        unfiltered
                            || (shop_id.is_some() && t.owner.shop_id() == shop_id)
                            || (barber_id.is_some()
                                && t.owner.barber_id() == barber_id)
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await?;
        treatments.sort_by_key(|t| t.name.to_string());
        Ok(treatments)
    }
}

impl<C: Storage> Database<Insert<Treatment>> for Memory<C> {
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

impl<C: Storage> Database<Update<Treatment>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(treatment): Update<Treatment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(move |s| {
            drop(s.treatments.insert(treatment.id, treatment.clone()));
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Lock<By<Treatment, treatment::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Treatment, treatment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(LockKey::Treatment(by.into_inner())).await;
        Ok(())
    }
}

impl<C: Storage> Database<Delete<By<Treatment, treatment::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Treatment, treatment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(move |s| {
            drop(s.treatments.remove(&id));
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Select<By<Option<Appointment>, appointment::Id>>>
    for Memory<C>
{
    type Ok = Option<Appointment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Appointment>, appointment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.appointments.get(&id).cloned()).await
    }
}

impl<C: Storage> Database<Insert<Appointment>> for Memory<C> {
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

impl<C: Storage> Database<Update<Appointment>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(appointment): Update<Appointment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(move |s| {
            ensure(s.slot_is_free(&appointment), Constraint::AppointmentSlot)?;
            drop(s.appointments.insert(appointment.id, appointment.clone()));
            Ok(())
        })
        .await
    }
}

impl<C: Storage> Database<Lock<By<Appointment, appointment::Id>>>
    for Memory<C>
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Appointment, appointment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(LockKey::Appointment(by.into_inner())).await;
        Ok(())
    }
}

impl<C: Storage> Database<Lock<By<read::appointment::ScheduleLock, user::Id>>>
    for Memory<C>
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<read::appointment::ScheduleLock, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(LockKey::Schedule(by.into_inner())).await;
        Ok(())
    }
}

impl<C: Storage>
    Database<
        Select<
            By<
                read::appointment::Schedule,
                read::appointment::schedule::Selector,
            >,
        >,
    > for Memory<C>
{
    type Ok = read::appointment::Schedule;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::appointment::Schedule,
                read::appointment::schedule::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();
        self.read(|s| {
            read::appointment::Schedule(
                s.appointments
                    .values()
                    .filter(|a| {
                        a.occupies(selector.barber_id)
                            && selector.contains(a.slot.date)
                    })
                    .cloned()
                    .collect(),
            )
        })
        .await
    }
}

impl<C: Storage>
    Database<
        Select<By<read::appointment::Count, read::appointment::Reference>>,
    > for Memory<C>
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

        let reference = by.into_inner();
        self.read(|s| {
            let count = s
                .appointments
                .values()
                .filter(|a| match reference {
                    R::Shop(id) => a.shop_id == id,
                    R::Treatment(id) => a.treatment_id == id,
                })
                .count();
            read::appointment::Count(u64::try_from(count).unwrap_or(u64::MAX))
        })
        .await
    }
}

impl<C: Storage>
    Database<Select<By<Option<read::appointment::Details>, appointment::Id>>>
    for Memory<C>
{
    type Ok = Option<read::appointment::Details>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<read::appointment::Details>, appointment::Id>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.appointments.get(&id).cloned().map(|a| s.details(a)))
            .await
    }
}

impl<C: Storage>
    Database<
        Select<
            By<Vec<read::appointment::Details>, read::appointment::list::Filter>,
        >,
    > for Memory<C>
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
        let mut list = self
            .read(|s| {
                s.appointments
                    .values()
                    .filter(|a| {
                        client_id.map_or(true, |id| a.client_id == id)
                            && barber_id.map_or(true, |id| a.barber_id == Some(id))
                            && shop_id.map_or(true, |id| a.shop_id == id)
                    })
                    .cloned()
                    .map(|a| s.details(a))
                    .collect::<Vec<_>>()
            })
            .await?;
        list.sort_by_key(|d| Reverse((d.slot.date, d.slot.time, d.created_at)));
        Ok(list)
    }
}

impl<C: Storage>
    Database<
        Delete<
            By<
                read::appointment::purge::Purged,
                read::appointment::purge::Selector,
            >,
        >,
    > for Memory<C>
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
        let purged = self
            .read(|s| {
                s.appointments
                    .values()
                    .filter(|a| {
                        a.client_id == client_id
                            && (!keep_active
                                || matches!(
                                    a.status,
                                    appointment::Status::Completed
                                        | appointment::Status::Cancelled,
                                ))
                    })
                    .map(|a| a.id)
                    .collect::<Vec<_>>()
            })
            .await?;
        let ids = purged.clone();
        self.write(move |s| {
            for id in &ids {
                drop(s.appointments.remove(id));
            }
            Ok(())
        })
        .await?;
        Ok(purged)
    }
}

impl<C: Storage> Database<Update<read::appointment::BarberUnassignment>>
    for Memory<C>
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
        self.write(move |s| {
            for a in s.appointments.values_mut() {
                if a.barber_id == Some(barber_id) && !a.status.is_terminal() {
                    a.barber_id = None;
                    a.updated_at = updated_at;
                }
            }
            Ok(())
        })
        .await
    }
}
