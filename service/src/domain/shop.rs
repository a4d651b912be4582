//! [`Shop`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::User;
use crate::domain::{define_text, user};

/// Barbershop.
///
/// Barbers working at a [`Shop`] are the [`User`]s referencing it.
#[derive(Clone, Debug)]
pub struct Shop {
    /// ID of this [`Shop`].
    pub id: Id,

    /// [`Name`] of this [`Shop`].
    pub name: Name,

    /// [`Address`] of this [`Shop`].
    pub address: Address,

    /// [`City`] of this [`Shop`].
    pub city: City,

    /// [`user::Phone`] of this [`Shop`].
    pub phone: Option<user::Phone>,

    /// ID of the [`User`] owning this [`Shop`].
    pub owner_id: user::Id,

    /// Opening hours of this [`Shop`].
    pub schedule: Option<Schedule>,

    /// [`DateTime`] when this [`Shop`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Shop`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_text! {
    #[doc = "Name of a [`Shop`]."]
    Name(max_len = 256)
}

define_text! {
    #[doc = "Street address of a [`Shop`]."]
    Address(max_len = 512)
}

define_text! {
    #[doc = "City a [`Shop`] is located in."]
    City(max_len = 128)
}

define_text! {
    #[doc = "Human-readable opening hours of a [`Shop`] (e.g. `Mon-Fri 9-18`)."]
    Schedule(max_len = 1024)
}

/// [`DateTime`] when a [`Shop`] was created.
pub type CreationDateTime = DateTimeOf<(Shop, unit::Creation)>;
