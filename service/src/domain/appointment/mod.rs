//! [`Appointment`] definitions.

pub mod slot;
pub mod status;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Shop, Treatment, User};
use crate::domain::{define_text, shop, treatment, user};

pub use self::{
    slot::{Duration, Slot},
    status::Status,
};

/// Booking of a barber's time by a client.
#[derive(Clone, Debug)]
pub struct Appointment {
    /// ID of this [`Appointment`].
    pub id: Id,

    /// [`Slot`] occupied by this [`Appointment`].
    pub slot: Slot,

    /// ID of the client [`User`] who booked this [`Appointment`].
    pub client_id: user::Id,

    /// ID of the barber [`User`] serving this [`Appointment`].
    ///
    /// [`None`] once the barber has been deleted.
    pub barber_id: Option<user::Id>,

    /// ID of the booked [`Treatment`].
    pub treatment_id: treatment::Id,

    /// ID of the [`Shop`] this [`Appointment`] takes place in.
    pub shop_id: shop::Id,

    /// [`Status`] of this [`Appointment`].
    pub status: Status,

    /// [`Notes`] left by the client.
    pub notes: Option<Notes>,

    /// [`DateTime`] when this [`Appointment`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Appointment`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Appointment {
    /// Indicates whether this [`Appointment`] holds its [`Slot`] in the
    /// schedule of the provided barber.
    #[must_use]
    pub fn occupies(&self, barber_id: user::Id) -> bool {
        self.barber_id == Some(barber_id) && self.status.occupies_slot()
    }

    /// Indicates whether this [`Appointment`] is an active one in the schedule
    /// of the provided barber and collides with the given [`Slot`].
    #[must_use]
    pub fn collides(&self, barber_id: user::Id, slot: &Slot) -> bool {
        self.occupies(barber_id) && self.slot.overlaps(slot)
    }
}

/// ID of an [`Appointment`].
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
    #[doc = "Client notes to an [`Appointment`]."]
    Notes(max_len = 2048)
}

/// [`DateTime`] when an [`Appointment`] was created.
pub type CreationDateTime = DateTimeOf<(Appointment, unit::Creation)>;

/// [`DateTime`] when an [`Appointment`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Appointment, unit::Modification)>;
