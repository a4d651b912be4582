//! [`Appointment`] read model definitions.

#[cfg(doc)]
use common::Date;
use derive_more::Deref;

use crate::domain::{appointment, shop, treatment, user, Appointment};

/// [`Appointment`] with the names of the entities it references.
#[derive(Clone, Debug, Deref)]
pub struct Details {
    /// The [`Appointment`] itself.
    #[deref]
    pub appointment: Appointment,

    /// [`user::Name`] of the client.
    pub client_name: Option<user::Name>,

    /// [`user::Name`] of the barber, if still assigned.
    pub barber_name: Option<user::Name>,

    /// [`treatment::Name`] of the booked treatment, if it still exists.
    pub treatment_name: Option<treatment::Name>,

    /// [`shop::Name`] of the shop.
    pub shop_name: Option<shop::Name>,
}

/// Active [`Appointment`]s of a barber around some [`Date`].
#[derive(Clone, Debug, Default)]
pub struct Schedule(pub Vec<Appointment>);

impl Schedule {
    /// Returns the first [`Appointment`] in this [`Schedule`] colliding with
    /// the provided [`appointment::Slot`] of the barber.
    ///
    /// The `exclude`d [`Appointment`] never collides, so an [`Appointment`]
    /// can be moved within its own window.
    #[must_use]
    pub fn collision(
        &self,
        barber_id: user::Id,
        slot: &appointment::Slot,
        exclude: Option<appointment::Id>,
    ) -> Option<&Appointment> {
        self.0
            .iter()
            .filter(|a| Some(a.id) != exclude)
            .find(|a| a.collides(barber_id, slot))
    }
}

pub mod schedule {
    //! [`Schedule`] definitions.

    use common::Date;

    use crate::domain::user;
    #[cfg(doc)]
    use crate::domain::Appointment;

    #[cfg(doc)]
    use super::Schedule;

    /// Selector of a barber's [`Schedule`].
    ///
    /// Selects the active [`Appointment`]s of the barber starting on the
    /// [`Date`] itself or on the adjacent days, so windows crossing midnight
    /// are caught.
    #[derive(Clone, Copy, Debug)]
    pub struct Selector {
        /// ID of the barber.
        pub barber_id: user::Id,

        /// [`Date`] in the middle of the selected range.
        pub date: Date,
    }

    impl Selector {
        /// Returns the inclusive range of [`Date`]s to select.
        #[must_use]
        pub fn range(&self) -> (Date, Date) {
            (
                self.date.previous().unwrap_or(self.date),
                self.date.next().unwrap_or(self.date),
            )
        }

        /// Indicates whether the provided [`Date`] is selected.
        #[must_use]
        pub fn contains(&self, date: Date) -> bool {
            let (from, to) = self.range();
            from <= date && date <= to
        }
    }
}

/// Lock of a barber's [`Schedule`], serializing bookings of the barber.
#[derive(Clone, Copy, Debug)]
pub struct ScheduleLock;

pub mod list {
    //! [`Appointment`]s list definitions.

    use crate::domain::{shop, user};
    #[cfg(doc)]
    use crate::domain::Appointment;

    /// Filter of an [`Appointment`]s list.
    ///
    /// Present criteria are combined with `AND`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the client who booked [`Appointment`]s.
        pub client_id: Option<user::Id>,

        /// ID of the barber serving [`Appointment`]s.
        pub barber_id: Option<user::Id>,

        /// ID of the shop [`Appointment`]s take place in.
        pub shop_id: Option<shop::Id>,
    }
}

pub mod purge {
    //! [`Appointment`]s purge definitions.

    use crate::domain::{appointment, user};
    #[cfg(doc)]
    use crate::domain::{appointment::Status, Appointment};

    /// Selector of the client's [`Appointment`]s to delete.
    #[derive(Clone, Copy, Debug)]
    pub struct Selector {
        /// ID of the client.
        pub client_id: user::Id,

        /// Whether to delete only the [`Appointment`]s in
        /// [`Status::Completed`] or [`Status::Cancelled`].
        pub keep_active: bool,
    }

    /// IDs of the deleted [`Appointment`]s.
    pub type Purged = Vec<appointment::Id>;
}

/// Entity [`Appointment`]s may reference.
#[derive(Clone, Copy, Debug)]
pub enum Reference {
    /// [`Shop`] the [`Appointment`]s take place in.
    ///
    /// [`Shop`]: crate::domain::Shop
    Shop(shop::Id),

    /// [`Treatment`] booked by the [`Appointment`]s.
    ///
    /// [`Treatment`]: crate::domain::Treatment
    Treatment(treatment::Id),
}

/// Number of [`Appointment`]s with some [`Reference`], finished ones included.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Count(pub u64);

/// Unassignment of a deleted barber from their unfinished [`Appointment`]s.
#[derive(Clone, Copy, Debug)]
pub struct BarberUnassignment {
    /// ID of the barber to unassign.
    pub barber_id: user::Id,

    /// [`appointment::ModificationDateTime`] to set on the affected
    /// [`Appointment`]s.
    pub updated_at: appointment::ModificationDateTime,
}
