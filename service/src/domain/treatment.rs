//! [`Treatment`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Appointment, Shop, User};
use crate::domain::{appointment, define_text, shop, user};

/// Service offered by a [`Shop`] or by a barber personally (haircut, shave,
/// beard trim, etc).
#[derive(Clone, Debug)]
pub struct Treatment {
    /// ID of this [`Treatment`].
    pub id: Id,

    /// [`Name`] of this [`Treatment`].
    pub name: Name,

    /// [`Description`] of this [`Treatment`].
    pub description: Option<Description>,

    /// [`Price`] of this [`Treatment`].
    pub price: Price,

    /// Usual [`appointment::Duration`] of this [`Treatment`].
    ///
    /// Used for [`Appointment`]s not specifying their duration explicitly.
    pub duration: Option<appointment::Duration>,

    /// [`Owner`] offering this [`Treatment`].
    pub owner: Owner,

    /// [`DateTime`] when this [`Treatment`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Treatment`].
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
    #[doc = "Name of a [`Treatment`]."]
    Name(max_len = 256)
}

define_text! {
    #[doc = "Description of a [`Treatment`]."]
    Description(max_len = 4096)
}

/// Price of a [`Treatment`].
#[derive(Clone, Copy, Debug, Display, Eq, Into, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Price(Decimal);

impl Price {
    /// Creates a new [`Price`] if the given `amount` is not negative.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (!amount.is_sign_negative()).then_some(Self(amount))
    }
}

/// Owner offering a [`Treatment`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Owner {
    /// [`Treatment`] is offered by all barbers of a [`Shop`].
    Shop(shop::Id),

    /// [`Treatment`] is offered by a single barber [`User`].
    Barber(user::Id),
}

impl Owner {
    /// Returns the [`shop::Id`] of this [`Owner`], if it's a [`Shop`].
    #[must_use]
    pub fn shop_id(self) -> Option<shop::Id> {
        match self {
            Self::Shop(id) => Some(id),
            Self::Barber(_) => None,
        }
    }

    /// Returns the [`user::Id`] of this [`Owner`], if it's a barber.
    #[must_use]
    pub fn barber_id(self) -> Option<user::Id> {
        match self {
            Self::Barber(id) => Some(id),
            Self::Shop(_) => None,
        }
    }
}

/// [`DateTime`] when a [`Treatment`] was created.
pub type CreationDateTime = DateTimeOf<(Treatment, unit::Creation)>;

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Name, Price};

    #[test]
    fn rejects_negative_price() {
        assert!(Price::new(Decimal::new(-1, 2)).is_none());
        assert!(Price::new(Decimal::ZERO).is_some());
        assert!(Price::new(Decimal::new(2500, 2)).is_some());
    }

    #[test]
    fn rejects_blank_name() {
        assert!(Name::new("").is_none());
        assert!(Name::new(" Fade").is_none());
        assert!(Name::new("Skin fade").is_some());
    }
}
