//! [`Database`]-related implementations.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Uniqueness constraint guarded by a [`Database`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Constraint {
    /// Only one alive user may own an email address.
    #[display("users_email_unique")]
    UserEmail,

    /// Only one active appointment may start at the same time with the same
    /// barber.
    #[display("appointments_slot_unique")]
    AppointmentSlot,
}

impl Constraint {
    /// All the [`Constraint`]s.
    pub const ALL: [Self; 2] = [Self::UserEmail, Self::AppointmentSlot];

    /// Returns the name of this [`Constraint`] in the database schema.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UserEmail => "users_email_unique",
            Self::AppointmentSlot => "appointments_slot_unique",
        }
    }

    /// Looks up a [`Constraint`] by its schema name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Returns the uniqueness [`Constraint`] this error reports a violation
    /// of, if any.
    #[must_use]
    pub fn violated(&self) -> Option<Constraint> {
        match self {
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(e) => e.violated(),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.violated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Constraint;

    #[test]
    fn matches_schema_names() {
        assert_eq!(
            Constraint::from_name("users_email_unique"),
            Some(Constraint::UserEmail),
        );
        assert_eq!(
            Constraint::from_name("appointments_slot_unique"),
            Some(Constraint::AppointmentSlot),
        );
        assert_eq!(Constraint::from_name("users_pkey"), None);
        for c in Constraint::ALL {
            assert_eq!(c.to_string(), c.name());
        }
    }
}
