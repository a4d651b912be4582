//! [`Session`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, FromStr};
use itertools::Itertools as _;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rand::Rng as _;

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Authenticated session of a [`User`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Session {
    /// [`Token`] identifying this [`Session`].
    pub token: Token,

    /// ID of the [`User`] this [`Session`] belongs to.
    pub user_id: user::Id,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: ExpirationDateTime,
}

impl Session {
    /// Indicates whether this [`Session`] is expired at the provided moment.
    #[must_use]
    pub fn is_expired_at(&self, now: ExpirationDateTime) -> bool {
        self.expires_at <= now
    }

    /// Prolongs this [`Session`] to expire after the provided `lifetime`.
    pub fn prolong(&mut self, lifetime: Duration) {
        self.expires_at = ExpirationDateTime::now() + lifetime;
    }
}

/// Opaque access token of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, FromStr, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Token(String);

impl Token {
    /// Number of random bytes in a [`Token`].
    const ENTROPY_BYTES: usize = 32;

    /// Generates a new random [`Token`] hex-encoded from
    /// [`Token::ENTROPY_BYTES`] of entropy.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; Self::ENTROPY_BYTES];
        rand::rng().fill(&mut bytes);
        Self(
            bytes
                .iter()
                .format_with("", |b, f| f(&format_args!("{b:02x}")))
                .to_string(),
        )
    }

    /// Creates a new [`Token`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`Token`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;
