//! [`User`] read model definition.

use crate::domain::{shop, user, User};

/// Public profile of a [`User`].
///
/// Never exposes the [`user::PasswordHash`].
#[derive(Clone, Debug)]
pub struct Profile {
    /// ID of the [`User`].
    pub id: user::Id,

    /// [`user::Name`] of the [`User`].
    pub name: user::Name,

    /// [`user::Email`] of the [`User`].
    pub email: user::Email,

    /// [`user::Phone`] of the [`User`].
    pub phone: Option<user::Phone>,

    /// [`user::Role`] of the [`User`].
    pub role: user::Role,

    /// ID of the [`Shop`] the [`User`] works at, if any.
    ///
    /// [`Shop`]: crate::domain::Shop
    pub shop_id: Option<shop::Id>,

    /// [`user::Specialty`]s of the [`User`].
    pub specialties: Vec<user::Specialty>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        let User {
            id,
            name,
            email,
            password_hash: _,
            phone,
            role,
            shop_id,
            specialties,
            created_at: _,
            deleted_at: _,
        } = user;
        Self {
            id,
            name,
            email,
            phone,
            role,
            shop_id,
            specialties,
        }
    }
}

pub mod list {
    //! [`User`]s list definitions.
    //!
    //! [`User`]: crate::domain::User

    use crate::domain::{shop, user};
    #[cfg(doc)]
    use crate::domain::{Shop, User};

    /// Filter of a [`User`]s list.
    ///
    /// Present criteria are combined with `AND`. Deleted [`User`]s are never
    /// listed.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// [`user::Role`] of the listed [`User`]s.
        pub role: Option<user::Role>,

        /// ID of the [`Shop`] the listed [`User`]s work at.
        pub shop_id: Option<shop::Id>,
    }
}
