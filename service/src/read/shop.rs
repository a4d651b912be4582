//! [`Shop`] read model definitions.
//!
//! [`Shop`]: crate::domain::Shop

pub mod list {
    //! [`Shop`]s list definitions.

    use crate::domain::user;
    #[cfg(doc)]
    use crate::domain::Shop;

    /// Filter of a [`Shop`]s list.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the [`user::Role::Owner`] whose [`Shop`]s to list.
        pub owner_id: Option<user::Id>,
    }
}
