//! [`Treatment`] read model definitions.
//!
//! [`Treatment`]: crate::domain::Treatment

pub mod list {
    //! [`Treatment`]s list definitions.

    use crate::domain::{shop, user};
    #[cfg(doc)]
    use crate::domain::{Shop, Treatment};

    /// Filter of a [`Treatment`]s list.
    ///
    /// Both criteria are combined with `OR`: a barber's list includes the
    /// [`Treatment`]s of the [`Shop`] they work at, if requested.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the [`Shop`] offering [`Treatment`]s.
        pub shop_id: Option<shop::Id>,

        /// ID of the barber offering [`Treatment`]s personally.
        pub barber_id: Option<user::Id>,
    }
}
