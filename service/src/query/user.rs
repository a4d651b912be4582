//! [`Query`] collection related to a single [`User`].

use common::operations::By;

#[cfg(doc)]
use crate::{domain::User, Query};
use crate::{domain::user, read};

use super::DatabaseQuery;

/// Queries the [`read::user::Profile`] of an alive [`User`] by its
/// [`user::Id`].
pub type ById = DatabaseQuery<By<Option<read::user::Profile>, user::Id>>;
