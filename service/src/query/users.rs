//! [`Query`] collection related to the multiple [`User`]s.

use common::operations::By;

#[cfg(doc)]
use crate::{domain::User, Query};
use crate::read;

use super::DatabaseQuery;

/// Queries the [`read::user::Profile`]s of alive [`User`]s ordered by their
/// names.
pub type List =
    DatabaseQuery<By<Vec<read::user::Profile>, read::user::list::Filter>>;
