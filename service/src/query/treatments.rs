//! [`Query`] collection related to the multiple [`Treatment`]s.

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{domain::Treatment, read};

use super::DatabaseQuery;

/// Queries a list of [`Treatment`]s ordered by their names.
pub type List =
    DatabaseQuery<By<Vec<Treatment>, read::treatment::list::Filter>>;
