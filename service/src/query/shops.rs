//! [`Query`] collection related to the multiple [`Shop`]s.

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{domain::Shop, read};

use super::DatabaseQuery;

/// Queries a list of [`Shop`]s ordered by their names.
pub type List = DatabaseQuery<By<Vec<Shop>, read::shop::list::Filter>>;
