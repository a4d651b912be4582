//! [`Query`] collection related to a single [`Treatment`].

use common::operations::By;

use crate::domain::{treatment, Treatment};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Treatment`] by its [`treatment::Id`].
pub type ById = DatabaseQuery<By<Option<Treatment>, treatment::Id>>;
