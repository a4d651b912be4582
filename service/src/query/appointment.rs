//! [`Query`] collection related to a single [`Appointment`].

use common::operations::By;

#[cfg(doc)]
use crate::{domain::Appointment, Query};
use crate::{domain::appointment, read};

use super::DatabaseQuery;

/// Queries [`read::appointment::Details`] of an [`Appointment`] by its
/// [`appointment::Id`].
pub type ById =
    DatabaseQuery<By<Option<read::appointment::Details>, appointment::Id>>;
