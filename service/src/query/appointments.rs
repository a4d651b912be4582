//! [`Query`] collection related to the multiple [`Appointment`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::Appointment, Query};

use super::DatabaseQuery;

/// Queries a list of [`read::appointment::Details`], the latest
/// [`Appointment`]s first.
pub type List = DatabaseQuery<
    By<Vec<read::appointment::Details>, read::appointment::list::Filter>,
>;
