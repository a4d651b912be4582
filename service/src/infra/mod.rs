//! Infrastructure layer.
//!
//! Storage backends of the [`Service`], picked by the `postgres` and `memory`
//! features.
//!
//! [`Service`]: crate::Service

pub mod database;

#[cfg(any(test, feature = "memory"))]
pub use self::database::{memory, Memory};
pub use self::database::{Constraint, Database};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
