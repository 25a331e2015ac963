//! [`Query`] collection related to multiple [`Reservation`]s.

use common::operations::By;

use crate::domain::{user, Reservation};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`Reservation`]s ordered by their ID.
pub type List = DatabaseQuery<By<Vec<Reservation>, ()>>;

/// Queries the [`Reservation`]s owned by a [`user::Username`], most recent
/// first.
pub type ByOwner = DatabaseQuery<By<Vec<Reservation>, user::Username>>;
