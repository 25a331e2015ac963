//! [`Query`] collection related to multiple [`Product`]s.

use common::operations::By;

use crate::domain::Product;
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`Product`]s ordered by their ID.
pub type List = DatabaseQuery<By<Vec<Product>, ()>>;
