//! [`Product`]-related read definitions.

use derive_more::Deref;

#[cfg(doc)]
use crate::domain::Product;

/// Indicator whether any reservation books a [`Product`].
#[derive(Clone, Copy, Debug, Deref, Eq, Hash, PartialEq)]
pub struct IsReserved(pub bool);

impl PartialEq<bool> for IsReserved {
    fn eq(&self, other: &bool) -> bool {
        self.0 == *other
    }
}
