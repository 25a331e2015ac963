//! In-memory [`Database`] implementation.

pub mod client;
pub mod store;
mod impls;

use derive_more::{Deref, Display, Error as StdError};

#[cfg(doc)]
use crate::domain::{Product, Reservation};
use crate::domain::{product, reservation};
#[cfg(doc)]
use crate::infra::Database;

pub use self::{
    client::{NonTx, Tx},
    store::{Access, Data, Store},
};

/// In-memory [`Database`] client.
///
/// The whole dataset lives in process memory and is lost on shutdown.
#[derive(Clone, Copy, Debug, Deref)]
pub struct InMemory<T = NonTx>(T);

impl InMemory {
    /// Creates a new [`InMemory`] database client on top of the provided
    /// [`Store`].
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self(NonTx::from_store(store))
    }
}

/// In-memory database [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Product`] being altered doesn't exist.
    #[display("`Product(id: {_0})` does not exist")]
    ProductNotFound(#[error(not(source))] product::Id),

    /// [`Reservation`] being altered doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotFound(#[error(not(source))] reservation::Id),
}
