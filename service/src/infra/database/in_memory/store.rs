//! Storage of the [`InMemory`] database.
//!
//! [`InMemory`]: super::InMemory

use std::{collections::BTreeMap, future::Future, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{product, reservation, Product, Reservation};

/// Snapshot of everything an [`InMemory`] database holds.
///
/// [`InMemory`]: super::InMemory
#[derive(Clone, Debug, Default)]
pub struct Data {
    /// [`Product`]s indexed by their [`product::Id`].
    pub(crate) products: BTreeMap<product::Id, Product>,

    /// [`Reservation`]s indexed by their [`reservation::Id`].
    pub(crate) reservations: BTreeMap<reservation::Id, Reservation>,

    /// Last [`product::Id`] issued by [`Data::next_product_id()`].
    last_product_id: i64,

    /// Last [`reservation::Id`] issued by [`Data::next_reservation_id()`].
    last_reservation_id: i64,
}

impl Data {
    /// Issues a new unique [`product::Id`].
    pub(crate) fn next_product_id(&mut self) -> product::Id {
        self.last_product_id += 1;
        self.last_product_id.into()
    }

    /// Issues a new unique [`reservation::Id`].
    pub(crate) fn next_reservation_id(&mut self) -> reservation::Id {
        self.last_reservation_id += 1;
        self.last_reservation_id.into()
    }
}

/// Shared handle to the [`Data`] of an [`InMemory`] database.
///
/// [`InMemory`]: super::InMemory
#[derive(Clone, Debug, Default)]
pub struct Store {
    /// [`Data`] behind this [`Store`].
    data: Arc<Mutex<Data>>,
}

impl Store {
    /// Creates a new empty [`Store`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires an exclusive lock over the whole [`Data`] of this [`Store`].
    pub(crate) async fn lock_owned(&self) -> OwnedMutexGuard<Data> {
        Arc::clone(&self.data).lock_owned().await
    }
}

/// Ability of a client to reach the [`Data`] it operates on.
pub trait Access {
    /// Runs the provided function over the [`Data`] this [`Access`] points at.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut Data) -> R,
    ) -> impl Future<Output = R>;
}
