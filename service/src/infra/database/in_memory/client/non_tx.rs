//! [`NonTx`] client definitions.

use crate::infra::database::in_memory::store::{Access, Data, Store};

/// Non-transactional in-memory database client.
///
/// Every operation locks the [`Store`] for its own duration only.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`Store`] this client operates on.
    pub(crate) store: Store,
}

impl NonTx {
    /// Creates a new [`NonTx`] client on top of the provided [`Store`].
    #[must_use]
    pub(crate) fn from_store(store: Store) -> Self {
        Self { store }
    }
}

impl Access for NonTx {
    async fn with<R>(&self, f: impl FnOnce(&mut Data) -> R) -> R {
        let mut data = self.store.lock_owned().await;
        f(&mut data)
    }
}
