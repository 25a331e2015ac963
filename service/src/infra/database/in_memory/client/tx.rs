//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::infra::database::in_memory::store::{Access, Data, Store};

use super::NonTx;

/// Transactional in-memory database client.
///
/// The first executed operation locks the whole [`Store`] and stages a copy
/// of its [`Data`], so transactions are globally exclusive. All the
/// operations apply to the staged copy, which replaces the [`Store`]'s
/// [`Data`] once [`Tx::commit()`]ted. Dropping the client without committing
/// discards the staged copy.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`Store`] to stage the transaction over.
    store: Store,

    /// Inner state of this client.
    state: Arc<Mutex<State>>,
}

/// Inner state of the [`Tx`] client.
#[derive(Debug, Default)]
struct State {
    /// Lock held over the [`Store`] since the first executed operation.
    guard: Option<OwnedMutexGuard<Data>>,

    /// Staged copy of the [`Data`] all the operations apply to.
    staged: Option<Data>,
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            store: client.store,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Commits this [`Tx`] client.
    ///
    /// Publishes the staged [`Data`] to the underlying [`Store`], releasing
    /// the lock held over it.
    pub async fn commit(&self) {
        let mut state = self.state.lock().await;
        let Some(staged) = state.staged.take() else {
            // No operation was staged, so nothing to publish.
            return;
        };
        *state.guard.take().expect("lock is held while staged") = staged;
    }
}

impl Access for Tx {
    async fn with<R>(&self, f: impl FnOnce(&mut Data) -> R) -> R {
        let mut state = self.state.lock().await;
        if state.staged.is_none() {
            let guard = self.store.lock_owned().await;
            state.staged = Some(Data::clone(&guard));
            state.guard = Some(guard);
        }
        f(state.staged.as_mut().expect("staged just initialized"))
    }
}
