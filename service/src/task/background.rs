//! Execution environment for background [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
};

use futures::{future::LocalBoxFuture, FutureExt as _, TryFutureExt as _};
use tokio::task;

#[cfg(doc)]
use crate::Task;

/// Collection of spawned background [`Task`]s, driven to completion by
/// `await`ing it.
#[derive(Debug, Default)]
pub struct Background {
    /// [`task::LocalSet`] the spawned [`Task`]s run on.
    set: task::LocalSet,

    /// Join handles of the spawned [`Task`]s.
    handles: Vec<task::JoinHandle<Result<(), Box<dyn Error + 'static>>>>,
}

impl Background {
    /// Schedules the provided `future` to run on this [`Background`].
    pub fn spawn<F, E>(&mut self, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        self.handles.push(self.set.spawn_local(
            future.map_err(|e| Box::<dyn Error + 'static>::from(Box::new(e))),
        ));
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Box<dyn Error>>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        async move {
            set.run_until(async move {
                for handle in handles {
                    handle
                        .await
                        .map_err(|e| {
                            Box::<dyn Error + 'static>::from(Box::new(e))
                        })??;
                }
                Ok(())
            })
            .await
        }
        .boxed_local()
    }
}
