//! [`Handler`] abstractions.

use std::future::Future;

/// Unit of executable behavior.
///
/// Commands, queries, background tasks and database operations all go
/// through this single seam, differing only in their `Args`.
pub trait Handler<Args = ()> {
    /// Value produced by a successful execution.
    type Ok;

    /// Error produced by a failed execution.
    type Err;

    /// Executes this [`Handler`] with the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
