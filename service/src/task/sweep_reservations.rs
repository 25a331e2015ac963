//! [`SweepReservations`] [`Task`].

use std::{collections::HashMap, convert::Infallible, error::Error, time};

use common::{
    operations::{
        By, Commit, Lock, Perform, Select, Start, Transact, Transacted,
        Update,
    },
    DateTime,
};
use derive_more::{Display, Error as StdError, From};
use itertools::Itertools as _;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        product,
        reservation::{self, reconcile, Status},
        Product, Reservation,
    },
    infra::{database, Database},
    read, Service,
};

use super::Task;

/// Configuration for [`SweepReservations`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between [`Reservation`] sweeps.
    pub interval: time::Duration,
}

/// [`Task`] for driving [`Reservation`]s through their lifecycle as time
/// passes.
///
/// Every sweep activates the [`Status::Pending`] [`Reservation`]s whose
/// rental period has started, withdrawing their booked units, and finalizes
/// the [`Status::Active`] ones whose rental period has ended, returning the
/// units back to the [`Product`]s' stocks.
#[derive(Clone, Copy, Debug)]
pub struct SweepReservations<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<SweepReservations<Self>, Config>>> for Service<Db>
where
    SweepReservations<Service<Db>>:
        Task<Perform<()>, Ok = (), Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<SweepReservations<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = SweepReservations {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::SweepReservations` failed: {e}");
            });
        }
    }
}

impl<Db> Task<Perform<()>> for SweepReservations<Service<Db>>
where
    Db: Database<
            Select<By<Vec<Reservation>, read::reservation::DueToActivate>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::DueToFinalize>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Reservation, reservation::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<product::Id, Product>, Vec<product::Id>>>,
            Ok = HashMap<product::Id, Product>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Product, product::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Product>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Update<Reservation>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let now = DateTime::now();
        let db = self.service.database();

        let due = db
            .execute(Select(By::new(read::reservation::DueToActivate(
                now.coerce(),
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;
        for reservation in due {
            let id = reservation.id;
            _ = activate(db, reservation).await.map_err(|e| {
                log::warn!("failed to activate `Reservation(id: {id})`: {e}");
            });
        }

        let due = db
            .execute(Select(By::new(read::reservation::DueToFinalize(
                now.coerce(),
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;
        for reservation in due {
            let id = reservation.id;
            _ = finalize(db, reservation).await.map_err(|e| {
                log::warn!("failed to finalize `Reservation(id: {id})`: {e}");
            });
        }

        Ok(())
    }
}

/// Activates the given [`Status::Pending`] [`Reservation`], withdrawing its
/// booked units from the [`Product`]s' stocks.
///
/// The [`Reservation`] is re-checked under the transaction: one that vanished
/// meanwhile, or is not due anymore, is skipped.
async fn activate<Db>(
    db: &Db,
    stale: Reservation,
) -> Result<(), Traced<ItemError>>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Reservation, reservation::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<product::Id, Product>, Vec<product::Id>>>,
            Ok = HashMap<product::Id, Product>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Product, product::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Product>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Update<Reservation>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    use ItemError as E;

    let tx = db
        .execute(Transact)
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

    // Avoid concurrent actions upon the same `Reservation`.
    tx.execute(Lock(By::new(stale.id)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

    let Some(mut reservation) = tx
        .execute(Select(By::<Option<Reservation>, _>::new(stale.id)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?
    else {
        return Ok(());
    };
    if reservation.status != Status::Pending
        || reservation.starts_at > reservation::StartDateTime::now()
    {
        // Another actor got here first.
        return Ok(());
    }

    // Avoid concurrent actions upon the same `Product`s.
    let mut product_ids: Vec<_> = reservation.product_ids().collect();
    product_ids.sort_unstable();
    for &id in &product_ids {
        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
    }

    let mut products = tx
        .execute(Select(By::new(product_ids)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

    reconcile::withdraw_all(&mut reservation, &mut products)
        .map_err(tracerr::from_and_wrap!(=> E))?;
    reservation
        .activate()
        .map_err(tracerr::from_and_wrap!(=> E))?;

    for product in products.into_values().sorted_by_key(|p| p.id) {
        tx.execute(Update(product))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
    }
    tx.execute(Update(reservation))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

    tx.execute(Commit)
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

    Ok(())
}

/// Finalizes the given [`Status::Active`] [`Reservation`], returning its
/// booked units to the [`Product`]s' stocks.
///
/// The [`Reservation`] is re-checked under the transaction: one that vanished
/// meanwhile, or is not due anymore, is skipped.
async fn finalize<Db>(
    db: &Db,
    stale: Reservation,
) -> Result<(), Traced<ItemError>>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Reservation, reservation::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<product::Id, Product>, Vec<product::Id>>>,
            Ok = HashMap<product::Id, Product>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Product, product::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Product>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Update<Reservation>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    use ItemError as E;

    let tx = db
        .execute(Transact)
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

    // Avoid concurrent actions upon the same `Reservation`.
    tx.execute(Lock(By::new(stale.id)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

    let Some(mut reservation) = tx
        .execute(Select(By::<Option<Reservation>, _>::new(stale.id)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?
    else {
        return Ok(());
    };
    if reservation.status != Status::Active
        || reservation.ends_at > reservation::EndDateTime::now()
    {
        // Another actor got here first.
        return Ok(());
    }

    // Avoid concurrent actions upon the same `Product`s.
    let mut product_ids: Vec<_> = reservation.product_ids().collect();
    product_ids.sort_unstable();
    for &id in &product_ids {
        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
    }

    let mut products = tx
        .execute(Select(By::new(product_ids)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

    reconcile::release_all(&mut reservation, &mut products)
        .map_err(tracerr::from_and_wrap!(=> E))?;
    reservation
        .finalize()
        .map_err(tracerr::from_and_wrap!(=> E))?;

    for product in products.into_values().sorted_by_key(|p| p.id) {
        tx.execute(Update(product))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
    }
    tx.execute(Update(reservation))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

    tx.execute(Commit)
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

    Ok(())
}

/// Error of [`SweepReservations`] execution.
pub type ExecutionError = Traced<database::Error>;

/// Error of transitioning a single [`Reservation`] during a sweep.
///
/// Logged and swallowed: one failing [`Reservation`] never stalls the rest of
/// the sweep.
#[derive(Debug, Display, From, StdError)]
enum ItemError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Status`] transition is not allowed.
    #[display("{_0}")]
    #[from]
    Status(reservation::TransitionError),

    /// Booked units cannot be reconciled with [`Product`] stocks.
    #[display("{_0}")]
    #[from]
    Stock(reconcile::Error),
}
