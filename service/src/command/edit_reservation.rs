//! [`Command`] for editing an existing [`Reservation`].

use std::collections::{HashMap, HashSet};

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use itertools::Itertools as _;
use tracerr::Traced;

use crate::{
    domain::{
        product,
        reservation::{self, pricing, reconcile},
        Product, Reservation,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for editing an existing [`Reservation`].
///
/// Rebooks quantities of the already booked [`Product`]s and rewrites the
/// rental period and the payment mark. The set of booked [`Product`]s itself
/// cannot change.
#[derive(Clone, Debug)]
pub struct EditReservation {
    /// ID of the [`Reservation`] to edit.
    pub reservation_id: reservation::Id,

    /// Requested [`Product`] bookings replacing the current ones.
    pub items: Vec<reconcile::ItemRequest>,

    /// New [`DateTime`] when the rental period starts.
    ///
    /// [`DateTime`]: common::DateTime
    pub starts_at: reservation::StartDateTime,

    /// New [`DateTime`] when the rental period ends.
    ///
    /// [`DateTime`]: common::DateTime
    pub ends_at: reservation::EndDateTime,

    /// Indicator whether the [`Reservation`] is paid.
    pub is_paid: bool,
}

impl<Db> Command<EditReservation> for Service<Db>
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
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: EditReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let EditReservation {
            reservation_id,
            items,
            starts_at,
            ends_at,
            is_paid,
        } = cmd;

        let hours = pricing::duration(starts_at, ends_at)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Reservation`.
        tx.execute(Lock(By::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut reservation = tx
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;

        // Only quantities may change, never the set of booked `Product`s.
        let requested: HashSet<_> =
            items.iter().map(|i| i.product_id).collect();
        let booked: HashSet<_> = reservation.product_ids().collect();
        if requested != booked {
            return Err(tracerr::new!(E::ProductSetChanged(reservation_id)));
        }

        // Avoid concurrent actions upon the same `Product`s.
        let mut product_ids: Vec<_> = requested.into_iter().collect();
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

        let rebooked = reconcile::plan(&items, &reservation.items, &products)
            .map_err(tracerr::from_and_wrap!(=> E))?
            .apply(&mut products)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let total = pricing::total(&rebooked, &products, hours)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        reservation.items = rebooked;
        reservation.starts_at = starts_at;
        reservation.ends_at = ends_at;
        reservation.total = total;
        reservation.is_paid = is_paid;

        for product in products.into_values().sorted_by_key(|p| p.id) {
            tx.execute(Update(product))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }
        tx.execute(Update(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(reservation)
    }
}

/// Error of [`EditReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Rental period cannot be priced.
    #[display("{_0}")]
    #[from]
    Price(pricing::Error),

    /// [`Reservation`] tried to book other [`Product`]s than the ones it
    /// booked before.
    #[display(
        "`Reservation(id: {_0})` can only change quantities of its booked \
         `Product`s"
    )]
    ProductSetChanged(#[error(not(source))] reservation::Id),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// Requested bookings cannot be honored by [`Product`] stocks.
    #[display("{_0}")]
    #[from]
    Stock(reconcile::Error),
}
