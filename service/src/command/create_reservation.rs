//! [`Command`] for creating a new [`Reservation`].

use std::collections::HashMap;

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use itertools::Itertools as _;
use tracerr::Traced;

use crate::{
    domain::{
        product,
        reservation::{self, pricing, reconcile, Status},
        user, Product, Reservation,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Reservation`].
#[derive(Clone, Debug)]
pub struct CreateReservation {
    /// [`User`] the new [`Reservation`] will belong to.
    ///
    /// [`User`]: user::User
    pub owner: user::User,

    /// Requested [`Product`] bookings of the new [`Reservation`].
    pub items: Vec<reconcile::ItemRequest>,

    /// [`DateTime`] when the rental period starts.
    pub starts_at: reservation::StartDateTime,

    /// [`DateTime`] when the rental period ends.
    pub ends_at: reservation::EndDateTime,

    /// Indicator whether the new [`Reservation`] is paid already.
    pub is_paid: bool,
}

impl<Db> Command<CreateReservation> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<HashMap<product::Id, Product>, Vec<product::Id>>>,
            Ok = HashMap<product::Id, Product>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Product, product::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Insert<reservation::Draft>,
            Ok = Reservation,
            Err = Traced<database::Error>,
        > + Database<Update<Product>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateReservation {
            owner,
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

        // Avoid concurrent actions upon the same `Product`s.
        let mut product_ids: Vec<_> =
            items.iter().map(|i| i.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
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

        let booked = reconcile::plan(&items, &[], &products)
            .map_err(tracerr::from_and_wrap!(=> E))?
            .apply(&mut products)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let total = pricing::total(&booked, &products, hours)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let reservation = tx
            .execute(Insert(reservation::Draft {
                code: reservation::Code::generate(owner.id),
                owner,
                items: booked,
                starts_at,
                ends_at,
                status: Status::Pending,
                total,
                is_paid,
                created_at: DateTime::now().coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        for product in products.into_values().sorted_by_key(|p| p.id) {
            tx.execute(Update(product))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(reservation)
    }
}

/// Error of [`CreateReservation`] [`Command`] execution.
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

    /// Requested bookings cannot be honored by [`Product`] stocks.
    #[display("{_0}")]
    #[from]
    Stock(reconcile::Error),
}
