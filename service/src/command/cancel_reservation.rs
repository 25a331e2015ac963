//! [`Command`] for canceling a [`Reservation`].

use std::collections::HashMap;

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use itertools::Itertools as _;
use tracerr::Traced;

use crate::{
    domain::{
        product,
        reservation::{self, reconcile},
        Product, Reservation,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for canceling a [`Reservation`], returning its booked units to
/// the [`Product`]s' stocks.
///
/// A [`Reservation`] that has already run its course cannot be canceled.
#[derive(Clone, Copy, Debug, From)]
pub struct CancelReservation {
    /// ID of the [`Reservation`] to cancel.
    pub reservation_id: reservation::Id,
}

impl<Db> Command<CancelReservation> for Service<Db>
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
        cmd: CancelReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelReservation { reservation_id } = cmd;

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

        reservation
            .cancel()
            .map_err(tracerr::from_and_wrap!(=> E))?;

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

/// Error of [`CancelReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Reservation`] has already run its course.
    #[display("{_0}")]
    #[from]
    Status(reservation::TransitionError),

    /// Booked units cannot be returned to [`Product`] stocks.
    #[display("{_0}")]
    #[from]
    Stock(reconcile::Error),
}

#[cfg(all(test, feature = "in-memory"))]
mod spec {
    use std::time::Duration;

    use common::{
        money::Currency,
        operations::{By, Select, Update},
        DateTime, Money,
    };

    use crate::{
        command::{CreateProduct, CreateReservation},
        domain::{
            product::{self, Stock},
            reservation::{reconcile, Quantity, Status, TransitionError},
            user, Product, Reservation,
        },
        infra::{in_memory::Store, InMemory},
        task, Command as _, Config, Service,
    };

    use super::{CancelReservation, ExecutionError};

    fn service() -> Service<InMemory> {
        Service {
            config: Config {
                sweep_reservations: task::sweep_reservations::Config {
                    interval: Duration::from_secs(60),
                },
            },
            database: InMemory::new(Store::new()),
        }
    }

    fn request(
        product_id: product::Id,
        quantity: u32,
    ) -> reconcile::ItemRequest {
        reconcile::ItemRequest {
            product_id,
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    async fn seed_product(
        svc: &Service<InMemory>,
        name: &str,
        available: u32,
    ) -> Product {
        svc.execute(CreateProduct {
            name: product::Name::new(name).unwrap(),
            rate: product::HourlyRate::new(Money {
                amount: 100.into(),
                currency: Currency::Ars,
            })
            .unwrap(),
            stock: Stock {
                available,
                reserved: 0,
            },
        })
        .await
        .unwrap()
    }

    async fn book(
        svc: &Service<InMemory>,
        items: Vec<reconcile::ItemRequest>,
    ) -> Reservation {
        let starts = DateTime::now();
        svc.execute(CreateReservation {
            owner: user::User {
                id: 7.into(),
                username: user::Username::new("pato").unwrap(),
            },
            items,
            starts_at: starts.coerce(),
            ends_at: (starts + Duration::from_secs(2 * 3600)).coerce(),
            is_paid: false,
        })
        .await
        .unwrap()
    }

    async fn stock_of(svc: &Service<InMemory>, id: product::Id) -> Stock {
        svc.database()
            .execute(Select(By::<Option<Product>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[tokio::test]
    async fn cancels_restoring_booked_units() {
        let svc = service();
        let product = seed_product(&svc, "Taladro percutor", 10).await;
        let reservation = book(&svc, vec![request(product.id, 2)]).await;

        let canceled = svc
            .execute(CancelReservation {
                reservation_id: reservation.id,
            })
            .await
            .unwrap();

        assert_eq!(canceled.status, Status::Canceled);

        let stock = stock_of(&svc, product.id).await;
        assert_eq!(stock.available, 10);
        assert_eq!(stock.reserved, 0);
    }

    #[tokio::test]
    async fn rejects_canceling_twice() {
        let svc = service();
        let product = seed_product(&svc, "Taladro percutor", 10).await;
        let reservation = book(&svc, vec![request(product.id, 2)]).await;

        svc.execute(CancelReservation {
            reservation_id: reservation.id,
        })
        .await
        .unwrap();

        let err = svc
            .execute(CancelReservation {
                reservation_id: reservation.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Status(TransitionError::AlreadyCanceled),
        ));

        // The first cancellation restored the stock, the second one must not
        // restore it again.
        let stock = stock_of(&svc, product.id).await;
        assert_eq!(stock.available, 10);
        assert_eq!(stock.reserved, 0);
    }

    #[tokio::test]
    async fn rejects_canceling_finalized() {
        let svc = service();
        let product = seed_product(&svc, "Taladro percutor", 10).await;
        let mut reservation = book(&svc, vec![request(product.id, 2)]).await;

        reservation.status = Status::Finalized;
        svc.database()
            .execute(Update(reservation.clone()))
            .await
            .unwrap();

        let err = svc
            .execute(CancelReservation {
                reservation_id: reservation.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Status(TransitionError::AlreadyFinalized),
        ));
    }

    #[tokio::test]
    async fn rejects_unknown_reservation() {
        let svc = service();

        let err = svc
            .execute(CancelReservation {
                reservation_id: 9000.into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ReservationNotExists(_),
        ));
    }
}
