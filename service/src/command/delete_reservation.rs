//! [`Command`] for deleting a [`Reservation`].

use common::operations::{By, Delete, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{reservation, Reservation},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Reservation`].
///
/// Deletion erases the record only: units booked by the [`Reservation`] stay
/// withdrawn from the [`Product`]s' stocks. Cancel the [`Reservation`] first
/// to return them.
///
/// [`Product`]: crate::domain::Product
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteReservation {
    /// ID of the [`Reservation`] to delete.
    pub reservation_id: reservation::Id,
}

impl<Db> Command<DeleteReservation> for Service<Db>
where
    Db: Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Reservation, reservation::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteReservation { reservation_id } = cmd;

        let reservation = self
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;

        self.database()
            .execute(Delete(By::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(reservation)
    }
}

/// Error of [`DeleteReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),
}

#[cfg(all(test, feature = "in-memory"))]
mod spec {
    use std::time::Duration;

    use common::{
        money::Currency,
        operations::{By, Select},
        DateTime, Money,
    };

    use crate::{
        command::{CreateProduct, CreateReservation},
        domain::{
            product::{self, Stock},
            reservation::{reconcile, Quantity},
            user, Product, Reservation,
        },
        infra::{in_memory::Store, InMemory},
        task, Command as _, Config, Service,
    };

    use super::{DeleteReservation, ExecutionError};

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

    async fn seed_product(svc: &Service<InMemory>, available: u32) -> Product {
        svc.execute(CreateProduct {
            name: product::Name::new("Taladro percutor").unwrap(),
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
        product_id: product::Id,
        quantity: u32,
    ) -> Reservation {
        let starts = DateTime::now();
        svc.execute(CreateReservation {
            owner: user::User {
                id: 7.into(),
                username: user::Username::new("pato").unwrap(),
            },
            items: vec![reconcile::ItemRequest {
                product_id,
                quantity: Quantity::new(quantity).unwrap(),
            }],
            starts_at: starts.coerce(),
            ends_at: (starts + Duration::from_secs(2 * 3600)).coerce(),
            is_paid: false,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn deletes_keeping_stock_withdrawn() {
        let svc = service();
        let product = seed_product(&svc, 10).await;
        let reservation = book(&svc, product.id, 2).await;

        let deleted = svc
            .execute(DeleteReservation {
                reservation_id: reservation.id,
            })
            .await
            .unwrap();
        assert_eq!(deleted.id, reservation.id);

        let gone = svc
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(reservation.id)))
            .await
            .unwrap();
        assert!(gone.is_none());

        // Deletion is not a cancellation: the booked units stay withdrawn.
        let stored = svc
            .database()
            .execute(Select(By::<Option<Product>, _>::new(product.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.stock.available, 8);
        assert_eq!(stored.stock.reserved, 2);
    }

    #[tokio::test]
    async fn rejects_unknown_reservation() {
        let svc = service();

        let err = svc
            .execute(DeleteReservation {
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
