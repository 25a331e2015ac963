//! [`Command`] for removing booked [`Product`]s from a [`Reservation`].
//!
//! [`Product`]: crate::domain::Product

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

/// [`Command`] for removing booked [`Product`]s from a [`Reservation`],
/// returning their units to the stocks and re-pricing what is left.
///
/// [`Product`]s not booked by the [`Reservation`] are silently skipped.
#[derive(Clone, Debug)]
pub struct RemoveReservationItems {
    /// ID of the [`Reservation`] to remove bookings from.
    pub reservation_id: reservation::Id,

    /// IDs of the [`Product`]s whose bookings should be removed.
    pub product_ids: Vec<product::Id>,
}

impl<Db> Command<RemoveReservationItems> for Service<Db>
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
        cmd: RemoveReservationItems,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RemoveReservationItems {
            reservation_id,
            product_ids,
        } = cmd;

        if product_ids.is_empty() {
            return Err(tracerr::new!(E::NoProductsSpecified));
        }

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

        // Avoid concurrent actions upon the same `Product`s.
        let mut booked_ids: Vec<_> = reservation.product_ids().collect();
        booked_ids.sort_unstable();
        for &id in &booked_ids {
            tx.execute(Lock(By::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        // Remaining bookings are needed as well, to re-price the
        // `Reservation` after the removal.
        let mut products = tx
            .execute(Select(By::new(booked_ids)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let removing: HashSet<_> = product_ids.into_iter().collect();
        let mut removed_ids = Vec::new();
        for item in &mut reservation.items {
            if !removing.contains(&item.product_id) {
                continue;
            }
            let name = products
                .get(&item.product_id)
                .ok_or(E::Stock(reconcile::Error::ProductNotFound(
                    item.product_id,
                )))
                .map_err(tracerr::wrap!())?
                .name
                .clone();
            let released = reconcile::release_item(item, &mut products);
            if let Err(source) = released {
                return Err(tracerr::new!(E::StockRestore {
                    name,
                    product_id: item.product_id,
                    source,
                }));
            }
            removed_ids.push(item.product_id);
        }
        reservation
            .items
            .retain(|item| !removing.contains(&item.product_id));

        let hours =
            pricing::duration(reservation.starts_at, reservation.ends_at)
                .map_err(tracerr::from_and_wrap!(=> E))?;
        reservation.total =
            pricing::total(&reservation.items, &products, hours)
                .map_err(tracerr::from_and_wrap!(=> E))?;

        for product in products
            .into_values()
            .filter(|p| removed_ids.contains(&p.id))
            .sorted_by_key(|p| p.id)
        {
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

/// Error of [`RemoveReservationItems`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// No [`Product`]s were specified.
    ///
    /// [`Product`]: crate::domain::Product
    #[display("no `Product`s were specified for removal")]
    NoProductsSpecified,

    /// Remaining bookings cannot be re-priced.
    #[display("{_0}")]
    #[from]
    Price(pricing::Error),

    /// [`Reservation`] with the provided ID does not exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// Booked units cannot be returned to [`Product`] stocks.
    ///
    /// [`Product`]: crate::domain::Product
    #[display("{_0}")]
    #[from]
    Stock(reconcile::Error),

    /// Stock of a removed booking failed to be restored.
    #[display(
        "Error al restablecer stock del producto '{name}' \
         (ID={product_id}): {source}"
    )]
    StockRestore {
        /// [`Name`] of the [`Product`].
        ///
        /// [`Name`]: product::Name
        /// [`Product`]: crate::domain::Product
        name: product::Name,

        /// ID of the [`Product`].
        ///
        /// [`Product`]: crate::domain::Product
        product_id: product::Id,

        /// Failure itself.
        source: reconcile::Error,
    },
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

    use super::{ExecutionError, RemoveReservationItems};

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
    async fn removes_selected_items_restoring_stock() {
        let svc = service();
        let drill = seed_product(&svc, "Taladro percutor", 10).await;
        let saw = seed_product(&svc, "Sierra circular", 10).await;
        let reservation =
            book(&svc, vec![request(drill.id, 2), request(saw.id, 3)]).await;

        let slimmed = svc
            .execute(RemoveReservationItems {
                reservation_id: reservation.id,
                product_ids: vec![drill.id],
            })
            .await
            .unwrap();

        assert_eq!(slimmed.items.len(), 1);
        assert_eq!(slimmed.items[0].product_id, saw.id);
        // 3 units of the saw over 2 hours are all that is left to charge.
        assert_eq!(
            slimmed.total,
            Some(Money {
                amount: 600.into(),
                currency: Currency::Ars,
            }),
        );

        let drill_stock = stock_of(&svc, drill.id).await;
        assert_eq!(drill_stock.available, 10);
        assert_eq!(drill_stock.reserved, 0);

        let saw_stock = stock_of(&svc, saw.id).await;
        assert_eq!(saw_stock.available, 7);
        assert_eq!(saw_stock.reserved, 3);
    }

    #[tokio::test]
    async fn clears_total_when_last_item_removed() {
        let svc = service();
        let drill = seed_product(&svc, "Taladro percutor", 10).await;
        let reservation = book(&svc, vec![request(drill.id, 2)]).await;

        let slimmed = svc
            .execute(RemoveReservationItems {
                reservation_id: reservation.id,
                product_ids: vec![drill.id],
            })
            .await
            .unwrap();

        assert!(slimmed.items.is_empty());
        assert_eq!(slimmed.total, None);
    }

    #[tokio::test]
    async fn ignores_products_not_booked() {
        let svc = service();
        let drill = seed_product(&svc, "Taladro percutor", 10).await;
        let reservation = book(&svc, vec![request(drill.id, 2)]).await;

        let untouched = svc
            .execute(RemoveReservationItems {
                reservation_id: reservation.id,
                product_ids: vec![9000.into()],
            })
            .await
            .unwrap();

        assert_eq!(untouched.items.len(), 1);
        assert_eq!(untouched.total, reservation.total);

        let stock = stock_of(&svc, drill.id).await;
        assert_eq!(stock.available, 8);
        assert_eq!(stock.reserved, 2);
    }

    #[tokio::test]
    async fn rejects_empty_selection() {
        let svc = service();
        let drill = seed_product(&svc, "Taladro percutor", 10).await;
        let reservation = book(&svc, vec![request(drill.id, 2)]).await;

        let err = svc
            .execute(RemoveReservationItems {
                reservation_id: reservation.id,
                product_ids: vec![],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::NoProductsSpecified,
        ));
    }

    #[tokio::test]
    async fn rejects_unknown_reservation() {
        let svc = service();

        let err = svc
            .execute(RemoveReservationItems {
                reservation_id: 9000.into(),
                product_ids: vec![1.into()],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ReservationNotExists(_),
        ));
    }
}
