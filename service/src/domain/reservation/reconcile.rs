//! Reconciliation of [`Reservation`] bookings with [`Product`] stock ledgers.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use derive_more::{Display, Error as StdError};

#[cfg(doc)]
use crate::domain::product::Stock;
use crate::domain::product::{self, NotEnoughUnits, Product, Units};

use super::{LineItem, Quantity, Reservation, Status};

/// Requested booking of a single [`Product`].
#[derive(Clone, Copy, Debug)]
pub struct ItemRequest {
    /// ID of the [`Product`] to book.
    pub product_id: product::Id,

    /// Number of units to book.
    pub quantity: Quantity,
}

/// Reviewed set of ledger movements bringing [`Product`] stocks in line with
/// requested bookings.
///
/// Built by [`plan()`] without touching anything, and carried out by
/// [`Plan::apply()`].
#[derive(Clone, Debug)]
pub struct Plan {
    /// [`LineItem`]s-to-be along with the ledger movements they require.
    items: Vec<PlannedItem>,
}

impl Plan {
    /// Carries the planned ledger movements out on the given `products`,
    /// returning the [`LineItem`]s the [`Reservation`] should carry from now
    /// on.
    ///
    /// Movements are carried out in order, and the first failing one aborts,
    /// leaving the earlier ones applied. Callers run inside a transaction.
    ///
    /// # Errors
    ///
    /// - If some planned [`Product`] is missing from `products`.
    /// - If some [`Product`]'s ledger cannot cover its planned withdrawal.
    pub fn apply(
        self,
        products: &mut HashMap<product::Id, Product>,
    ) -> Result<Vec<LineItem>, Error> {
        self.items
            .into_iter()
            .map(|planned| {
                let product = products
                    .get_mut(&planned.product_id)
                    .ok_or(Error::ProductNotFound(planned.product_id))?;

                let held = match planned.movement {
                    Movement::Withdraw(units) => {
                        product.stock.withdraw(units).map_err(|source| {
                            Error::OutOfStock {
                                code: product.code.clone(),
                                source,
                            }
                        })?;
                        planned.held + units
                    }
                    Movement::Restore(units) => {
                        product.stock.restore(units);
                        planned.held.saturating_sub(units)
                    }
                    Movement::Keep => planned.held,
                };

                Ok(LineItem {
                    product_id: planned.product_id,
                    quantity: planned.quantity,
                    held,
                })
            })
            .collect()
    }
}

/// Single [`LineItem`]-to-be of a [`Plan`].
#[derive(Clone, Copy, Debug)]
struct PlannedItem {
    /// ID of the booked [`Product`].
    product_id: product::Id,

    /// Number of units to be booked.
    quantity: Quantity,

    /// Number of units held by the previous booking, if any.
    held: Units,

    /// Ledger [`Movement`] required.
    movement: Movement,
}

/// Ledger movement a [`PlannedItem`] requires.
#[derive(Clone, Copy, Debug)]
enum Movement {
    /// Leave the ledger untouched.
    Keep,

    /// Return the given number of units to the shelf.
    Restore(Units),

    /// Take the given number of units off the shelf.
    Withdraw(Units),
}

/// Reviews the `requested` bookings against the `current` ones, planning the
/// ledger movements required to honor them.
///
/// Every requested booking is checked against the [`Product`]'s re-booking
/// ceiling: its available units plus the units the current booking of the
/// same [`Product`] holds.
///
/// # Errors
///
/// - If some requested [`Product`] doesn't exist in `products`.
/// - If the same [`Product`] is requested more than once.
/// - If a requested booking exceeds its [`Product`]'s re-booking ceiling.
pub fn plan(
    requested: &[ItemRequest],
    current: &[LineItem],
    products: &HashMap<product::Id, Product>,
) -> Result<Plan, Error> {
    let current: HashMap<_, _> =
        current.iter().map(|item| (item.product_id, item)).collect();

    let mut seen = HashSet::with_capacity(requested.len());
    let mut items = Vec::with_capacity(requested.len());
    for req in requested {
        let product = products
            .get(&req.product_id)
            .ok_or(Error::ProductNotFound(req.product_id))?;
        if !seen.insert(req.product_id) {
            return Err(Error::DuplicateProduct(req.product_id));
        }

        let (prev, held) = current
            .get(&req.product_id)
            .map_or((0, 0), |item| (item.quantity.units(), item.held));
        let units = req.quantity.units();
        let ceiling = product.stock.capacity(prev);
        if units > ceiling {
            return Err(Error::InsufficientStock {
                name: product.name.clone(),
                available: ceiling,
                requested: units,
            });
        }

        let movement = match units.cmp(&prev) {
            Ordering::Greater => Movement::Withdraw(units - prev),
            Ordering::Less => Movement::Restore(prev - units),
            Ordering::Equal => Movement::Keep,
        };
        items.push(PlannedItem {
            product_id: req.product_id,
            quantity: req.quantity,
            held,
            movement,
        });
    }

    Ok(Plan { items })
}

/// Withdraws the full quantity of every booking of the given [`Reservation`]
/// from the `products`' ledgers, as happens when its rental period starts.
///
/// Each [`LineItem`] withdraws its quantity on top of whatever it already
/// holds.
///
/// # Errors
///
/// - If the [`Reservation`] is not [`Status::Pending`].
/// - If some booked [`Product`] is missing from `products`.
/// - If some [`Product`]'s ledger cannot cover its booking.
pub fn withdraw_all(
    reservation: &mut Reservation,
    products: &mut HashMap<product::Id, Product>,
) -> Result<(), Error> {
    if reservation.status != Status::Pending {
        return Err(Error::NotPending(reservation.status));
    }

    for item in &mut reservation.items {
        let product = products
            .get_mut(&item.product_id)
            .ok_or(Error::ProductNotFound(item.product_id))?;
        let units = item.quantity.units();
        product.stock.withdraw(units).map_err(|source| {
            Error::OutOfStock {
                code: product.code.clone(),
                source,
            }
        })?;
        item.held += units;
    }
    Ok(())
}

/// Returns the booked units of every [`LineItem`] of the given [`Reservation`]
/// to the `products`' ledgers, as happens on finalization or cancellation.
///
/// Callable regardless of the [`Reservation`]'s [`Status`].
///
/// # Errors
///
/// If some booked [`Product`] is missing from `products`.
pub fn release_all(
    reservation: &mut Reservation,
    products: &mut HashMap<product::Id, Product>,
) -> Result<(), Error> {
    for item in &mut reservation.items {
        release_item(item, products)?;
    }
    Ok(())
}

/// Returns the units booked by the given [`LineItem`] to its [`Product`]'s
/// ledger.
///
/// At most [`LineItem::held`] units are returned: a booking whose units were
/// never actually withdrawn releases nothing.
///
/// # Errors
///
/// If the booked [`Product`] is missing from `products`.
pub fn release_item(
    item: &mut LineItem,
    products: &mut HashMap<product::Id, Product>,
) -> Result<(), Error> {
    let product = products
        .get_mut(&item.product_id)
        .ok_or(Error::ProductNotFound(item.product_id))?;

    let units = item.quantity.units().min(item.held);
    product.stock.restore(units);
    item.held -= units;
    Ok(())
}

/// Error of reconciling [`Reservation`] bookings with [`Product`] stocks.
#[derive(Debug, Display, StdError)]
pub enum Error {
    /// Same [`Product`] is requested more than once.
    #[display("`Product(id: {_0})` is booked more than once")]
    DuplicateProduct(#[error(not(source))] product::Id),

    /// Requested booking exceeds what the [`Product`]'s [`Stock`] can cover.
    #[display("Stock insuficiente para '{name}' \
               (disponible: {available}, solicitado: {requested})")]
    InsufficientStock {
        /// [`Name`] of the [`Product`].
        ///
        /// [`Name`]: product::Name
        name: product::Name,

        /// Number of units available to the booking: the free ones plus the
        /// ones it holds already.
        available: Units,

        /// Number of units that were requested.
        requested: Units,
    },

    /// [`Reservation`] was expected to be [`Status::Pending`].
    #[display("`Reservation` is `{_0}`, not `PENDING`")]
    NotPending(#[error(not(source))] Status),

    /// [`Stock`] ledger cannot cover a booking.
    #[display("`Product({code})` is out of stock: {source}")]
    OutOfStock {
        /// [`Code`] of the [`Product`].
        ///
        /// [`Code`]: product::Code
        code: product::Code,

        /// Ledger failure itself.
        source: NotEnoughUnits,
    },

    /// Booked [`Product`] doesn't exist.
    #[display("`Product(id: {_0})` does not exist")]
    ProductNotFound(#[error(not(source))] product::Id),
}

#[cfg(test)]
mod spec {
    use std::collections::HashMap;

    use common::{money::Currency, DateTime, Money};

    use crate::domain::{
        product::{self, Code, HourlyRate, Name, Product, Stock},
        reservation::{LineItem, Quantity, Reservation, Status},
        user,
    };

    use super::{plan, release_all, withdraw_all, Error, ItemRequest};

    fn product(id: i64, available: u32, reserved: u32) -> Product {
        let name = Name::new(format!("Product {id}")).unwrap();
        let now = DateTime::now();
        Product {
            id: id.into(),
            code: Code::generate(&name),
            name,
            rate: HourlyRate::new(Money {
                amount: 100.into(),
                currency: Currency::Ars,
            })
            .unwrap(),
            stock: Stock {
                available,
                reserved,
            },
            created_at: now.coerce(),
            updated_at: None,
        }
    }

    fn named(mut product: Product, name: &str) -> Product {
        product.name = Name::new(name).unwrap();
        product
    }

    fn products(
        list: impl IntoIterator<Item = Product>,
    ) -> HashMap<product::Id, Product> {
        list.into_iter().map(|p| (p.id, p)).collect()
    }

    fn stock_of(products: &HashMap<product::Id, Product>, id: i64) -> Stock {
        products[&product::Id::from(id)].stock
    }

    fn request(product_id: i64, quantity: u32) -> ItemRequest {
        ItemRequest {
            product_id: product_id.into(),
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    fn item(product_id: i64, quantity: u32, held: u32) -> LineItem {
        LineItem {
            product_id: product_id.into(),
            quantity: Quantity::new(quantity).unwrap(),
            held,
        }
    }

    fn reservation(status: Status, items: Vec<LineItem>) -> Reservation {
        let now = DateTime::now();
        Reservation {
            id: 1.into(),
            code: crate::domain::reservation::Code::generate(7.into()),
            owner: user::User {
                id: 7.into(),
                username: user::Username::new("pato").unwrap(),
            },
            items,
            starts_at: now.coerce(),
            ends_at: now.coerce(),
            status,
            total: None,
            is_paid: false,
            created_at: now.coerce(),
        }
    }

    #[test]
    fn plans_withdrawal_for_new_booking() {
        let mut products = products([product(1, 10, 0)]);

        let plan = plan(&[request(1, 2)], &[], &products).unwrap();
        let items = plan.apply(&mut products).unwrap();

        let stock = stock_of(&products, 1);
        assert_eq!(stock.available, 8);
        assert_eq!(stock.reserved, 2);
        assert_eq!(items, vec![item(1, 2, 2)]);
    }

    #[test]
    fn plan_rejects_insufficient_stock() {
        let products =
            products([named(product(1, 1, 0), "Taladro percutor")]);

        let err = plan(&[request(1, 5)], &[], &products).unwrap_err();
        assert!(matches!(
            &err,
            Error::InsufficientStock {
                available: 1,
                requested: 5,
                ..
            },
        ));
        assert_eq!(
            err.to_string(),
            "Stock insuficiente para 'Taladro percutor' \
             (disponible: 1, solicitado: 5)",
        );
    }

    #[test]
    fn plan_rejects_duplicates_and_unknown_products() {
        let products = products([product(1, 10, 0)]);

        assert!(matches!(
            plan(&[request(1, 1), request(1, 2)], &[], &products),
            Err(Error::DuplicateProduct(_)),
        ));
        assert!(matches!(
            plan(&[request(2, 1)], &[], &products),
            Err(Error::ProductNotFound(_)),
        ));
    }

    #[test]
    fn plan_allows_rebooking_up_to_ceiling() {
        // 3 on the shelf and 2 already held: re-booking 5 hits the boundary.
        let mut products = products([product(1, 3, 2)]);
        let current = [item(1, 2, 2)];

        let plan = plan(&[request(1, 5)], &current, &products).unwrap();
        let items = plan.apply(&mut products).unwrap();

        let stock = stock_of(&products, 1);
        assert_eq!(stock.available, 0);
        assert_eq!(stock.reserved, 5);
        assert_eq!(items, vec![item(1, 5, 5)]);
    }

    #[test]
    fn plan_rejects_rebooking_over_ceiling() {
        let products = products([product(1, 3, 2)]);
        let current = [item(1, 2, 2)];

        assert!(matches!(
            plan(&[request(1, 6)], &current, &products),
            Err(Error::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }),
        ));
    }

    #[test]
    fn plans_restore_when_quantity_shrinks() {
        let mut products = products([product(1, 8, 2)]);
        let current = [item(1, 2, 2)];

        let plan = plan(&[request(1, 1)], &current, &products).unwrap();
        let items = plan.apply(&mut products).unwrap();

        let stock = stock_of(&products, 1);
        assert_eq!(stock.available, 9);
        assert_eq!(stock.reserved, 1);
        assert_eq!(items, vec![item(1, 1, 1)]);
    }

    #[test]
    fn withdraws_all_on_activation() {
        let mut products = products([product(1, 8, 2)]);
        let mut reservation =
            reservation(Status::Pending, vec![item(1, 2, 2)]);

        withdraw_all(&mut reservation, &mut products).unwrap();

        let stock = stock_of(&products, 1);
        assert_eq!(stock.available, 6);
        assert_eq!(stock.reserved, 4);
        assert_eq!(reservation.items, vec![item(1, 2, 4)]);
    }

    #[test]
    fn withdraw_all_requires_pending() {
        let mut products = products([product(1, 8, 2)]);
        let mut reservation =
            reservation(Status::Active, vec![item(1, 2, 2)]);

        assert!(matches!(
            withdraw_all(&mut reservation, &mut products),
            Err(Error::NotPending(Status::Active)),
        ));
        assert_eq!(stock_of(&products, 1).available, 8);
    }

    #[test]
    fn withdraw_all_fails_when_ledger_cannot_cover() {
        let mut products = products([product(1, 1, 2)]);
        let mut reservation =
            reservation(Status::Pending, vec![item(1, 2, 2)]);

        assert!(matches!(
            withdraw_all(&mut reservation, &mut products),
            Err(Error::OutOfStock { .. }),
        ));
    }

    #[test]
    fn releases_booked_quantity() {
        // An activated booking holds twice its quantity, yet releasing
        // returns only the quantity itself.
        let mut products = products([product(1, 6, 4)]);
        let mut reservation =
            reservation(Status::Active, vec![item(1, 2, 4)]);

        release_all(&mut reservation, &mut products).unwrap();

        let stock = stock_of(&products, 1);
        assert_eq!(stock.available, 8);
        assert_eq!(stock.reserved, 2);
        assert_eq!(reservation.items, vec![item(1, 2, 2)]);
    }

    #[test]
    fn releases_nothing_when_nothing_is_held() {
        let mut products = products([product(1, 10, 0)]);
        let mut reservation =
            reservation(Status::Pending, vec![item(1, 2, 0)]);

        release_all(&mut reservation, &mut products).unwrap();

        let stock = stock_of(&products, 1);
        assert_eq!(stock.available, 10);
        assert_eq!(stock.reserved, 0);
    }
}
