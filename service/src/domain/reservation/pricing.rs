//! Price calculation of a [`Reservation`].

use std::collections::HashMap;

use common::{money::Currency, DateTime, Money};
use derive_more::{Display, Error as StdError};
use rust_decimal::Decimal;

use crate::domain::product;

use super::{EndDateTime, LineItem, StartDateTime};
#[cfg(doc)]
use crate::domain::{Product, Reservation};

/// Whole hours a [`Reservation`]'s rental period spans.
pub type Hours = u64;

/// Calculates the number of whole [`Hours`] between the given instants,
/// truncating any fraction of an hour.
///
/// # Errors
///
/// If the period is not positive, or spans less than one whole hour.
pub fn duration(
    starts_at: StartDateTime,
    ends_at: EndDateTime,
) -> Result<Hours, Error> {
    let starts_at: DateTime = starts_at.coerce();
    let ends_at: DateTime = ends_at.coerce();
    if ends_at <= starts_at {
        return Err(Error::InvalidDuration);
    }

    let hours = (ends_at - starts_at).as_secs() / 3600;
    if hours == 0 {
        return Err(Error::InvalidDuration);
    }
    Ok(hours)
}

/// Calculates the total price of the given [`LineItem`]s over the given
/// number of [`Hours`].
///
/// Every [`LineItem`] is priced with the rate its [`Product`] carries right
/// now, not the one it carried when the item was booked. [`None`] is returned
/// for an empty list of [`LineItem`]s.
///
/// # Errors
///
/// - If some [`LineItem`] books a [`Product`] missing from `products`.
/// - If the booked [`Product`]s are priced in different [`Currency`]s.
pub fn total(
    items: &[LineItem],
    products: &HashMap<product::Id, product::Product>,
    hours: Hours,
) -> Result<Option<Money>, Error> {
    let mut total: Option<Money> = None;

    for item in items {
        let product = products
            .get(&item.product_id)
            .ok_or(Error::ProductNotFound(item.product_id))?;

        let rate = Money::from(product.rate);
        let subtotal = rate.amount
            * Decimal::from(hours)
            * Decimal::from(item.quantity.units());

        total = Some(match total {
            None => Money {
                amount: subtotal,
                currency: rate.currency,
            },
            Some(sum) => {
                if sum.currency != rate.currency {
                    return Err(Error::CurrencyMismatch {
                        expected: sum.currency,
                        found: rate.currency,
                    });
                }
                Money {
                    amount: sum.amount + subtotal,
                    currency: sum.currency,
                }
            }
        });
    }

    Ok(total)
}

/// Error of calculating a [`Reservation`]'s price.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Booked [`Product`]s are priced in different [`Currency`]s.
    #[display("`Product`s are priced in `{expected}` and `{found}`")]
    CurrencyMismatch {
        /// [`Currency`] of the [`LineItem`]s priced so far.
        expected: Currency,

        /// Diverging [`Currency`].
        found: Currency,
    },

    /// Rental period doesn't span a positive number of whole hours.
    #[display("rental period must span at least one whole hour")]
    InvalidDuration,

    /// [`LineItem`] books a [`Product`] that doesn't exist.
    #[display("`Product(id: {_0})` does not exist")]
    ProductNotFound(#[error(not(source))] product::Id),
}

#[cfg(test)]
mod spec {
    use std::{collections::HashMap, time::Duration};

    use common::{money::Currency, DateTime, Money};
    use rust_decimal::Decimal;

    use crate::domain::{
        product::{self, Code, HourlyRate, Name, Product, Stock},
        reservation::{LineItem, Quantity},
    };

    use super::{duration, total, Error};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: i64, rate: &str, currency: Currency) -> Product {
        let name = Name::new(format!("Product {id}")).unwrap();
        let now = DateTime::now();
        Product {
            id: id.into(),
            code: Code::generate(&name),
            name,
            rate: HourlyRate::new(Money {
                amount: decimal(rate),
                currency,
            })
            .unwrap(),
            stock: Stock {
                available: 10,
                reserved: 0,
            },
            created_at: now.coerce(),
            updated_at: None,
        }
    }

    fn item(product_id: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: product_id.into(),
            quantity: Quantity::new(quantity).unwrap(),
            held: quantity,
        }
    }

    fn products(
        list: impl IntoIterator<Item = Product>,
    ) -> HashMap<product::Id, Product> {
        list.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn duration_truncates_to_whole_hours() {
        let start = DateTime::now();

        let end = start + Duration::from_secs(3 * 3600);
        assert_eq!(duration(start.coerce(), end.coerce()).unwrap(), 3);

        let end = start + Duration::from_secs(3 * 3600 + 59 * 60);
        assert_eq!(duration(start.coerce(), end.coerce()).unwrap(), 3);
    }

    #[test]
    fn duration_requires_positive_whole_hours() {
        let start = DateTime::now();

        let end = start + Duration::from_secs(59 * 60);
        assert!(matches!(
            duration(start.coerce(), end.coerce()),
            Err(Error::InvalidDuration),
        ));

        assert!(matches!(
            duration(start.coerce(), start.coerce()),
            Err(Error::InvalidDuration),
        ));

        let end = start - Duration::from_secs(3600);
        assert!(matches!(
            duration(start.coerce(), end.coerce()),
            Err(Error::InvalidDuration),
        ));
    }

    #[test]
    fn totals_rate_by_hours_and_quantity() {
        let products = products([product(1, "100", Currency::Ars)]);

        assert_eq!(
            total(&[item(1, 2)], &products, 3).unwrap(),
            Some(Money {
                amount: decimal("600"),
                currency: Currency::Ars,
            }),
        );
    }

    #[test]
    fn totals_multiple_items() {
        let products = products([
            product(1, "100", Currency::Ars),
            product(2, "0.50", Currency::Ars),
        ]);

        assert_eq!(
            total(&[item(1, 1), item(2, 4)], &products, 2).unwrap(),
            Some(Money {
                amount: decimal("204"),
                currency: Currency::Ars,
            }),
        );
    }

    #[test]
    fn totals_zero_rate_as_zero() {
        let products = products([product(1, "0", Currency::Ars)]);

        assert_eq!(
            total(&[item(1, 3)], &products, 5).unwrap(),
            Some(Money {
                amount: decimal("0"),
                currency: Currency::Ars,
            }),
        );
    }

    #[test]
    fn totals_empty_items_as_none() {
        assert_eq!(total(&[], &HashMap::new(), 3).unwrap(), None);
    }

    #[test]
    fn total_requires_known_products() {
        let products = products([product(1, "100", Currency::Ars)]);

        assert!(matches!(
            total(&[item(2, 1)], &products, 3),
            Err(Error::ProductNotFound(id)) if id == 2.into(),
        ));
    }

    #[test]
    fn total_requires_single_currency() {
        let products = products([
            product(1, "100", Currency::Ars),
            product(2, "100", Currency::Usd),
        ]);

        assert!(matches!(
            total(&[item(1, 1), item(2, 1)], &products, 3),
            Err(Error::CurrencyMismatch {
                expected: Currency::Ars,
                found: Currency::Usd,
            }),
        ));
    }
}
