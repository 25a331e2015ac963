//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;

use crate::define_kind;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

// Renders as `{amount}{currency}` with insignificant zeros stripped, so the
// same value always renders the same way.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount.normalize(), self.currency)
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code_starts = s
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or("no currency code")?;
        let (amount, currency) = s.split_at(code_starts);

        Ok(Self {
            amount: Decimal::from_str(amount).map_err(|_| "invalid amount")?,
            currency: Currency::from_str(currency)
                .map_err(|_| "invalid currency code")?,
        })
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "US Dollar."]
        Usd = 1,

        #[doc = "Euro."]
        Eur = 2,

        #[doc = "Argentine Peso."]
        Ars = 3,
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Currency, Money};

    fn money(amount: &str, currency: Currency) -> Money {
        Money {
            amount: Decimal::from_str(amount).unwrap(),
            currency,
        }
    }

    #[test]
    fn parses_amount_followed_by_currency_code() {
        assert_eq!(
            Money::from_str("123.45ARS").unwrap(),
            money("123.45", Currency::Ars),
        );
        assert_eq!(
            Money::from_str("-7USD").unwrap(),
            money("-7", Currency::Usd),
        );
        assert_eq!(Money::from_str("0EUR").unwrap(), money("0", Currency::Eur));
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", "123.45", "ARS", "123.45Ar", "123,45ARS", "xARS"] {
            assert!(
                Money::from_str(input).is_err(),
                "`{input}` parsed unexpectedly",
            );
        }
    }

    #[test]
    fn renders_without_insignificant_zeros() {
        assert_eq!(money("100.00", Currency::Ars).to_string(), "100ARS");
        assert_eq!(money("123.4500", Currency::Usd).to_string(), "123.45USD");
        assert_eq!(money("0.50", Currency::Eur).to_string(), "0.5EUR");
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let money = money("123.45", Currency::Ars);

        assert_eq!(Money::from_str(&money.to_string()).unwrap(), money);
    }
}
