//! [`Product`] definitions.

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
use regex::Regex;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Product rentable by the hour, tracked by a [`Stock`] ledger.
#[derive(Clone, Debug)]
pub struct Product {
    /// ID of this [`Product`].
    pub id: Id,

    /// Unique [`Code`] of this [`Product`].
    pub code: Code,

    /// [`Name`] of this [`Product`].
    pub name: Name,

    /// [`HourlyRate`] charged for renting a single unit of this [`Product`].
    pub rate: HourlyRate,

    /// [`Stock`] ledger of this [`Product`].
    pub stock: Stock,

    /// [`DateTime`] when this [`Product`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Product`] was last updated, if it ever was.
    pub updated_at: Option<UpdateDateTime>,
}

/// [`Product`] to be created.
#[derive(Clone, Debug)]
pub struct Draft {
    /// [`Code`] of the [`Product`].
    pub code: Code,

    /// [`Name`] of the [`Product`].
    pub name: Name,

    /// [`HourlyRate`] of the [`Product`].
    pub rate: HourlyRate,

    /// Initial [`Stock`] ledger of the [`Product`].
    pub stock: Stock,

    /// [`DateTime`] when the [`Product`] is created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Product`].
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct Id(i64);

/// Number of physical units of a [`Product`].
pub type Units = u32;

/// Stock ledger of a [`Product`].
///
/// Units only ever move between the two counters, so neither of them can go
/// negative.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Stock {
    /// Number of units sitting on the shelf, available for renting.
    pub available: Units,

    /// Number of units out with customers.
    pub reserved: Units,
}

impl Stock {
    /// Moves the given number of `units` from [`Stock::available`] to
    /// [`Stock::reserved`].
    ///
    /// # Errors
    ///
    /// If less units are available than requested. The ledger is left
    /// untouched in this case.
    pub fn withdraw(&mut self, units: Units) -> Result<(), NotEnoughUnits> {
        let Some(remaining) = self.available.checked_sub(units) else {
            return Err(NotEnoughUnits {
                available: self.available,
                requested: units,
            });
        };
        self.available = remaining;
        self.reserved += units;
        Ok(())
    }

    /// Returns the given number of `units` back to [`Stock::available`].
    ///
    /// More units than [`Stock::reserved`] may be returned: the reserved
    /// counter bottoms out at zero, while the available one grows by the full
    /// amount.
    pub fn restore(&mut self, units: Units) {
        self.available += units;
        self.reserved = self.reserved.saturating_sub(units);
    }

    /// Maximum number of units a booking already holding `held` of them may
    /// request: the held ones are returned to the shelf before being taken
    /// again.
    #[must_use]
    pub const fn capacity(&self, held: Units) -> Units {
        self.available.saturating_add(held)
    }
}

/// Error of moving more units out of a [`Stock`] than are available.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("{requested} unit(s) requested with only {available} available")]
pub struct NotEnoughUnits {
    /// Number of units that were available.
    pub available: Units,

    /// Number of units that were requested.
    pub requested: Units,
}

/// Unique code of a [`Product`].
///
/// Derived from the [`Name`] rather than provided by callers.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, Into, PartialEq)]
#[as_ref(str, String)]
pub struct Code(String);

impl Code {
    /// Generates a new [`Code`] out of the given [`Name`]: the `PROD-`
    /// prefix, up to 3 leading alphanumeric characters of the [`Name`]
    /// (uppercased), and a random 4-character suffix.
    #[must_use]
    pub fn generate(name: &Name) -> Self {
        let prefix: String = name
            .0
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .take(3)
            .collect();
        Self(format!("PROD-{prefix}-{}", suffix()))
    }

    /// Creates a new [`Code`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `code` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Creates a new [`Code`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`Code`].
    fn check(code: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Code`] invariants:
        /// - Must start with the `PROD-` prefix;
        /// - Must carry up to 3 uppercase alphanumeric characters of the
        ///   [`Name`];
        /// - Must end with a 4-character uppercase alphanumeric suffix.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^PROD-[A-Z0-9]{0,3}-[A-Z0-9]{4}$")
                .expect("valid regex")
        });

        REGEX.is_match(code.as_ref())
    }
}

impl FromStr for Code {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Code`")
    }
}

/// Name of a [`Product`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Price charged for renting a single unit of a [`Product`] per whole hour.
#[derive(Clone, Copy, Debug, Display, Eq, Into, PartialEq)]
pub struct HourlyRate(Money);

impl HourlyRate {
    /// Creates a new [`HourlyRate`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `price` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(price: Money) -> Self {
        Self(price)
    }

    /// Creates a new [`HourlyRate`] if the given `price` is valid.
    #[must_use]
    pub fn new(price: Money) -> Option<Self> {
        Self::check(&price).then_some(Self(price))
    }

    /// Checks whether the given `price` is a valid [`HourlyRate`]:
    /// - Must not be negative;
    /// - Must be below 100000;
    /// - Must not be more precise than 2 decimal places.
    fn check(price: &Money) -> bool {
        price.amount >= Decimal::ZERO
            && price.amount < Decimal::from(100_000)
            && price.amount.normalize().scale() <= 2
    }
}

/// Generates a random 4-character uppercase alphanumeric suffix for a
/// [`Code`].
fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..4].to_uppercase()
}

/// [`DateTime`] when a [`Product`] was created.
pub type CreationDateTime = DateTimeOf<(Product, unit::Creation)>;

/// [`DateTime`] when a [`Product`] was last updated.
pub type UpdateDateTime = DateTimeOf<(Product, unit::Update)>;
