//! [`Reservation`] definitions.

pub mod pricing;
pub mod reconcile;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
use regex::Regex;
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Product;
use crate::domain::{product, user};

/// Booking of [`Product`] units by a [`User`] over a time window.
///
/// [`User`]: user::User
#[derive(Clone, Debug)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: Id,

    /// Unique [`Code`] of this [`Reservation`].
    pub code: Code,

    /// [`User`] this [`Reservation`] belongs to.
    ///
    /// [`User`]: user::User
    pub owner: user::User,

    /// [`Product`] units booked by this [`Reservation`].
    ///
    /// Never mentions the same [`Product`] twice.
    pub items: Vec<LineItem>,

    /// [`DateTime`] when the rental period of this [`Reservation`] starts.
    pub starts_at: StartDateTime,

    /// [`DateTime`] when the rental period of this [`Reservation`] ends.
    pub ends_at: EndDateTime,

    /// Current [`Status`] of this [`Reservation`].
    pub status: Status,

    /// Total price of this [`Reservation`], if any [`LineItem`]s are booked.
    pub total: Option<Money>,

    /// Indicator whether this [`Reservation`] has been paid.
    pub is_paid: bool,

    /// [`DateTime`] when this [`Reservation`] was created.
    pub created_at: CreationDateTime,
}

impl Reservation {
    /// Marks this [`Reservation`] as [`Status::Active`], meaning its booked
    /// units are out with the customer.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is not [`Status::Pending`].
    pub fn activate(&mut self) -> Result<(), TransitionError> {
        if self.status != Status::Pending {
            return Err(TransitionError::NotPending(self.status));
        }
        self.status = Status::Active;
        Ok(())
    }

    /// Marks this [`Reservation`] as [`Status::Finalized`], meaning its
    /// rental period is over.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is not [`Status::Active`].
    pub fn finalize(&mut self) -> Result<(), TransitionError> {
        if self.status != Status::Active {
            return Err(TransitionError::NotActive(self.status));
        }
        self.status = Status::Finalized;
        Ok(())
    }

    /// Marks this [`Reservation`] as [`Status::Canceled`].
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] has already run its course: canceling a
    /// [`Status::Canceled`] or [`Status::Finalized`] one is rejected.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        match self.status {
            Status::Canceled => Err(TransitionError::AlreadyCanceled),
            Status::Finalized => Err(TransitionError::AlreadyFinalized),
            Status::Pending | Status::Active => {
                self.status = Status::Canceled;
                Ok(())
            }
        }
    }

    /// Returns IDs of all the [`Product`]s booked by this [`Reservation`].
    pub fn product_ids(&self) -> impl Iterator<Item = product::Id> + '_ {
        self.items.iter().map(|item| item.product_id)
    }
}

/// [`Reservation`] to be created.
#[derive(Clone, Debug)]
pub struct Draft {
    /// [`Code`] of the [`Reservation`].
    pub code: Code,

    /// [`User`] the [`Reservation`] belongs to.
    ///
    /// [`User`]: user::User
    pub owner: user::User,

    /// [`Product`] units booked by the [`Reservation`].
    pub items: Vec<LineItem>,

    /// [`DateTime`] when the rental period starts.
    pub starts_at: StartDateTime,

    /// [`DateTime`] when the rental period ends.
    pub ends_at: EndDateTime,

    /// Initial [`Status`] of the [`Reservation`].
    pub status: Status,

    /// Total price of the [`Reservation`].
    pub total: Option<Money>,

    /// Indicator whether the [`Reservation`] has been paid.
    pub is_paid: bool,

    /// [`DateTime`] when the [`Reservation`] is created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Reservation`].
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

/// One [`Product`] booking within a [`Reservation`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineItem {
    /// ID of the booked [`Product`].
    pub product_id: product::Id,

    /// Number of booked units.
    pub quantity: Quantity,

    /// Number of units this [`LineItem`] holds against the [`Product`]'s
    /// stock ledger.
    ///
    /// Kept in step with every ledger movement this [`LineItem`] causes, so
    /// releasing never returns more units than were actually withdrawn.
    pub held: product::Units,
}

/// Number of units of a single [`Product`] booked by a [`LineItem`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Quantity(product::Units);

impl Quantity {
    /// Creates a new [`Quantity`] if the given number of `units` is valid.
    #[must_use]
    pub fn new(units: product::Units) -> Option<Self> {
        (units > 0).then_some(Self(units))
    }

    /// Returns the number of units this [`Quantity`] books.
    #[must_use]
    pub const fn units(self) -> product::Units {
        self.0
    }
}

/// Unique code of a [`Reservation`].
///
/// Derived from the owning [`user::Id`] rather than provided by callers.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, Into, PartialEq)]
#[as_ref(str, String)]
pub struct Code(String);

impl Code {
    /// Generates a new [`Code`] for a [`Reservation`] owned by the given
    /// [`user::Id`]: the `RES-` prefix, the owner's ID, and a random
    /// 4-character suffix.
    #[must_use]
    pub fn generate(owner: user::Id) -> Self {
        Self(format!("RES-{owner}-{}", suffix()))
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
        /// - Must start with the `RES-` prefix;
        /// - Must carry the decimal ID of the owning [`user::Id`];
        /// - Must end with a 4-character uppercase alphanumeric suffix.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^RES-\d+-[A-Z0-9]{4}$").expect("valid regex")
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

define_kind! {
    #[doc = "Status of a [`Reservation`]'s lifecycle."]
    enum Status {
        #[doc = "Created and waiting for its rental period to begin."]
        Pending = 1,

        #[doc = "Rental period underway, booked units are out with the \
                 customer."]
        Active = 2,

        #[doc = "Rental period over, booked units returned to the stock."]
        Finalized = 3,

        #[doc = "Called off before running its course."]
        Canceled = 4,
    }
}

/// Error of an invalid [`Status`] transition of a [`Reservation`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum TransitionError {
    /// [`Reservation`] is already [`Status::Canceled`].
    #[display("`Reservation` is already canceled")]
    AlreadyCanceled,

    /// [`Reservation`] is already [`Status::Finalized`].
    #[display("`Reservation` is already finalized")]
    AlreadyFinalized,

    /// [`Reservation`] was expected to be [`Status::Active`].
    #[display("`Reservation` is `{_0}`, not `ACTIVE`")]
    NotActive(#[error(not(source))] Status),

    /// [`Reservation`] was expected to be [`Status::Pending`].
    #[display("`Reservation` is `{_0}`, not `PENDING`")]
    NotPending(#[error(not(source))] Status),
}

/// Generates a random 4-character uppercase alphanumeric suffix for a
/// [`Code`].
fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..4].to_uppercase()
}

/// [`DateTime`] when a [`Reservation`] was created.
pub type CreationDateTime = DateTimeOf<(Reservation, unit::Creation)>;

/// [`DateTime`] when a [`Reservation`]'s rental period starts.
pub type StartDateTime = DateTimeOf<(Reservation, unit::Start)>;

/// [`DateTime`] when a [`Reservation`]'s rental period ends.
pub type EndDateTime = DateTimeOf<(Reservation, unit::End)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::domain::user;

    use super::{Code, Quantity, Reservation, Status, TransitionError};

    fn reservation(status: Status) -> Reservation {
        let now = DateTime::now();
        Reservation {
            id: 1.into(),
            code: Code::generate(7.into()),
            owner: user::User {
                id: 7.into(),
                username: user::Username::new("pato").unwrap(),
            },
            items: vec![],
            starts_at: now.coerce(),
            ends_at: now.coerce(),
            status,
            total: None,
            is_paid: false,
            created_at: now.coerce(),
        }
    }

    #[test]
    fn activate() {
        let mut pending = reservation(Status::Pending);
        pending.activate().unwrap();
        assert_eq!(pending.status, Status::Active);

        let mut canceled = reservation(Status::Canceled);
        assert!(matches!(
            canceled.activate(),
            Err(TransitionError::NotPending(Status::Canceled)),
        ));
        assert_eq!(canceled.status, Status::Canceled);
    }

    #[test]
    fn finalize() {
        let mut active = reservation(Status::Active);
        active.finalize().unwrap();
        assert_eq!(active.status, Status::Finalized);

        let mut pending = reservation(Status::Pending);
        assert!(matches!(
            pending.finalize(),
            Err(TransitionError::NotActive(Status::Pending)),
        ));
    }

    #[test]
    fn cancel() {
        let mut pending = reservation(Status::Pending);
        pending.cancel().unwrap();
        assert_eq!(pending.status, Status::Canceled);

        let mut active = reservation(Status::Active);
        active.cancel().unwrap();
        assert_eq!(active.status, Status::Canceled);

        assert!(matches!(
            pending.cancel(),
            Err(TransitionError::AlreadyCanceled),
        ));

        let mut finalized = reservation(Status::Finalized);
        assert!(matches!(
            finalized.cancel(),
            Err(TransitionError::AlreadyFinalized),
        ));
        assert_eq!(finalized.status, Status::Finalized);
    }

    #[test]
    fn code_generation() {
        let code = Code::generate(42.into());
        assert!(
            AsRef::<str>::as_ref(&code).starts_with("RES-42-"),
            "unexpected code: {code}",
        );
        assert!(Code::new(String::from(code)).is_some());

        assert!(Code::new("RES-1-9AB0").is_some());
        assert!(Code::new("RES--9AB0").is_none());
        assert!(Code::new("RES-1-9ab0").is_none());
    }

    #[test]
    fn quantity() {
        assert_eq!(Quantity::new(1).map(Quantity::units), Some(1));
        assert_eq!(Quantity::new(0), None);
    }

    #[test]
    fn status_display() {
        assert_eq!(Status::Pending.to_string(), "PENDING");
        assert_eq!(Status::Finalized.to_string(), "FINALIZED");
        assert_eq!("ACTIVE".parse(), Ok(Status::Active));
    }
}
