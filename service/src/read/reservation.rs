//! [`Reservation`]-related read definitions.

use crate::domain::reservation::{EndDateTime, StartDateTime};
#[cfg(doc)]
use crate::domain::{reservation::Status, Reservation};

/// Selector of [`Status::Pending`] [`Reservation`]s whose rental period has
/// started: those with a start time at or before the given one.
#[derive(Clone, Copy, Debug)]
pub struct DueToActivate(pub StartDateTime);

/// Selector of [`Status::Active`] [`Reservation`]s whose rental period has
/// run out: those with an end time at or before the given one.
#[derive(Clone, Copy, Debug)]
pub struct DueToFinalize(pub EndDateTime);
