//! Domain definitions.

pub mod product;
pub mod reservation;
pub mod user;

pub use self::{product::Product, reservation::Reservation, user::User};
