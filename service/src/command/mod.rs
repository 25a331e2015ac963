//! [`Command`] definition.

pub mod cancel_reservation;
pub mod create_product;
pub mod create_reservation;
pub mod delete_product;
pub mod delete_reservation;
pub mod edit_product;
pub mod edit_reservation;
pub mod remove_reservation_items;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    cancel_reservation::CancelReservation, create_product::CreateProduct,
    create_reservation::CreateReservation, delete_product::DeleteProduct,
    delete_reservation::DeleteReservation, edit_product::EditProduct,
    edit_reservation::EditReservation,
    remove_reservation_items::RemoveReservationItems,
};
