//! Infrastructure layer.

pub mod database;

pub use self::database::Database;
#[cfg(feature = "in-memory")]
pub use self::database::{in_memory, InMemory};
