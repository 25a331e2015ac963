//! Business logic of the rental service.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::fmt::Debug;

use common::operations::{By, Start};
use derive_more::{Display, Error};

#[cfg(doc)]
use infra::Database;

pub use self::{command::Command, query::Query, task::Task};

/// Configuration of a [`Service`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// [`task::SweepReservations`] configuration.
    pub sweep_reservations: task::sweep_reservations::Config,
}

/// Rental service, implementing all its [`Command`]s, [`Query`]s and
/// [`Task`]s on top of a [`Database`].
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] backing this [`Service`].
    database: Db,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`], along with the [`task::Background`] driving
    /// its periodic [`Task`]s, which should be polled to completion.
    pub fn new(config: Config, database: Db) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::SweepReservations<Self>,
                        task::sweep_reservations::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service { config, database };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(svc.config().sweep_reservations)))
                .await
        });

        (this, bg)
    }

    /// Returns the [`Config`] this [`Service`] was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the [`Database`] backing this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}

/// Shortcut for the error of starting a [`Task`].
type TaskStartError<Svc, T, Args> = <Svc as Task<Start<By<T, Args>>>>::Err;

/// Error of starting up a [`Service`].
#[derive(Debug, Display, Error)]
pub enum StartupError<Svc>
where
    Svc: Task<
        Start<
            By<
                task::SweepReservations<Svc>,
                task::sweep_reservations::Config,
            >,
        >,
        Err: Debug,
    >,
{
    /// [`task::SweepReservations`] failed to start.
    SweepReservationsTask(
        TaskStartError<
            Svc,
            task::SweepReservations<Svc>,
            task::sweep_reservations::Config,
        >,
    ),
}
