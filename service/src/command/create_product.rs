//! [`Command`] for creating a new [`Product`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{product, Product},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Product`].
#[derive(Clone, Debug)]
pub struct CreateProduct {
    /// [`Name`] of the new [`Product`].
    ///
    /// [`Name`]: product::Name
    pub name: product::Name,

    /// [`HourlyRate`] charged for renting a unit of the new [`Product`].
    ///
    /// [`HourlyRate`]: product::HourlyRate
    pub rate: product::HourlyRate,

    /// Initial [`Stock`] ledger of the new [`Product`].
    ///
    /// [`Stock`]: product::Stock
    pub stock: product::Stock,
}

impl<Db> Command<CreateProduct> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Product>, product::Name>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<product::Draft>,
            Ok = Product,
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Product;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateProduct) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateProduct { name, rate, stock } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // `Name`s are unique ignoring case.
        let existing = tx
            .execute(Select(By::new(name.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::NameTaken(name)));
        }

        let product = tx
            .execute(Insert(product::Draft {
                code: product::Code::generate(&name),
                name,
                rate,
                stock,
                created_at: DateTime::now().coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(product)
    }
}

/// Error of [`CreateProduct`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Another [`Product`] already carries the provided [`Name`].
    ///
    /// [`Name`]: product::Name
    #[display("`Product` named '{_0}' already exists")]
    NameTaken(#[error(not(source))] product::Name),
}
