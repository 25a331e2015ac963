//! [`Command`] for editing an existing [`Product`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
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

/// [`Command`] for editing an existing [`Product`].
///
/// Overwrites the [`Name`], the [`HourlyRate`] and the whole [`Stock`] ledger,
/// and regenerates the [`Code`] from the new [`Name`].
///
/// [`Code`]: product::Code
/// [`HourlyRate`]: product::HourlyRate
/// [`Name`]: product::Name
/// [`Stock`]: product::Stock
#[derive(Clone, Debug)]
pub struct EditProduct {
    /// ID of the [`Product`] to edit.
    pub product_id: product::Id,

    /// New [`Name`] of the [`Product`].
    ///
    /// [`Name`]: product::Name
    pub name: product::Name,

    /// New [`HourlyRate`] of the [`Product`].
    ///
    /// [`HourlyRate`]: product::HourlyRate
    pub rate: product::HourlyRate,

    /// New [`Stock`] ledger of the [`Product`].
    ///
    /// [`Stock`]: product::Stock
    pub stock: product::Stock,
}

impl<Db> Command<EditProduct> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Product>, product::Id>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Product>, product::Name>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Product, product::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Product>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Product;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: EditProduct) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let EditProduct {
            product_id,
            name,
            rate,
            stock,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Product`.
        tx.execute(Lock(By::new(product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut product = tx
            .execute(Select(By::<Option<Product>, _>::new(product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProductNotExists(product_id))
            .map_err(tracerr::wrap!())?;

        // Uniqueness is only re-checked when the `Name` actually changes,
        // comparing ignoring case.
        let renamed = AsRef::<str>::as_ref(&name).to_lowercase()
            != AsRef::<str>::as_ref(&product.name).to_lowercase();
        if renamed {
            let taken = tx
                .execute(Select(By::<Option<Product>, _>::new(name.clone())))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .is_some();
            if taken {
                return Err(tracerr::new!(E::NameTaken(name)));
            }
        }

        product.code = product::Code::generate(&name);
        product.name = name;
        product.rate = rate;
        product.stock = stock;
        product.updated_at = Some(DateTime::now().coerce());

        tx.execute(Update(product.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(product)
    }
}

/// Error of [`EditProduct`] [`Command`] execution.
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

    /// [`Product`] with the provided ID does not exist.
    #[display("`Product(id: {_0})` does not exist")]
    ProductNotExists(#[error(not(source))] product::Id),
}

#[cfg(all(test, feature = "in-memory"))]
mod spec {
    use std::time::Duration;

    use common::{money::Currency, Money};
    use rust_decimal::Decimal;

    use crate::{
        command::CreateProduct,
        domain::product::{self, Stock},
        infra::{in_memory::Store, InMemory},
        task, Command as _, Config, Service,
    };

    use super::{EditProduct, ExecutionError};

    fn service() -> Service<InMemory> {
        Service {
            config: Config {
                sweep_reservations: task::sweep_reservations::Config {
                    interval: Duration::from_secs(60),
                },
            },
            database: InMemory::new(Store::new()),
        }
    }

    fn rate(amount: impl Into<Decimal>) -> product::HourlyRate {
        product::HourlyRate::new(Money {
            amount: amount.into(),
            currency: Currency::Ars,
        })
        .unwrap()
    }

    async fn seed(svc: &Service<InMemory>, name: &str) -> product::Product {
        svc.execute(CreateProduct {
            name: product::Name::new(name).unwrap(),
            rate: rate(100),
            stock: Stock {
                available: 10,
                reserved: 0,
            },
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn overwrites_fields_and_regenerates_code() {
        let svc = service();
        let product = seed(&svc, "Taladro percutor").await;

        let edited = svc
            .execute(EditProduct {
                product_id: product.id,
                name: product::Name::new("Sierra circular").unwrap(),
                rate: rate(150),
                stock: Stock {
                    available: 4,
                    reserved: 1,
                },
            })
            .await
            .unwrap();

        assert_eq!(AsRef::<str>::as_ref(&edited.name), "Sierra circular");
        assert_eq!(Money::from(edited.rate).amount, 150.into());
        assert_eq!(edited.stock.available, 4);
        assert_eq!(edited.stock.reserved, 1);
        assert_ne!(edited.code, product.code);
        assert!(edited.updated_at.is_some());
    }

    #[tokio::test]
    async fn allows_keeping_own_name() {
        let svc = service();
        let product = seed(&svc, "Taladro percutor").await;

        let edited = svc
            .execute(EditProduct {
                product_id: product.id,
                name: product::Name::new("TALADRO PERCUTOR").unwrap(),
                rate: rate(100),
                stock: product.stock,
            })
            .await
            .unwrap();

        assert_eq!(AsRef::<str>::as_ref(&edited.name), "TALADRO PERCUTOR");
    }

    #[tokio::test]
    async fn rejects_name_of_another_product() {
        let svc = service();
        let product = seed(&svc, "Taladro percutor").await;
        let _ = seed(&svc, "Sierra circular").await;

        let err = svc
            .execute(EditProduct {
                product_id: product.id,
                name: product::Name::new("SIERRA circular").unwrap(),
                rate: rate(100),
                stock: product.stock,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NameTaken(_)));
    }

    #[tokio::test]
    async fn rejects_unknown_product() {
        let svc = service();

        let err = svc
            .execute(EditProduct {
                product_id: 9000.into(),
                name: product::Name::new("Taladro percutor").unwrap(),
                rate: rate(100),
                stock: Stock {
                    available: 1,
                    reserved: 0,
                },
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ProductNotExists(_)));
    }
}
