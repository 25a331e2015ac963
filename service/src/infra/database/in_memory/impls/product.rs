//! [`Product`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{product, Product},
    infra::{
        database::{
            self,
            in_memory::{self, Access},
            InMemory,
        },
        Database,
    },
    read,
};

impl<A> Database<Insert<product::Draft>> for InMemory<A>
where
    A: Access,
{
    type Ok = Product;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(draft): Insert<product::Draft>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .with(|data| {
                let product::Draft {
                    code,
                    name,
                    rate,
                    stock,
                    created_at,
                } = draft;
                let product = Product {
                    id: data.next_product_id(),
                    code,
                    name,
                    rate,
                    stock,
                    created_at,
                    updated_at: None,
                };
                drop(data.products.insert(product.id, product.clone()));
                product
            })
            .await)
    }
}

impl<A> Database<Update<Product>> for InMemory<A>
where
    A: Access,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(product): Update<Product>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|data| {
            let stored = data
                .products
                .get_mut(&product.id)
                .ok_or(in_memory::Error::ProductNotFound(product.id))?;
            *stored = product;
            Ok(())
        })
        .await
        .map_err(tracerr::from_and_wrap!(in_memory::Error => database::Error))
    }
}

impl<A> Database<Delete<By<Product, product::Id>>> for InMemory<A>
where
    A: Access,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Product, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|data| {
            data.products
                .remove(&id)
                .map(drop)
                .ok_or(in_memory::Error::ProductNotFound(id))
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<A, IDs> Database<Select<By<HashMap<product::Id, Product>, IDs>>>
    for InMemory<A>
where
    A: Access,
    IDs: AsRef<[product::Id]>,
{
    type Ok = HashMap<product::Id, Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<product::Id, Product>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[product::Id] = ids.as_ref();
        Ok(self
            .with(|data| {
                ids.iter()
                    .filter_map(|id| {
                        data.products.get(id).map(|p| (*id, p.clone()))
                    })
                    .collect()
            })
            .await)
    }
}

impl<A> Database<Select<By<Option<Product>, product::Id>>> for InMemory<A>
where
    A: Access,
    Self: Database<
        Select<By<HashMap<product::Id, Product>, [product::Id; 1]>>,
        Ok = HashMap<product::Id, Product>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<A> Database<Select<By<Option<Product>, product::Name>>> for InMemory<A>
where
    A: Access,
{
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, product::Name>>,
    ) -> Result<Self::Ok, Self::Err> {
        let name = by.into_inner();
        let name = AsRef::<str>::as_ref(&name).to_lowercase();
        Ok(self
            .with(|data| {
                data.products
                    .values()
                    .find(|p| {
                        AsRef::<str>::as_ref(&p.name).to_lowercase() == name
                    })
                    .cloned()
            })
            .await)
    }
}

impl<A> Database<Select<By<Vec<Product>, ()>>> for InMemory<A>
where
    A: Access,
{
    type Ok = Vec<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Product>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let () = by.into_inner();
        Ok(self
            .with(|data| data.products.values().cloned().collect())
            .await)
    }
}

impl<A> Database<Select<By<read::product::IsReserved, product::Id>>>
    for InMemory<A>
where
    A: Access,
{
    type Ok = read::product::IsReserved;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::product::IsReserved, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .with(|data| {
                read::product::IsReserved(
                    data.reservations
                        .values()
                        .any(|r| r.product_ids().any(|p| p == id)),
                )
            })
            .await)
    }
}

impl<A> Database<Lock<By<Product, product::Id>>> for InMemory<A>
where
    A: Access,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(_): Lock<By<Product, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transactions are globally exclusive, so the lock is already held.
        Ok(())
    }
}
