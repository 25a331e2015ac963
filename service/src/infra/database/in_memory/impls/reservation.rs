//! [`Reservation`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{
        reservation::{self, Status},
        user, Reservation,
    },
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

impl<A> Database<Insert<reservation::Draft>> for InMemory<A>
where
    A: Access,
{
    type Ok = Reservation;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(draft): Insert<reservation::Draft>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .with(|data| {
                let reservation::Draft {
                    code,
                    owner,
                    items,
                    starts_at,
                    ends_at,
                    status,
                    total,
                    is_paid,
                    created_at,
                } = draft;
                let reservation = Reservation {
                    id: data.next_reservation_id(),
                    code,
                    owner,
                    items,
                    starts_at,
                    ends_at,
                    status,
                    total,
                    is_paid,
                    created_at,
                };
                drop(
                    data.reservations
                        .insert(reservation.id, reservation.clone()),
                );
                reservation
            })
            .await)
    }
}

impl<A> Database<Update<Reservation>> for InMemory<A>
where
    A: Access,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reservation): Update<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|data| {
            let stored = data
                .reservations
                .get_mut(&reservation.id)
                .ok_or(in_memory::Error::ReservationNotFound(reservation.id))?;
            *stored = reservation;
            Ok(())
        })
        .await
        .map_err(tracerr::from_and_wrap!(in_memory::Error => database::Error))
    }
}

impl<A> Database<Delete<By<Reservation, reservation::Id>>> for InMemory<A>
where
    A: Access,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Reservation, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|data| {
            data.reservations
                .remove(&id)
                .map(drop)
                .ok_or(in_memory::Error::ReservationNotFound(id))
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<A> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for InMemory<A>
where
    A: Access,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.with(|data| data.reservations.get(&id).cloned()).await)
    }
}

impl<A> Database<Select<By<Vec<Reservation>, ()>>> for InMemory<A>
where
    A: Access,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let () = by.into_inner();
        Ok(self
            .with(|data| data.reservations.values().cloned().collect())
            .await)
    }
}

impl<A> Database<Select<By<Vec<Reservation>, user::Username>>> for InMemory<A>
where
    A: Access,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, user::Username>>,
    ) -> Result<Self::Ok, Self::Err> {
        let username = by.into_inner();
        Ok(self
            .with(|data| {
                data.reservations
                    .values()
                    .rev()
                    .filter(|r| r.owner.username == username)
                    .cloned()
                    .collect()
            })
            .await)
    }
}

impl<A> Database<Select<By<Vec<Reservation>, read::reservation::DueToActivate>>>
    for InMemory<A>
where
    A: Access,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Reservation>, read::reservation::DueToActivate>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::DueToActivate(at) = by.into_inner();
        Ok(self
            .with(|data| {
                data.reservations
                    .values()
                    .filter(|r| {
                        r.status == Status::Pending && r.starts_at <= at
                    })
                    .cloned()
                    .collect()
            })
            .await)
    }
}

impl<A> Database<Select<By<Vec<Reservation>, read::reservation::DueToFinalize>>>
    for InMemory<A>
where
    A: Access,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Reservation>, read::reservation::DueToFinalize>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::DueToFinalize(at) = by.into_inner();
        Ok(self
            .with(|data| {
                data.reservations
                    .values()
                    .filter(|r| r.status == Status::Active && r.ends_at <= at)
                    .cloned()
                    .collect()
            })
            .await)
    }
}

impl<A> Database<Lock<By<Reservation, reservation::Id>>> for InMemory<A>
where
    A: Access,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(_): Lock<By<Reservation, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transactions are globally exclusive, so the lock is already held.
        Ok(())
    }
}
