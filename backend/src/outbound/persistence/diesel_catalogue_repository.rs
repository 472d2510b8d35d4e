//! PostgreSQL-backed `CatalogueRepository` using Diesel.
//!
//! Read-only lookups. Soft-deleted rooms, equipment, and makeup rooms are
//! filtered at the query so they never reach the domain.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{CatalogueRepository, CatalogueRepositoryError};
use crate::domain::tariff::TariffTable;
use crate::domain::{Customer, Equipment, MakeupRoom, PromoCode, Room};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{CustomerRow, EquipmentRow, MakeupRoomRow, PromoCodeRow, RoomRow};
use super::pool::DbPool;
use super::schema::{customers, equipment, makeup_rooms, promo_codes, rooms};

/// Diesel-backed implementation of the `CatalogueRepository` port.
#[derive(Clone)]
pub struct DieselCatalogueRepository {
    pool: DbPool,
}

impl DieselCatalogueRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<
            '_,
            diesel_async::AsyncPgConnection,
        >,
        CatalogueRepositoryError,
    > {
        self.pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, CatalogueRepositoryError::connection))
    }
}

fn map_error(error: diesel::result::Error) -> CatalogueRepositoryError {
    map_diesel_error(
        error,
        CatalogueRepositoryError::query,
        CatalogueRepositoryError::connection,
    )
}

fn row_to_room(row: RoomRow) -> Room {
    Room {
        id: row.id,
        name: row.name,
        tariff: TariffTable {
            weekday_morning: row.weekday_morning_rate,
            weekday_evening: row.weekday_evening_rate,
            weekend: row.weekend_rate,
            default_rate: row.default_rate,
        },
        is_deleted: row.is_deleted,
    }
}

#[async_trait]
impl CatalogueRepository for DieselCatalogueRepository {
    async fn room(&self, room_id: Uuid) -> Result<Option<Room>, CatalogueRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<RoomRow> = rooms::table
            .filter(rooms::id.eq(room_id))
            .filter(rooms::is_deleted.eq(false))
            .select(RoomRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(row.map(row_to_room))
    }

    async fn equipment_item(
        &self,
        equipment_id: Uuid,
    ) -> Result<Option<Equipment>, CatalogueRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<EquipmentRow> = equipment::table
            .filter(equipment::id.eq(equipment_id))
            .filter(equipment::is_deleted.eq(false))
            .select(EquipmentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(row.map(|row| Equipment {
            id: row.id,
            name: row.name,
            price_per_day: row.price_per_day,
            total_quantity: u32::try_from(row.total_quantity).unwrap_or_default(),
            is_deleted: row.is_deleted,
        }))
    }

    async fn makeup_room(
        &self,
        makeup_room_id: Uuid,
    ) -> Result<Option<MakeupRoom>, CatalogueRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<MakeupRoomRow> = makeup_rooms::table
            .filter(makeup_rooms::id.eq(makeup_room_id))
            .filter(makeup_rooms::is_deleted.eq(false))
            .select(MakeupRoomRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(row.map(|row| MakeupRoom {
            id: row.id,
            name: row.name,
            price_per_hour: row.price_per_hour,
            total_quantity: u32::try_from(row.total_quantity).unwrap_or_default(),
            is_deleted: row.is_deleted,
        }))
    }

    async fn customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, CatalogueRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<CustomerRow> = customers::table
            .filter(customers::id.eq(customer_id))
            .select(CustomerRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(row.map(|row| Customer {
            id: row.id,
            name: row.name,
            phone: row.phone,
        }))
    }

    async fn promo_code(
        &self,
        code: &str,
    ) -> Result<Option<PromoCode>, CatalogueRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<PromoCodeRow> = promo_codes::table
            .filter(promo_codes::code.eq(code))
            .select(PromoCodeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;
        Ok(row.map(|row| PromoCode {
            code: row.code,
            discount_amount: row.discount_amount,
            active: row.active,
            expires_at: row.expires_at,
            usage_limit: row.usage_limit.map(|limit| u32::try_from(limit).unwrap_or_default()),
            usage_count: u32::try_from(row.usage_count).unwrap_or_default(),
        }))
    }
}
