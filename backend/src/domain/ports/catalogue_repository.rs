//! Port for catalogue reads consumed by the booking pipeline.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::catalogue::{Customer, Equipment, MakeupRoom, PromoCode, Room};

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalogue repository adapters.
    pub enum CatalogueRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "catalogue repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "catalogue repository query failed: {message}",
    }
}

/// Read-only catalogue lookups. Soft-deleted rows are never returned; a
/// deleted room is indistinguishable from a missing one to callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogueRepository: Send + Sync {
    /// Look up a room by id.
    async fn room(&self, room_id: Uuid) -> Result<Option<Room>, CatalogueRepositoryError>;

    /// Look up an equipment item by id.
    async fn equipment_item(
        &self,
        equipment_id: Uuid,
    ) -> Result<Option<Equipment>, CatalogueRepositoryError>;

    /// Look up a makeup room by id.
    async fn makeup_room(
        &self,
        makeup_room_id: Uuid,
    ) -> Result<Option<MakeupRoom>, CatalogueRepositoryError>;

    /// Look up a customer by id.
    async fn customer(&self, customer_id: Uuid)
    -> Result<Option<Customer>, CatalogueRepositoryError>;

    /// Look up a promo code by its code string.
    async fn promo_code(&self, code: &str) -> Result<Option<PromoCode>, CatalogueRepositoryError>;
}
