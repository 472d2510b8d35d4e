//! In-memory `CatalogueRepository` seeded up front.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{CatalogueRepository, CatalogueRepositoryError};
use crate::domain::{Customer, Equipment, MakeupRoom, PromoCode, Room};

/// Seedable catalogue store. Soft-deleted entries stay in the maps but are
/// withheld from lookups, matching the SQL adapter's filters.
#[derive(Default)]
pub struct MemoryCatalogueRepository {
    inner: Mutex<Catalogue>,
}

#[derive(Default)]
struct Catalogue {
    rooms: HashMap<Uuid, Room>,
    equipment: HashMap<Uuid, Equipment>,
    makeup_rooms: HashMap<Uuid, MakeupRoom>,
    customers: HashMap<Uuid, Customer>,
    promo_codes: HashMap<String, PromoCode>,
}

impl MemoryCatalogueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_room(&self, room: Room) {
        self.lock().rooms.insert(room.id, room);
    }

    pub fn seed_equipment(&self, item: Equipment) {
        self.lock().equipment.insert(item.id, item);
    }

    pub fn seed_makeup_room(&self, room: MakeupRoom) {
        self.lock().makeup_rooms.insert(room.id, room);
    }

    pub fn seed_customer(&self, customer: Customer) {
        self.lock().customers.insert(customer.id, customer);
    }

    pub fn seed_promo_code(&self, promo: PromoCode) {
        self.lock().promo_codes.insert(promo.code.clone(), promo);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Catalogue> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogueRepository for MemoryCatalogueRepository {
    async fn room(&self, room_id: Uuid) -> Result<Option<Room>, CatalogueRepositoryError> {
        Ok(self
            .lock()
            .rooms
            .get(&room_id)
            .filter(|room| !room.is_deleted)
            .cloned())
    }

    async fn equipment_item(
        &self,
        equipment_id: Uuid,
    ) -> Result<Option<Equipment>, CatalogueRepositoryError> {
        Ok(self
            .lock()
            .equipment
            .get(&equipment_id)
            .filter(|item| !item.is_deleted)
            .cloned())
    }

    async fn makeup_room(
        &self,
        makeup_room_id: Uuid,
    ) -> Result<Option<MakeupRoom>, CatalogueRepositoryError> {
        Ok(self
            .lock()
            .makeup_rooms
            .get(&makeup_room_id)
            .filter(|room| !room.is_deleted)
            .cloned())
    }

    async fn customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, CatalogueRepositoryError> {
        Ok(self.lock().customers.get(&customer_id).cloned())
    }

    async fn promo_code(
        &self,
        code: &str,
    ) -> Result<Option<PromoCode>, CatalogueRepositoryError> {
        Ok(self.lock().promo_codes.get(code).cloned())
    }
}
