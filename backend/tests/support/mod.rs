//! Shared fixtures for the integration suites: a hand-adjustable clock, a
//! scriptable SMS sender, and catalogue seeding helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use uuid::Uuid;

use async_trait::async_trait;
use backend::domain::ports::{DeliveryId, SmsSendError, SmsSender};
use backend::domain::{Customer, Equipment, MakeupRoom, Room, TariffTable};
use backend::outbound::memory::MemoryCatalogueRepository;

/// Clock the tests wind forward between steps.
pub struct MutableClock {
    now: Mutex<DateTime<Utc>>,
}

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.lock() += by;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock() = now;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().expect("clock mutex poisoned")
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.lock().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

/// SMS double recording every send; failures can be queued up front.
#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
    failures: Mutex<VecDeque<SmsSendError>>,
}

impl RecordingSms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure returned by the next `send` call.
    pub fn push_failure(&self, error: SmsSendError) {
        self.failures
            .lock()
            .expect("failure queue poisoned")
            .push_back(error);
    }

    /// Every `(phone, text)` pair delivered so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent log poisoned").clone()
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send(&self, phone: &str, text: &str) -> Result<DeliveryId, SmsSendError> {
        if let Some(failure) = self
            .failures
            .lock()
            .expect("failure queue poisoned")
            .pop_front()
        {
            return Err(failure);
        }
        let mut sent = self.sent.lock().expect("sent log poisoned");
        sent.push((phone.to_owned(), text.to_owned()));
        Ok(DeliveryId(format!("msg-{}", sent.len())))
    }
}

/// Identifiers for the seeded catalogue rows.
pub struct SeededCatalogue {
    pub repository: Arc<MemoryCatalogueRepository>,
    pub room_id: Uuid,
    pub second_room_id: Uuid,
    pub customer_id: Uuid,
    pub camera_id: Uuid,
    pub makeup_room_id: Uuid,
}

/// A flat-rate catalogue: rooms at 1000/h, two cameras at 500/day, one
/// makeup room at 300/h, one customer.
pub fn seed_catalogue() -> SeededCatalogue {
    let repository = Arc::new(MemoryCatalogueRepository::new());
    let room_id = Uuid::new_v4();
    let second_room_id = Uuid::new_v4();
    let customer_id = Uuid::new_v4();
    let camera_id = Uuid::new_v4();
    let makeup_room_id = Uuid::new_v4();

    for (id, name) in [(room_id, "Studio A"), (second_room_id, "Studio B")] {
        repository.seed_room(Room {
            id,
            name: name.to_owned(),
            tariff: TariffTable {
                weekday_morning: None,
                weekday_evening: None,
                weekend: None,
                default_rate: Some(1000.0),
            },
            is_deleted: false,
        });
    }
    repository.seed_customer(Customer {
        id: customer_id,
        name: "Lena".to_owned(),
        phone: "+79990001122".to_owned(),
    });
    repository.seed_equipment(Equipment {
        id: camera_id,
        name: "Camera".to_owned(),
        price_per_day: 500.0,
        total_quantity: 2,
        is_deleted: false,
    });
    repository.seed_makeup_room(MakeupRoom {
        id: makeup_room_id,
        name: "Makeup".to_owned(),
        price_per_hour: 300.0,
        total_quantity: 1,
        is_deleted: false,
    });

    SeededCatalogue {
        repository,
        room_id,
        second_room_id,
        customer_id,
        camera_id,
        makeup_room_id,
    }
}

/// A Tuesday morning, far enough ahead that reminders stay schedulable.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap()
}
