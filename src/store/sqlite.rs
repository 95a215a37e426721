use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::db::queries;
use crate::models::{Blockout, Booking, BookingPatch, ServiceItem, StoreConfig, WorkingHours};
use crate::store::{BookingStore, ConfigStore, StoreEvent};

/// Bundled document store over SQLite. Plays the part of the remote store:
/// every successful mutation is announced on the change channel, and
/// nothing is served back to the caller that did not go through a write.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { conn, events }
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers is fine: nothing has subscribed yet.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn create(&self, booking: &Booking) -> anyhow::Result<()> {
        {
            let conn = self.conn.lock().unwrap();
            queries::create_booking(&conn, booking)?;
        }
        self.notify(StoreEvent::Bookings);
        Ok(())
    }

    async fn update(&self, id: &str, patch: &BookingPatch) -> anyhow::Result<bool> {
        let updated = {
            let conn = self.conn.lock().unwrap();
            queries::update_booking(&conn, id, patch)?
        };
        if updated {
            self.notify(StoreEvent::Bookings);
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let deleted = {
            let conn = self.conn.lock().unwrap();
            queries::delete_booking(&conn, id)?
        };
        if deleted {
            self.notify(StoreEvent::Bookings);
        }
        Ok(deleted)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Booking>> {
        let conn = self.conn.lock().unwrap();
        queries::get_booking_by_id(&conn, id)
    }

    async fn list(&self) -> anyhow::Result<Vec<Booking>> {
        let conn = self.conn.lock().unwrap();
        queries::get_all_bookings(&conn)
    }

    fn changes(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ConfigStore for SqliteStore {
    async fn read(&self) -> anyhow::Result<StoreConfig> {
        let existing = {
            let conn = self.conn.lock().unwrap();
            queries::get_config(&conn)?
        };

        match existing {
            Some(config) => Ok(config),
            None => {
                // First read of an empty store seeds the defaults.
                let config = StoreConfig::default();
                {
                    let conn = self.conn.lock().unwrap();
                    queries::put_config(&conn, &config)?;
                }
                tracing::info!("seeded default store configuration");
                self.notify(StoreEvent::Config);
                Ok(config)
            }
        }
    }

    async fn put_services(&self, services: Vec<ServiceItem>) -> anyhow::Result<()> {
        let mut config = self.read().await?;
        config.services = services;
        {
            let conn = self.conn.lock().unwrap();
            queries::put_config(&conn, &config)?;
        }
        self.notify(StoreEvent::Config);
        Ok(())
    }

    async fn put_weekday_hours(&self, weekday: u8, hours: WorkingHours) -> anyhow::Result<()> {
        let mut config = self.read().await?;
        config.weekly_hours.insert(weekday, hours);
        {
            let conn = self.conn.lock().unwrap();
            queries::put_config(&conn, &config)?;
        }
        self.notify(StoreEvent::Config);
        Ok(())
    }

    async fn put_blockouts(&self, blockouts: Vec<Blockout>) -> anyhow::Result<()> {
        let mut config = self.read().await?;
        config.blockouts = blockouts;
        {
            let conn = self.conn.lock().unwrap();
            queries::put_config(&conn, &config)?;
        }
        self.notify(StoreEvent::Config);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{BookingStatus, PaymentMethod, PaymentStatus};

    fn setup_store() -> SqliteStore {
        let conn = db::init_db(":memory:").unwrap();
        SqliteStore::new(Arc::new(Mutex::new(conn)))
    }

    fn sample_booking(id: &str) -> Booking {
        Booking {
            id: id.to_string(),
            client_name: "Alice".to_string(),
            client_phone: "0821234567".to_string(),
            date: "2025-07-07".to_string(),
            time_slot: "10:00".to_string(),
            service_id: "1".to_string(),
            service_name: "Regular Cut".to_string(),
            duration_minutes: 60,
            amount_cents: 200_00,
            deposit_cents: 0,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::NotPaid,
            status: BookingStatus::Confirmed,
            payment_reference: None,
            transaction_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn test_create_emits_change_event() {
        let store = setup_store();
        let mut rx = BookingStore::changes(&store);

        store.create(&sample_booking("b1")).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::Bookings);
    }

    #[tokio::test]
    async fn test_update_missing_record_is_silent() {
        let store = setup_store();
        let mut rx = BookingStore::changes(&store);

        let updated = store
            .update("ghost", &BookingPatch::status(BookingStatus::Cancelled))
            .await
            .unwrap();
        assert!(!updated);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_first_read_seeds_defaults() {
        let store = setup_store();

        let config = store.read().await.unwrap();
        assert_eq!(config.services.len(), 6);

        // The seed is persisted, not recomputed per read
        let again = store.read().await.unwrap();
        assert_eq!(again.services.len(), 6);
    }

    #[tokio::test]
    async fn test_field_group_updates_are_isolated() {
        let store = setup_store();
        store
            .put_weekday_hours(
                1,
                WorkingHours {
                    start: "10:00".to_string(),
                    end: "16:00".to_string(),
                    is_closed: false,
                },
            )
            .await
            .unwrap();

        store.put_blockouts(vec![]).await.unwrap();

        let config = store.read().await.unwrap();
        assert_eq!(config.weekly_hours[&1].start, "10:00");
        // Other weekdays untouched
        assert_eq!(config.weekly_hours[&2].start, "09:00");
        assert_eq!(config.services.len(), 6);
    }
}
