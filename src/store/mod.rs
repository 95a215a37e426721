pub mod sqlite;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::{Blockout, Booking, BookingPatch, ServiceItem, StoreConfig, WorkingHours};

/// Which collection changed. Emitted by a store after every successful
/// mutation; the sync hub reloads on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Bookings,
    Config,
}

/// The booking collection: one document per booking, document id = booking
/// id. Writes are last-write-wins; consumers learn about changes (their own
/// included) through the change stream, never through a returned snapshot.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create(&self, booking: &Booking) -> anyhow::Result<()>;

    /// Merges the patch into the stored record. Returns false when the
    /// record no longer exists.
    async fn update(&self, id: &str, patch: &BookingPatch) -> anyhow::Result<bool>;

    /// Permanent removal. Returns false when the record no longer exists.
    async fn delete(&self, id: &str) -> anyhow::Result<bool>;

    async fn get(&self, id: &str) -> anyhow::Result<Option<Booking>>;

    async fn list(&self) -> anyhow::Result<Vec<Booking>>;

    fn changes(&self) -> broadcast::Receiver<StoreEvent>;
}

/// The single shop-configuration document, mutated one field group at a
/// time by read-modify-write against the authoritative copy.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Reads the document, seeding it with defaults on first read of an
    /// empty store.
    async fn read(&self) -> anyhow::Result<StoreConfig>;

    async fn put_services(&self, services: Vec<ServiceItem>) -> anyhow::Result<()>;

    async fn put_weekday_hours(&self, weekday: u8, hours: WorkingHours) -> anyhow::Result<()>;

    async fn put_blockouts(&self, blockouts: Vec<Blockout>) -> anyhow::Result<()>;

    fn changes(&self) -> broadcast::Receiver<StoreEvent>;
}
