use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::broadcast::error::RecvError;

use crate::models::{Booking, StoreConfig};
use crate::store::{BookingStore, ConfigStore};

/// The latest state the process knows: full booking collection (newest
/// created first) plus the shop configuration. `connected` flips true once
/// the upstream listener has completed its first load; until then reads
/// serve the seeded defaults and mutations should be refused.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub bookings: Vec<Booking>,
    pub config: StoreConfig,
    pub connected: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            bookings: vec![],
            config: StoreConfig::default(),
            connected: false,
        }
    }
}

type Observer = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// In-process cache and fan-out point between the stores and however many
/// surfaces are watching them.
///
/// Reads flow Store -> cache -> observers; writes go to the stores and come
/// back around through the change streams. Nothing mutates the cache except
/// the single upstream listener task, which the first subscription of the
/// process lifetime starts; every later subscription reuses it.
pub struct SyncHub {
    bookings: Arc<dyn BookingStore>,
    config: Arc<dyn ConfigStore>,
    inner: Mutex<HubInner>,
}

struct HubInner {
    snapshot: Snapshot,
    observers: HashMap<u64, Observer>,
    next_id: u64,
    attached: bool,
}

/// Keeps the observer registered; dropping it unsubscribes.
pub struct Subscription {
    hub: Weak<SyncHub>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.inner.lock().unwrap().observers.remove(&self.id);
        }
    }
}

impl SyncHub {
    pub fn new(bookings: Arc<dyn BookingStore>, config: Arc<dyn ConfigStore>) -> Arc<Self> {
        Arc::new(Self {
            bookings,
            config,
            inner: Mutex::new(HubInner {
                snapshot: Snapshot::default(),
                observers: HashMap::new(),
                next_id: 0,
                attached: false,
            }),
        })
    }

    /// Registers an observer: it is invoked synchronously once with the
    /// current snapshot before this returns, then again on every upstream
    /// change until the returned handle is dropped.
    pub fn subscribe(
        self: &Arc<Self>,
        observer: impl Fn(&Snapshot) + Send + Sync + 'static,
    ) -> Subscription {
        let observer: Observer = Arc::new(observer);

        let (snapshot, id, attach) = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.insert(id, Arc::clone(&observer));
            let attach = !inner.attached;
            inner.attached = true;
            (inner.snapshot.clone(), id, attach)
        };

        // Immediate replay happens outside the lock so the observer may
        // freely call back into the hub.
        observer(&snapshot);

        if attach {
            self.attach();
        }

        Subscription {
            hub: Arc::downgrade(self),
            id,
        }
    }

    /// Replays the current snapshot to every observer without contacting
    /// upstream. Used to put surfaces back in a known state after a failed
    /// mutation.
    pub fn refresh(&self) {
        let (snapshot, observers) = {
            let inner = self.inner.lock().unwrap();
            (inner.snapshot.clone(), inner.observers.values().cloned().collect::<Vec<_>>())
        };
        for observer in observers {
            observer(&snapshot);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().unwrap().snapshot.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().snapshot.connected
    }

    /// Starts the single upstream listener: one initial load, then a
    /// reload per change notification from either store.
    fn attach(self: &Arc<Self>) {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let mut booking_rx = hub.bookings.changes();
            let mut config_rx = hub.config.changes();

            hub.reload().await;

            loop {
                let event = tokio::select! {
                    event = booking_rx.recv() => event,
                    event = config_rx.recv() => event,
                };
                match event {
                    Ok(_) => hub.reload().await,
                    // Dropped notifications only mean we reload once
                    // instead of several times.
                    Err(RecvError::Lagged(_)) => hub.reload().await,
                    Err(RecvError::Closed) => {
                        tracing::warn!("store change stream closed, cache is frozen");
                        break;
                    }
                }
            }
        });
    }

    async fn reload(&self) {
        let bookings = match self.bookings.list().await {
            Ok(mut bookings) => {
                bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Some(bookings)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load bookings, keeping last known");
                None
            }
        };
        let config = match self.config.read().await {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load config, keeping last known");
                None
            }
        };

        if bookings.is_none() && config.is_none() {
            return;
        }

        let (snapshot, observers) = {
            let mut inner = self.inner.lock().unwrap();
            let loaded_both = bookings.is_some() && config.is_some();
            if let Some(bookings) = bookings {
                inner.snapshot.bookings = bookings;
            }
            if let Some(config) = config {
                inner.snapshot.config = config;
            }
            inner.snapshot.connected = inner.snapshot.connected || loaded_both;
            (inner.snapshot.clone(), inner.observers.values().cloned().collect::<Vec<_>>())
        };

        for observer in observers {
            observer(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::broadcast;

    use crate::models::{Blockout, BookingPatch, ServiceItem, WorkingHours};
    use crate::store::StoreEvent;

    /// In-memory store double for both collaborators, with call counters
    /// so tests can see exactly when upstream is contacted.
    struct MemoryStore {
        bookings: Mutex<Vec<Booking>>,
        events: broadcast::Sender<StoreEvent>,
        list_calls: AtomicUsize,
        changes_calls: AtomicUsize,
    }

    impl MemoryStore {
        fn new() -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                bookings: Mutex::new(vec![]),
                events,
                list_calls: AtomicUsize::new(0),
                changes_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BookingStore for MemoryStore {
        async fn create(&self, booking: &Booking) -> anyhow::Result<()> {
            self.bookings.lock().unwrap().push(booking.clone());
            let _ = self.events.send(StoreEvent::Bookings);
            Ok(())
        }
        async fn update(&self, _id: &str, _patch: &BookingPatch) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn delete(&self, _id: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn get(&self, _id: &str) -> anyhow::Result<Option<Booking>> {
            Ok(None)
        }
        async fn list(&self) -> anyhow::Result<Vec<Booking>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.bookings.lock().unwrap().clone())
        }
        fn changes(&self) -> broadcast::Receiver<StoreEvent> {
            self.changes_calls.fetch_add(1, Ordering::SeqCst);
            self.events.subscribe()
        }
    }

    #[async_trait]
    impl ConfigStore for MemoryStore {
        async fn read(&self) -> anyhow::Result<StoreConfig> {
            Ok(StoreConfig::default())
        }
        async fn put_services(&self, _services: Vec<ServiceItem>) -> anyhow::Result<()> {
            let _ = self.events.send(StoreEvent::Config);
            Ok(())
        }
        async fn put_weekday_hours(&self, _weekday: u8, _hours: WorkingHours) -> anyhow::Result<()> {
            let _ = self.events.send(StoreEvent::Config);
            Ok(())
        }
        async fn put_blockouts(&self, _blockouts: Vec<Blockout>) -> anyhow::Result<()> {
            let _ = self.events.send(StoreEvent::Config);
            Ok(())
        }
        fn changes(&self) -> broadcast::Receiver<StoreEvent> {
            self.changes_calls.fetch_add(1, Ordering::SeqCst);
            self.events.subscribe()
        }
    }

    fn sample_booking(id: &str) -> Booking {
        use crate::models::{BookingStatus, PaymentMethod, PaymentStatus};
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

    fn hub_over(store: &Arc<MemoryStore>) -> Arc<SyncHub> {
        SyncHub::new(
            Arc::clone(store) as Arc<dyn BookingStore>,
            Arc::clone(store) as Arc<dyn ConfigStore>,
        )
    }

    /// The cache is fed by a background task; polls until the condition
    /// holds instead of guessing at sleeps.
    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 1s");
    }

    #[tokio::test]
    async fn test_subscribe_delivers_immediately() {
        let store = MemoryStore::new();
        let hub = hub_over(&store);

        let seen = Arc::new(Mutex::new(Vec::<Snapshot>::new()));
        let sink = Arc::clone(&seen);
        let _sub = hub.subscribe(move |snap| sink.lock().unwrap().push(snap.clone()));

        // Synchronous first delivery, before any upstream round trip
        let first = seen.lock().unwrap().first().cloned().unwrap();
        assert!(!first.connected);
        assert_eq!(first.config.services.len(), 6);
    }

    #[tokio::test]
    async fn test_change_notifications_reach_observers() {
        let store = MemoryStore::new();
        let hub = hub_over(&store);

        let seen = Arc::new(Mutex::new(Vec::<Snapshot>::new()));
        let sink = Arc::clone(&seen);
        let _sub = hub.subscribe(move |snap| sink.lock().unwrap().push(snap.clone()));

        wait_until(|| hub.is_connected()).await;

        BookingStore::create(store.as_ref(), &sample_booking("b1"))
            .await
            .unwrap();
        wait_until(|| hub.snapshot().bookings.len() == 1).await;

        let last = seen.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.bookings.len(), 1);
        assert_eq!(last.bookings[0].id, "b1");
    }

    #[tokio::test]
    async fn test_bookings_sorted_newest_first() {
        let store = MemoryStore::new();
        let hub = hub_over(&store);
        let _sub = hub.subscribe(|_| {});
        wait_until(|| hub.is_connected()).await;

        let mut older = sample_booking("older");
        older.created_at = older.created_at - chrono::Duration::hours(1);
        BookingStore::create(store.as_ref(), &older).await.unwrap();
        BookingStore::create(store.as_ref(), &sample_booking("newer"))
            .await
            .unwrap();
        wait_until(|| hub.snapshot().bookings.len() == 2).await;

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.bookings[0].id, "newer");
        assert_eq!(snapshot.bookings[1].id, "older");
    }

    #[tokio::test]
    async fn test_single_upstream_attachment() {
        let store = MemoryStore::new();
        let hub = hub_over(&store);

        let _first = hub.subscribe(|_| {});
        let _second = hub.subscribe(|_| {});
        let _third = hub.subscribe(|_| {});
        wait_until(|| hub.is_connected()).await;

        // One listener task subscribes once per store, no matter how many
        // observers exist.
        assert_eq!(store.changes_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fan_out_to_all_observers() {
        let store = MemoryStore::new();
        let hub = hub_over(&store);

        let first_count = Arc::new(AtomicUsize::new(0));
        let second_count = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&first_count);
        let c2 = Arc::clone(&second_count);
        let _sub1 = hub.subscribe(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let _sub2 = hub.subscribe(move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        wait_until(|| hub.is_connected()).await;
        BookingStore::create(store.as_ref(), &sample_booking("b1"))
            .await
            .unwrap();

        wait_until(|| {
            first_count.load(Ordering::SeqCst) >= 2 && second_count.load(Ordering::SeqCst) >= 2
        })
        .await;
    }

    #[tokio::test]
    async fn test_refresh_replays_without_upstream_contact() {
        let store = MemoryStore::new();
        let hub = hub_over(&store);

        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let _sub = hub.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        wait_until(|| hub.is_connected()).await;

        let upstream_reads = store.list_calls.load(Ordering::SeqCst);
        let deliveries = count.load(Ordering::SeqCst);

        hub.refresh();
        hub.refresh();

        assert_eq!(count.load(Ordering::SeqCst), deliveries + 2);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), upstream_reads);
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_delivery() {
        let store = MemoryStore::new();
        let hub = hub_over(&store);

        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let sub = hub.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        wait_until(|| hub.is_connected()).await;

        drop(sub);
        let at_drop = count.load(Ordering::SeqCst);

        BookingStore::create(store.as_ref(), &sample_booking("b1"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), at_drop);
    }
}
