use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::sync::SyncHub;
use crate::store::{BookingStore, ConfigStore};

pub struct AppState {
    pub config: AppConfig,
    pub bookings: Arc<dyn BookingStore>,
    pub store_config: Arc<dyn ConfigStore>,
    pub hub: Arc<SyncHub>,
}
