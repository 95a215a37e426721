use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chairtime::config::AppConfig;
use chairtime::db;
use chairtime::handlers;
use chairtime::services::sync::SyncHub;
use chairtime::state::AppState;
use chairtime::store::sqlite::SqliteStore;
use chairtime::store::{BookingStore, ConfigStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let store = Arc::new(SqliteStore::new(Arc::new(Mutex::new(conn))));
    let bookings: Arc<dyn BookingStore> = store.clone();
    let store_config: Arc<dyn ConfigStore> = store;

    let hub = SyncHub::new(Arc::clone(&bookings), Arc::clone(&store_config));

    // First subscription of the process lifetime: primes the cache and
    // starts the single upstream listener. Held until shutdown.
    let _cache_log = hub.subscribe(|snapshot| {
        tracing::debug!(
            bookings = snapshot.bookings.len(),
            connected = snapshot.connected,
            "cache updated"
        );
    });

    let state = Arc::new(AppState {
        config: config.clone(),
        bookings,
        store_config,
        hub,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/config", get(handlers::client::get_config))
        .route("/api/slots", get(handlers::client::get_slots))
        .route(
            "/api/bookings",
            get(handlers::client::get_client_bookings).post(handlers::client::create_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::client::cancel_booking),
        )
        .route(
            "/api/bookings/:id/calendar.ics",
            get(handlers::client::download_ics),
        )
        .route("/api/events", get(handlers::events::events_stream))
        .route("/api/admin/login", post(handlers::admin::login))
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route(
            "/api/admin/bookings/:id",
            patch(handlers::admin::patch_booking).delete(handlers::admin::delete_booking),
        )
        .route(
            "/api/admin/bookings/:id/toggle-payment",
            post(handlers::admin::toggle_payment),
        )
        .route(
            "/api/admin/bookings/:id/cancel",
            post(handlers::admin::cancel_booking),
        )
        .route(
            "/api/admin/bookings/:id/complete",
            post(handlers::admin::complete_booking),
        )
        .route("/api/admin/services", post(handlers::admin::add_service))
        .route(
            "/api/admin/services/:id",
            put(handlers::admin::update_service).delete(handlers::admin::delete_service),
        )
        .route("/api/admin/hours/:weekday", put(handlers::admin::update_hours))
        .route("/api/admin/blockouts", post(handlers::admin::add_blockout))
        .route(
            "/api/admin/blockouts/:id",
            delete(handlers::admin::remove_blockout),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
