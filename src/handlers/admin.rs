use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Blockout, Booking, BookingPatch, ServiceItem, WorkingHours};
use crate::services::bookings;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_passcode: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let passcode = auth.strip_prefix("Bearer ").unwrap_or("");
    if passcode != expected_passcode {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn require_connected(state: &AppState) -> Result<(), AppError> {
    if state.hub.is_connected() {
        Ok(())
    } else {
        Err(AppError::StoreUnavailable)
    }
}

// POST /api/admin/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub passcode: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.passcode != state.config.admin_passcode {
        return Err(AppError::Unauthorized);
    }
    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/admin/bookings
pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    Ok(Json(state.hub.snapshot().bookings))
}

// PATCH /api/admin/bookings/:id
pub async fn patch_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    if let Some(date) = &patch.date {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("invalid date: {date}")))?;
    }
    if let Some(slot) = &patch.time_slot {
        crate::models::catalog::parse_hhmm(slot)
            .map_err(|e| AppError::Validation(e.to_string()))?;
    }
    if patch.amount_cents.is_some_and(|v| v < 0) || patch.deposit_cents.is_some_and(|v| v < 0) {
        return Err(AppError::Validation("amounts must not be negative".to_string()));
    }

    bookings::update_booking(&state.bookings, &id, &patch).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// POST /api/admin/bookings/:id/toggle-payment
pub async fn toggle_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    let snapshot = state.hub.snapshot();
    let booking = snapshot
        .bookings
        .iter()
        .find(|b| b.id == id)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    let next = bookings::toggle_payment(&state.bookings, booking).await?;
    Ok(Json(serde_json::json!({"ok": true, "payment_status": next})))
}

// POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    bookings::cancel_booking(&state.bookings, &id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    bookings::complete_booking(&state.bookings, &id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// DELETE /api/admin/bookings/:id — permanent; meant for cancelled records.
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    bookings::delete_booking(&state.bookings, &id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ── Service menu ──

// POST /api/admin/services
#[derive(Deserialize)]
pub struct NewServiceRequest {
    pub name: String,
    pub price_cents: i64,
    pub duration_minutes: i32,
}

pub async fn add_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewServiceRequest>,
) -> Result<Json<ServiceItem>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    let service = ServiceItem {
        id: Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        price_cents: body.price_cents,
        duration_minutes: body.duration_minutes,
    };
    service
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut services = state.hub.snapshot().config.services;
    services.push(service.clone());
    state.store_config.put_services(services).await?;

    Ok(Json(service))
}

// PUT /api/admin/services/:id
#[derive(Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub duration_minutes: Option<i32>,
}

pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    let mut services = state.hub.snapshot().config.services;
    let service = services
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| AppError::NotFound(format!("service {id}")))?;

    if let Some(name) = body.name {
        service.name = name.trim().to_string();
    }
    if let Some(price) = body.price_cents {
        service.price_cents = price;
    }
    if let Some(duration) = body.duration_minutes {
        service.duration_minutes = duration;
    }
    service
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state.store_config.put_services(services).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// DELETE /api/admin/services/:id
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    let services = state.hub.snapshot().config.services;
    let remaining: Vec<ServiceItem> = services.into_iter().filter(|s| s.id != id).collect();
    state.store_config.put_services(remaining).await?;

    Ok(Json(serde_json::json!({"ok": true})))
}

// ── Weekly hours ──

// PUT /api/admin/hours/:weekday
pub async fn update_hours(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(weekday): Path<u8>,
    Json(hours): Json<WorkingHours>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    if weekday > 6 {
        return Err(AppError::Validation(format!(
            "weekday must be 0 (Sunday) through 6, got {weekday}"
        )));
    }
    hours
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state.store_config.put_weekday_hours(weekday, hours).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ── Blockouts ──

// POST /api/admin/blockouts
#[derive(Deserialize)]
pub struct NewBlockoutRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
}

pub async fn add_blockout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewBlockoutRequest>,
) -> Result<Json<Blockout>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    let blockout = Blockout {
        id: Uuid::new_v4().to_string(),
        date: body.date,
        start_time: body.start_time,
        end_time: body.end_time,
        reason: body.reason.unwrap_or_else(|| "Blocked".to_string()),
    };
    blockout
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut blockouts = state.hub.snapshot().config.blockouts;
    blockouts.push(blockout.clone());
    state.store_config.put_blockouts(blockouts).await?;

    Ok(Json(blockout))
}

// DELETE /api/admin/blockouts/:id
pub async fn remove_blockout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_passcode)?;
    require_connected(&state)?;

    let blockouts = state.hub.snapshot().config.blockouts;
    let remaining: Vec<Blockout> = blockouts.into_iter().filter(|b| b.id != id).collect();
    state.store_config.put_blockouts(remaining).await?;

    Ok(Json(serde_json::json!({"ok": true})))
}
