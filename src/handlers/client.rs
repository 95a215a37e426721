use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::catalog::parse_hhmm;
use crate::models::client::normalize_phone;
use crate::models::{Booking, StoreConfig};
use crate::services::availability;
use crate::services::bookings::{self, NewBooking, PaymentCapture, PaymentDetails};
use crate::services::calendar;
use crate::state::AppState;

// GET /api/config
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<StoreConfig> {
    Json(state.hub.snapshot().config)
}

// GET /api/slots?date=YYYY-MM-DD&service_id=..[&exclude_booking=..]
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
    pub service_id: String,
    pub exclude_booking: Option<String>,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {}", query.date)))?;

    let snapshot = state.hub.snapshot();
    let service = snapshot
        .config
        .service(&query.service_id)
        .ok_or_else(|| AppError::NotFound(format!("service {}", query.service_id)))?;

    let slots = availability::slots_for_date(
        &snapshot.config,
        &snapshot.bookings,
        date,
        service.duration_minutes.max(0) as u32,
        query.exclude_booking.as_deref(),
    );

    Ok(Json(serde_json::json!({
        "date": query.date,
        "duration_minutes": service.duration_minutes,
        "slots": slots,
    })))
}

// GET /api/bookings?phone=..
#[derive(Deserialize)]
pub struct MyBookingsQuery {
    pub phone: String,
}

pub async fn get_client_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MyBookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let phone = normalize_phone(&query.phone).map_err(|e| AppError::Validation(e.to_string()))?;

    let mut bookings: Vec<Booking> = state
        .hub
        .snapshot()
        .bookings
        .into_iter()
        .filter(|b| b.client_phone == phone)
        .collect();
    // Most recent appointment date first
    bookings.sort_by(|a, b| b.date.cmp(&a.date).then(b.time_slot.cmp(&a.time_slot)));

    Ok(Json(bookings))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub client_name: String,
    pub client_phone: String,
    pub date: String,
    pub time_slot: String,
    pub service_id: String,
    /// "cash" or "online"
    pub payment_method: String,
    /// Online only: "full" (default) or "deposit"
    pub capture: Option<String>,
    pub payment_reference: Option<String>,
    pub transaction_id: Option<String>,
    /// Booking being replaced, cancelled best-effort after the new one is
    /// stored.
    pub reschedule_of: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Response, AppError> {
    if !state.hub.is_connected() {
        return Err(AppError::StoreUnavailable);
    }

    let client_name = body.client_name.trim().to_string();
    if client_name.is_empty() {
        return Err(AppError::Validation("client name is required".to_string()));
    }
    let client_phone =
        normalize_phone(&body.client_phone).map_err(|e| AppError::Validation(e.to_string()))?;
    NaiveDate::parse_from_str(&body.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {}", body.date)))?;
    parse_hhmm(&body.time_slot).map_err(|e| AppError::Validation(e.to_string()))?;

    let service = state
        .hub
        .snapshot()
        .config
        .service(&body.service_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("service {}", body.service_id)))?;

    let payment = match body.payment_method.as_str() {
        "cash" => PaymentDetails::Cash,
        "online" => {
            // Online bookings only exist once the payment collaborator has
            // reported success, so the reference is mandatory.
            let reference = body
                .payment_reference
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    AppError::Validation("online booking requires a payment reference".to_string())
                })?
                .to_string();
            let capture = match body.capture.as_deref() {
                None | Some("full") => PaymentCapture::Full,
                Some("deposit") => PaymentCapture::Deposit,
                Some(other) => {
                    return Err(AppError::Validation(format!("invalid capture: {other}")))
                }
            };
            PaymentDetails::Online {
                reference,
                transaction_id: body.transaction_id.clone(),
                capture,
            }
        }
        other => {
            return Err(AppError::Validation(format!("invalid payment method: {other}")))
        }
    };

    let request = NewBooking {
        client_name,
        client_phone,
        date: body.date,
        time_slot: body.time_slot,
        service,
        payment,
    };

    match bookings::create_booking(&state.bookings, request, body.reschedule_of).await {
        Ok(booking) => Ok((StatusCode::CREATED, Json(booking)).into_response()),
        Err(e) => {
            // Put watching surfaces back on known state before reporting.
            state.hub.refresh();
            Err(e.into())
        }
    }
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.hub.is_connected() {
        return Err(AppError::StoreUnavailable);
    }

    bookings::cancel_booking(&state.bookings, &id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/bookings/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let snapshot = state.hub.snapshot();
    let booking = snapshot
        .bookings
        .iter()
        .find(|b| b.id == id)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    let ics = calendar::generate_ics(booking, &state.config.business_name)
        .ok_or_else(|| AppError::Validation("booking has no valid date/time".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"appointment.ics\"",
            ),
        ],
        ics,
    )
        .into_response())
}
