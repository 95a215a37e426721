use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{Booking, BookingPatch, BookingStatus, PaymentMethod, PaymentStatus, ServiceItem};
use crate::store::BookingStore;

/// What the caller knows at creation time. The service item is the
/// denormalization source: its name, duration and price are copied into the
/// booking record and never follow later menu edits.
pub struct NewBooking {
    pub client_name: String,
    pub client_phone: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:mm`
    pub time_slot: String,
    pub service: ServiceItem,
    pub payment: PaymentDetails,
}

/// How the booking is being paid for. `Online` is only constructed after
/// the payment collaborator has reported success, so it always carries the
/// collaborator's reference.
pub enum PaymentDetails {
    Cash,
    Online {
        reference: String,
        transaction_id: Option<String>,
        capture: PaymentCapture,
    },
}

/// Online payments are either the full price or exactly half, never any
/// other fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCapture {
    Full,
    Deposit,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking not found")]
    NotFound,

    /// Payment was captured but the booking never reached the store. The
    /// reference must reach the client for manual reconciliation; retrying
    /// automatically could double-charge.
    #[error("payment {reference} captured but booking could not be recorded")]
    PaymentUnrecorded {
        reference: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Creates a booking as a single atomic store write: fresh id, confirmed
/// status, creation timestamp and the denormalized service snapshot.
///
/// Slot availability is NOT re-validated here — the caller just derived the
/// slot from the live cache, and the remaining race between two clients is
/// accepted and surfaced reactively after the fact.
///
/// With `reschedule_of`, the replaced booking is cancelled best-effort in
/// the background once the new one is safely stored; a failed cancel is
/// logged, never propagated.
pub async fn create_booking(
    store: &Arc<dyn BookingStore>,
    request: NewBooking,
    reschedule_of: Option<String>,
) -> Result<Booking, BookingError> {
    let amount_cents = request.service.price_cents;

    let (payment_method, payment_status, deposit_cents, payment_reference, transaction_id) =
        match &request.payment {
            PaymentDetails::Cash => (PaymentMethod::Cash, PaymentStatus::NotPaid, 0, None, None),
            PaymentDetails::Online {
                reference,
                transaction_id,
                capture,
            } => {
                let (status, deposit) = match capture {
                    PaymentCapture::Full => (PaymentStatus::Paid, amount_cents),
                    PaymentCapture::Deposit => (PaymentStatus::PartiallyPaid, amount_cents / 2),
                };
                (
                    PaymentMethod::Online,
                    status,
                    deposit,
                    Some(reference.clone()),
                    transaction_id.clone(),
                )
            }
        };

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        client_name: request.client_name,
        client_phone: request.client_phone,
        date: request.date,
        time_slot: request.time_slot,
        service_id: request.service.id,
        service_name: request.service.name,
        duration_minutes: request.service.duration_minutes,
        amount_cents,
        deposit_cents,
        payment_method,
        payment_status,
        status: BookingStatus::Confirmed,
        payment_reference,
        transaction_id,
        created_at: Utc::now().naive_utc(),
    };

    if let Err(e) = store.create(&booking).await {
        return Err(match booking.payment_reference {
            Some(reference) => BookingError::PaymentUnrecorded { reference, source: e },
            None => BookingError::Store(e),
        });
    }

    tracing::info!(
        id = %booking.id,
        date = %booking.date,
        slot = %booking.time_slot,
        service = %booking.service_name,
        method = payment_method.as_str(),
        "booking created"
    );

    if let Some(old_id) = reschedule_of {
        let store = Arc::clone(store);
        let new_id = booking.id.clone();
        tokio::spawn(async move {
            match store
                .update(&old_id, &BookingPatch::status(BookingStatus::Cancelled))
                .await
            {
                Ok(true) => {
                    tracing::info!(old = %old_id, new = %new_id, "cancelled rescheduled booking")
                }
                Ok(false) => {
                    tracing::warn!(old = %old_id, "reschedule source already gone, nothing to cancel")
                }
                Err(e) => {
                    tracing::warn!(error = %e, old = %old_id, "failed to cancel rescheduled booking")
                }
            }
        });
    }

    Ok(booking)
}

/// Merges a partial update into a stored booking.
pub async fn update_booking(
    store: &Arc<dyn BookingStore>,
    id: &str,
    patch: &BookingPatch,
) -> Result<(), BookingError> {
    if store.update(id, patch).await? {
        Ok(())
    } else {
        Err(BookingError::NotFound)
    }
}

pub async fn cancel_booking(store: &Arc<dyn BookingStore>, id: &str) -> Result<(), BookingError> {
    update_booking(store, id, &BookingPatch::status(BookingStatus::Cancelled)).await
}

pub async fn complete_booking(store: &Arc<dyn BookingStore>, id: &str) -> Result<(), BookingError> {
    update_booking(store, id, &BookingPatch::status(BookingStatus::Completed)).await
}

/// Permanent removal. Meant for records that are already cancelled; the
/// engine itself does not enforce that.
pub async fn delete_booking(store: &Arc<dyn BookingStore>, id: &str) -> Result<(), BookingError> {
    if store.delete(id).await? {
        Ok(())
    } else {
        Err(BookingError::NotFound)
    }
}

/// The admin's manual payment toggle. Once a deposit is settled the status
/// oscillates between paid and not-paid; partially-paid is only ever
/// entered at creation time and never re-entered here.
pub fn next_payment_status(current: PaymentStatus) -> PaymentStatus {
    match current {
        PaymentStatus::PartiallyPaid => PaymentStatus::Paid,
        PaymentStatus::Paid => PaymentStatus::NotPaid,
        _ => PaymentStatus::Paid,
    }
}

pub async fn toggle_payment(
    store: &Arc<dyn BookingStore>,
    booking: &Booking,
) -> Result<PaymentStatus, BookingError> {
    let next = next_payment_status(booking.payment_status);
    update_booking(store, &booking.id, &BookingPatch::payment_status(next)).await?;
    Ok(next)
}
