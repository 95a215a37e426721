use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single appointment. Service name, duration and price are snapshotted
/// from the service menu at creation time and never follow later edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub client_name: String,
    pub client_phone: String,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// Start time on the slot grid, `HH:mm`.
    pub time_slot: String,
    pub service_id: String,
    pub service_name: String,
    pub duration_minutes: i32,
    pub amount_cents: i64,
    pub deposit_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub payment_reference: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cancelled" => BookingStatus::Cancelled,
            "completed" => BookingStatus::Completed,
            _ => BookingStatus::Confirmed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    PartiallyPaid,
    NotPaid,
    Refunded,
    /// Present in stored data but never assigned by any current transition.
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::NotPaid => "not_paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "paid" => PaymentStatus::Paid,
            "partially_paid" => PaymentStatus::PartiallyPaid,
            "refunded" => PaymentStatus::Refunded,
            "pending" => PaymentStatus::Pending,
            _ => PaymentStatus::NotPaid,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "online" => PaymentMethod::Online,
            _ => PaymentMethod::Cash,
        }
    }
}

/// Field subset for a partial booking update. `None` fields are left as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub amount_cents: Option<i64>,
    pub deposit_cents: Option<i64>,
    pub payment_status: Option<PaymentStatus>,
    pub status: Option<BookingStatus>,
    pub payment_reference: Option<String>,
    pub transaction_id: Option<String>,
}

impl BookingPatch {
    pub fn status(status: BookingStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn payment_status(status: PaymentStatus) -> Self {
        Self {
            payment_status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.time_slot.is_none()
            && self.amount_cents.is_none()
            && self.deposit_cents.is_none()
            && self.payment_status.is_none()
            && self.status.is_none()
            && self.payment_reference.is_none()
            && self.transaction_id.is_none()
    }
}
