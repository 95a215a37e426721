use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingPatch, BookingStatus, PaymentMethod, PaymentStatus, StoreConfig,
};

const CONFIG_KEY: &str = "store_config";

const BOOKING_COLUMNS: &str = "id, client_name, client_phone, date, time_slot, service_id, \
     service_name, duration_minutes, amount_cents, deposit_cents, payment_method, \
     payment_status, status, payment_reference, transaction_id, created_at";

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let created_at = booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO bookings (id, client_name, client_phone, date, time_slot, service_id, \
         service_name, duration_minutes, amount_cents, deposit_cents, payment_method, \
         payment_status, status, payment_reference, transaction_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            booking.id,
            booking.client_name,
            booking.client_phone,
            booking.date,
            booking.time_slot,
            booking.service_id,
            booking.service_name,
            booking.duration_minutes,
            booking.amount_cents,
            booking.deposit_cents,
            booking.payment_method.as_str(),
            booking.payment_status.as_str(),
            booking.status.as_str(),
            booking.payment_reference,
            booking.transaction_id,
            created_at,
        ],
    )?;
    Ok(())
}

/// Applies the non-`None` fields of the patch. Returns false when no row
/// carries the id (already deleted upstream).
pub fn update_booking(conn: &Connection, id: &str, patch: &BookingPatch) -> anyhow::Result<bool> {
    let mut sets: Vec<String> = vec![];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    let mut push = |column: &str, value: Box<dyn rusqlite::types::ToSql>| {
        values.push(value);
        sets.push(format!("{column} = ?{}", values.len()));
    };

    if let Some(date) = &patch.date {
        push("date", Box::new(date.clone()));
    }
    if let Some(slot) = &patch.time_slot {
        push("time_slot", Box::new(slot.clone()));
    }
    if let Some(amount) = patch.amount_cents {
        push("amount_cents", Box::new(amount));
    }
    if let Some(deposit) = patch.deposit_cents {
        push("deposit_cents", Box::new(deposit));
    }
    if let Some(payment_status) = patch.payment_status {
        push("payment_status", Box::new(payment_status.as_str().to_string()));
    }
    if let Some(status) = patch.status {
        push("status", Box::new(status.as_str().to_string()));
    }
    if let Some(reference) = &patch.payment_reference {
        push("payment_reference", Box::new(reference.clone()));
    }
    if let Some(transaction_id) = &patch.transaction_id {
        push("transaction_id", Box::new(transaction_id.clone()));
    }

    if sets.is_empty() {
        // Nothing to merge; still report whether the record exists.
        return booking_exists(conn, id);
    }

    values.push(Box::new(id.to_string()));
    let sql = format!(
        "UPDATE bookings SET {} WHERE id = ?{}",
        sets.join(", "),
        values.len()
    );

    let value_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let count = conn.execute(&sql, value_refs.as_slice())?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Full collection, newest created first — the order the cache keeps.
pub fn get_all_bookings(conn: &Connection) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, id DESC"
    ))?;

    let rows = stmt.query_map([], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn booking_exists(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let status_str: String = row.get(12)?;
    let payment_method_str: String = row.get(10)?;
    let payment_status_str: String = row.get(11)?;
    let created_at_str: String = row.get(15)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id: row.get(0)?,
        client_name: row.get(1)?,
        client_phone: row.get(2)?,
        date: row.get(3)?,
        time_slot: row.get(4)?,
        service_id: row.get(5)?,
        service_name: row.get(6)?,
        duration_minutes: row.get(7)?,
        amount_cents: row.get(8)?,
        deposit_cents: row.get(9)?,
        payment_method: PaymentMethod::parse(&payment_method_str),
        payment_status: PaymentStatus::parse(&payment_status_str),
        status: BookingStatus::parse(&status_str),
        payment_reference: row.get(13)?,
        transaction_id: row.get(14)?,
        created_at,
    })
}

// ── Store configuration document ──

/// Reads the configuration document, or None when it has never been written.
pub fn get_config(conn: &Connection) -> anyhow::Result<Option<StoreConfig>> {
    let result = conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![CONFIG_KEY],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(json) => {
            let config: StoreConfig = serde_json::from_str(&json)?;
            Ok(Some(config.merge_defaults()))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn put_config(conn: &Connection, config: &StoreConfig) -> anyhow::Result<()> {
    let json = serde_json::to_string(config)?;
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           updated_at = datetime('now')",
        params![CONFIG_KEY, json],
    )?;
    Ok(())
}
