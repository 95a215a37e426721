use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::Booking;

/// Renders a booking as a single-event iCalendar file clients can import.
/// Returns None when the stored date or slot does not parse.
pub fn generate_ics(booking: &Booking, business_name: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(&booking.date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&booking.time_slot, "%H:%M").ok()?;
    let start = NaiveDateTime::new(date, time);
    let end = start + Duration::minutes(booking.duration_minutes as i64);

    let dtstart = start.format("%Y%m%dT%H%M%S").to_string();
    let dtend = end.format("%Y%m%dT%H%M%S").to_string();
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@chairtime", booking.id);

    let summary = format!("{} at {}", booking.service_name, business_name);
    let description = format!(
        "{} ({} min) for {}",
        booking.service_name, booking.duration_minutes, booking.client_name
    );

    Some(format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Chairtime//Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    ))
}
