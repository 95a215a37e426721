use chrono::{Datelike, NaiveDate};

use crate::models::catalog::{format_hhmm, parse_hhmm};
use crate::models::{Blockout, Booking, BookingStatus, StoreConfig, WorkingHours};

/// Candidate start times sit on a fixed half-hour grid regardless of how
/// long the requested service runs.
pub const SLOT_STRIDE_MINUTES: u32 = 30;

/// Computes the bookable start times for one calendar day.
///
/// Pure and total: bad input shapes (closed day, malformed times, nothing
/// free) all come back as an empty list, never an error. Intervals are
/// half-open `[start, start + duration)`, so a booking ending exactly when
/// a candidate starts does not conflict with it.
///
/// `day_bookings` and `day_blockouts` must already be filtered to the day
/// being queried. `exclude_booking_id` removes one booking from conflict
/// consideration so a reschedule is never blocked by its own slot.
pub fn available_slots(
    hours: Option<&WorkingHours>,
    duration_minutes: u32,
    day_bookings: &[Booking],
    day_blockouts: &[Blockout],
    exclude_booking_id: Option<&str>,
) -> Vec<String> {
    let hours = match hours {
        Some(h) if !h.is_closed => h,
        _ => return vec![],
    };
    if duration_minutes == 0 {
        return vec![];
    }

    let (open, close) = match (parse_hhmm(&hours.start), parse_hhmm(&hours.end)) {
        (Ok(open), Ok(close)) => (open, close),
        _ => return vec![],
    };

    let blockouts: Vec<(u32, u32)> = day_blockouts
        .iter()
        .filter_map(|b| match (parse_hhmm(&b.start_time), parse_hhmm(&b.end_time)) {
            (Ok(start), Ok(end)) => Some((start, end)),
            _ => None,
        })
        .collect();

    // A blockout covering the whole working window closes the day outright.
    if blockouts.iter().any(|(start, end)| *start <= open && *end >= close) {
        return vec![];
    }

    let busy: Vec<(u32, u32)> = day_bookings
        .iter()
        .filter(|b| b.status != BookingStatus::Cancelled)
        .filter(|b| Some(b.id.as_str()) != exclude_booking_id)
        .filter_map(|b| {
            let start = parse_hhmm(&b.time_slot).ok()?;
            Some((start, start + b.duration_minutes.max(0) as u32))
        })
        .collect();

    let overlaps = |start: u32, end: u32, intervals: &[(u32, u32)]| {
        intervals.iter().any(|(s, e)| *s < end && *e > start)
    };

    let mut slots = vec![];
    let mut candidate = open;
    while candidate + duration_minutes <= close {
        let end = candidate + duration_minutes;
        if !overlaps(candidate, end, &busy) && !overlaps(candidate, end, &blockouts) {
            slots.push(format_hhmm(candidate));
        }
        candidate += SLOT_STRIDE_MINUTES;
    }
    slots
}

/// Cache-level convenience: looks up the weekday's hours and narrows the
/// full booking and blockout collections down to `date` before delegating
/// to [`available_slots`].
pub fn slots_for_date(
    config: &StoreConfig,
    bookings: &[Booking],
    date: NaiveDate,
    duration_minutes: u32,
    exclude_booking_id: Option<&str>,
) -> Vec<String> {
    let weekday = date.weekday().num_days_from_sunday() as u8;
    let date_str = date.format("%Y-%m-%d").to_string();

    let day_bookings: Vec<Booking> = bookings
        .iter()
        .filter(|b| b.date == date_str)
        .cloned()
        .collect();
    let day_blockouts: Vec<Blockout> = config
        .blockouts
        .iter()
        .filter(|b| b.date == date_str)
        .cloned()
        .collect();

    available_slots(
        config.weekly_hours.get(&weekday),
        duration_minutes,
        &day_bookings,
        &day_blockouts,
        exclude_booking_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentMethod, PaymentStatus};

    fn open_hours(start: &str, end: &str) -> WorkingHours {
        WorkingHours {
            start: start.to_string(),
            end: end.to_string(),
            is_closed: false,
        }
    }

    fn booking(id: &str, slot: &str, duration: i32, status: BookingStatus) -> Booking {
        Booking {
            id: id.to_string(),
            client_name: "Alice".to_string(),
            client_phone: "0821234567".to_string(),
            date: "2025-06-16".to_string(),
            time_slot: slot.to_string(),
            service_id: "1".to_string(),
            service_name: "Regular Cut".to_string(),
            duration_minutes: duration,
            amount_cents: 200_00,
            deposit_cents: 0,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::NotPaid,
            status,
            payment_reference: None,
            transaction_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    fn blockout(start: &str, end: &str) -> Blockout {
        Blockout {
            id: "block-1".to_string(),
            date: "2025-06-16".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            reason: "Holiday".to_string(),
        }
    }

    #[test]
    fn test_full_open_day_grid() {
        // 09:00-18:00, 60-minute service: last start is 17:00
        let slots = available_slots(Some(&open_hours("09:00", "18:00")), 60, &[], &[], None);
        assert_eq!(slots.len(), 17);
        assert_eq!(slots.first().unwrap(), "09:00");
        assert_eq!(slots.last().unwrap(), "17:00");
        assert!(slots.contains(&"09:30".to_string()));
    }

    #[test]
    fn test_closed_day_is_empty() {
        let closed = WorkingHours {
            start: "00:00".to_string(),
            end: "00:00".to_string(),
            is_closed: true,
        };
        assert!(available_slots(Some(&closed), 60, &[], &[], None).is_empty());
        assert!(available_slots(None, 60, &[], &[], None).is_empty());
    }

    #[test]
    fn test_no_trailing_partial_slot() {
        // 09:00-10:30 with a 45-minute service: 10:00 would end at 10:45
        let slots = available_slots(Some(&open_hours("09:00", "10:30")), 45, &[], &[], None);
        assert_eq!(slots, vec!["09:00", "09:30"]);
    }

    #[test]
    fn test_booking_conflicts_are_half_open() {
        // One confirmed booking 10:00-11:00
        let taken = [booking("b1", "10:00", 60, BookingStatus::Confirmed)];
        let slots = available_slots(Some(&open_hours("09:00", "18:00")), 60, &taken, &[], None);

        // 09:00 ends exactly at 10:00 — touching, not overlapping
        assert!(slots.contains(&"09:00".to_string()));
        // 09:30, 10:00 and 10:30 all overlap [10:00, 11:00)
        assert!(!slots.contains(&"09:30".to_string()));
        assert!(!slots.contains(&"10:00".to_string()));
        assert!(!slots.contains(&"10:30".to_string()));
        // 11:00 starts exactly as the booking ends
        assert!(slots.contains(&"11:00".to_string()));
    }

    #[test]
    fn test_cancelled_bookings_do_not_block() {
        let taken = [booking("b1", "10:00", 60, BookingStatus::Cancelled)];
        let slots = available_slots(Some(&open_hours("09:00", "18:00")), 60, &taken, &[], None);
        assert!(slots.contains(&"10:00".to_string()));
    }

    #[test]
    fn test_completed_bookings_still_block() {
        let taken = [booking("b1", "10:00", 60, BookingStatus::Completed)];
        let slots = available_slots(Some(&open_hours("09:00", "18:00")), 60, &taken, &[], None);
        assert!(!slots.contains(&"10:00".to_string()));
    }

    #[test]
    fn test_reschedule_excludes_own_booking() {
        let taken = [booking("b1", "10:00", 60, BookingStatus::Confirmed)];
        let hours = open_hours("09:00", "18:00");

        let without = available_slots(Some(&hours), 60, &taken, &[], None);
        assert!(!without.contains(&"10:00".to_string()));

        let with = available_slots(Some(&hours), 60, &taken, &[], Some("b1"));
        assert!(with.contains(&"10:00".to_string()));
    }

    #[test]
    fn test_full_day_blockout_closes_day() {
        let blocks = [blockout("00:00", "23:59")];
        let slots = available_slots(Some(&open_hours("09:00", "18:00")), 60, &[], &blocks, None);
        assert!(slots.is_empty());

        // Exactly spanning open-to-close counts as full-day too
        let blocks = [blockout("09:00", "18:00")];
        let slots = available_slots(Some(&open_hours("09:00", "18:00")), 60, &[], &blocks, None);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_partial_blockout_carves_out_window() {
        // Lunch 12:00-13:00 on a 09:00-18:00 day, 60-minute service
        let blocks = [blockout("12:00", "13:00")];
        let slots = available_slots(Some(&open_hours("09:00", "18:00")), 60, &[], &blocks, None);

        assert!(slots.contains(&"11:00".to_string()));
        assert!(!slots.contains(&"11:30".to_string()));
        assert!(!slots.contains(&"12:00".to_string()));
        assert!(!slots.contains(&"12:30".to_string()));
        assert!(slots.contains(&"13:00".to_string()));
    }

    #[test]
    fn test_long_service_keeps_half_hour_stride() {
        let slots = available_slots(Some(&open_hours("09:00", "12:00")), 90, &[], &[], None);
        assert_eq!(slots, vec!["09:00", "09:30", "10:00", "10:30"]);
    }

    #[test]
    fn test_pure_and_deterministic() {
        let taken = [
            booking("b1", "10:00", 60, BookingStatus::Confirmed),
            booking("b2", "14:30", 90, BookingStatus::Confirmed),
        ];
        let blocks = [blockout("12:00", "13:00")];
        let hours = open_hours("09:00", "18:00");

        let first = available_slots(Some(&hours), 60, &taken, &blocks, None);
        let second = available_slots(Some(&hours), 60, &taken, &blocks, None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_generated_slots_always_fit_and_never_collide() {
        let taken = [
            booking("b1", "09:30", 60, BookingStatus::Confirmed),
            booking("b2", "15:00", 30, BookingStatus::Confirmed),
        ];
        let blocks = [blockout("12:00", "13:30")];
        let hours = open_hours("09:00", "18:00");
        let duration = 60u32;

        let close = parse_hhmm(&hours.end).unwrap();
        for slot in available_slots(Some(&hours), duration, &taken, &blocks, None) {
            let start = parse_hhmm(&slot).unwrap();
            let end = start + duration;
            assert!(end <= close, "slot {slot} spills past closing");

            for b in &taken {
                let b_start = parse_hhmm(&b.time_slot).unwrap();
                let b_end = b_start + b.duration_minutes as u32;
                assert!(end <= b_start || start >= b_end, "slot {slot} overlaps booking");
            }
            for b in &blocks {
                let b_start = parse_hhmm(&b.start_time).unwrap();
                let b_end = parse_hhmm(&b.end_time).unwrap();
                assert!(end <= b_start || start >= b_end, "slot {slot} overlaps blockout");
            }
        }
    }

    #[test]
    fn test_slots_for_date_uses_weekday_hours() {
        let config = StoreConfig::default();

        // 2025-06-16 is a Monday (09:00-18:00 by default)
        let monday = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let slots = slots_for_date(&config, &[], monday, 60, None);
        assert_eq!(slots.first().unwrap(), "09:00");
        assert_eq!(slots.last().unwrap(), "17:00");

        // 2025-06-18 is a Wednesday, closed by default
        let wednesday = NaiveDate::from_ymd_opt(2025, 6, 18).unwrap();
        assert!(slots_for_date(&config, &[], wednesday, 60, None).is_empty());
    }

    #[test]
    fn test_slots_for_date_ignores_other_days() {
        let config = StoreConfig::default();
        let monday = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();

        // Booking and blockout sit on a different day entirely
        let mut other_day = booking("b1", "10:00", 60, BookingStatus::Confirmed);
        other_day.date = "2025-06-17".to_string();

        let slots = slots_for_date(&config, &[other_day], monday, 60, None);
        assert!(slots.contains(&"10:00".to_string()));
    }
}
