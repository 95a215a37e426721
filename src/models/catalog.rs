use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An entry on the service menu. Bookings copy name, duration and price at
/// creation time, so editing or deleting a service never touches past
/// bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub duration_minutes: i32,
}

impl ServiceItem {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("service name must not be empty");
        }
        if self.price_cents < 0 {
            anyhow::bail!("service price must not be negative");
        }
        if self.duration_minutes <= 0 {
            anyhow::bail!("service duration must be positive");
        }
        Ok(())
    }
}

/// Opening hours for one weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    /// `HH:mm`
    pub start: String,
    /// `HH:mm`
    pub end: String,
    pub is_closed: bool,
}

impl WorkingHours {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.is_closed {
            return Ok(());
        }
        let start = parse_hhmm(&self.start)?;
        let end = parse_hhmm(&self.end)?;
        if start >= end {
            anyhow::bail!("opening time must be before closing time");
        }
        Ok(())
    }
}

/// A closed sub-interval of a single calendar day (lunch break, holiday),
/// distinct from the weekly recurring closed day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blockout {
    pub id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:mm`
    pub start_time: String,
    /// `HH:mm`
    pub end_time: String,
    pub reason: String,
}

impl Blockout {
    pub fn validate(&self) -> anyhow::Result<()> {
        chrono::NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| anyhow::anyhow!("invalid blockout date: {}", self.date))?;
        let start = parse_hhmm(&self.start_time)?;
        let end = parse_hhmm(&self.end_time)?;
        if end <= start {
            anyhow::bail!("blockout end time must be after start time");
        }
        Ok(())
    }
}

/// The single shop-configuration document: service menu, weekly hours
/// (weekday index 0 = Sunday .. 6 = Saturday, all seven present) and
/// blockouts. Seeded with defaults when the backing store holds nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub services: Vec<ServiceItem>,
    pub weekly_hours: BTreeMap<u8, WorkingHours>,
    pub blockouts: Vec<Blockout>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let service = |id: &str, name: &str, price_cents: i64| ServiceItem {
            id: id.to_string(),
            name: name.to_string(),
            price_cents,
            duration_minutes: 60,
        };

        let open = |start: &str, end: &str| WorkingHours {
            start: start.to_string(),
            end: end.to_string(),
            is_closed: false,
        };

        let mut weekly_hours = BTreeMap::new();
        weekly_hours.insert(0, open("09:00", "15:00")); // Sun
        weekly_hours.insert(1, open("09:00", "18:00"));
        weekly_hours.insert(2, open("09:00", "18:00"));
        weekly_hours.insert(
            3,
            WorkingHours {
                start: "00:00".to_string(),
                end: "00:00".to_string(),
                is_closed: true,
            },
        ); // Wed
        weekly_hours.insert(4, open("09:00", "18:00"));
        weekly_hours.insert(5, open("09:00", "18:00"));
        weekly_hours.insert(6, open("09:00", "18:00")); // Sat

        Self {
            services: vec![
                service("1", "Regular Cut", 200_00),
                service("2", "Cut & Black Dye", 300_00),
                service("3", "Blade Fade & Beard Trim", 250_00),
                service("4", "Machine Cut & Scissor", 250_00),
                service("5", "Machine Cut & Beard Trim", 100_00),
                service("6", "Blade Cut & Beard Trim", 150_00),
            ],
            weekly_hours,
            blockouts: vec![],
        }
    }
}

impl StoreConfig {
    /// Fills in any field group missing from a stored document, so configs
    /// written by older versions keep loading.
    pub fn merge_defaults(mut self) -> Self {
        let defaults = StoreConfig::default();
        if self.services.is_empty() {
            self.services = defaults.services;
        }
        for (day, hours) in defaults.weekly_hours {
            self.weekly_hours.entry(day).or_insert(hours);
        }
        self
    }

    pub fn service(&self, id: &str) -> Option<&ServiceItem> {
        self.services.iter().find(|s| s.id == id)
    }
}

/// Parses `HH:mm` into minutes since midnight.
pub fn parse_hhmm(s: &str) -> anyhow::Result<u32> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        anyhow::bail!("invalid time format: {s}");
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    if hour > 23 || minute > 59 {
        anyhow::bail!("time out of range: {s}");
    }
    Ok(hour * 60 + minute)
}

/// Formats minutes since midnight back into `HH:mm`.
pub fn format_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
