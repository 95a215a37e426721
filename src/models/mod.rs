pub mod booking;
pub mod catalog;
pub mod client;

pub use booking::{Booking, BookingPatch, BookingStatus, PaymentMethod, PaymentStatus};
pub use catalog::{Blockout, ServiceItem, StoreConfig, WorkingHours};
pub use client::Client;
