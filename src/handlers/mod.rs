pub mod admin;
pub mod client;
pub mod events;
pub mod health;
