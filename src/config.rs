use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Shared admin passcode, compared for equality. No sessions, no expiry.
    pub admin_passcode: String,
    pub business_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "chairtime.db".to_string()),
            admin_passcode: env::var("ADMIN_PASSCODE").unwrap_or_else(|_| "1234".to_string()),
            business_name: env::var("BUSINESS_NAME")
                .unwrap_or_else(|_| "Waylin's Barbershop".to_string()),
        }
    }
}
