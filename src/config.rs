use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// HTTP mail relay endpoint. When unset, outbound mail is logged only.
    pub mail_relay_url: Option<String>,
    pub mail_sender: String,
    /// UPI-style collection address shown on the payment screen
    pub payment_vpa: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://agrirent.db?mode=rwc".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            mail_relay_url: env::var("MAIL_RELAY_URL").ok(),
            mail_sender: env::var("MAIL_SENDER")
                .unwrap_or_else(|_| "noreply@agrirent.local".to_string()),
            payment_vpa: env::var("PAYMENT_VPA").unwrap_or_else(|_| "payments@upi".to_string()),
        }
    }
}
