//! Application state shared across all handlers

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::mailer::{HttpMailer, LogMailer, Mailer};

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub mailer: Arc<dyn Mailer>,
    /// Collection address shown on the payment screen
    pub payment_vpa: String,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
            Some(url) => Arc::new(HttpMailer::new(url.clone(), config.mail_sender.clone())),
            None => Arc::new(LogMailer),
        };

        Self {
            db,
            mailer,
            payment_vpa: config.payment_vpa.clone(),
        }
    }

    /// State with an explicit mailer, used by tests
    pub fn with_mailer(db: DatabaseConnection, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            mailer,
            payment_vpa: "payments@upi".to_string(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Allow extracting DatabaseConnection directly in handlers that don't mail
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
