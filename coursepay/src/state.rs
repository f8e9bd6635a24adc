use anyhow::Result;
use common::Database;

use crate::config::LedgerPolicy;

pub struct AppState {
    pub db: Database,
    pub policy: LedgerPolicy,
}

impl AppState {
    pub async fn new(database_url: &str, policy: LedgerPolicy) -> Result<Self> {
        let db = Database::new(database_url).await?;
        log::info!("Database initialized successfully!");
        Ok(AppState { db, policy })
    }
}
