use anyhow::Context;

use crate::state::AppState;

/// Revenue-split and withdrawal policy. Rates are basis points; a rate change
/// only affects records written after it, existing rows keep their snapshot.
#[derive(Debug, Clone, Copy)]
pub struct LedgerPolicy {
    pub fee_rate_bps: i64,
    pub commission_rate_bps: i64,
    pub min_withdrawal: i64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        LedgerPolicy {
            fee_rate_bps: 2_500,
            commission_rate_bps: 1_000,
            min_withdrawal: 10_000,
        }
    }
}

pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub policy: LedgerPolicy,
    pub reconcile_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let bind_port = match std::env::var("BIND_PORT") {
            Ok(port) => port.parse().context("BIND_PORT must be a valid port")?,
            Err(_) => 8080,
        };

        let defaults = LedgerPolicy::default();
        let policy = LedgerPolicy {
            fee_rate_bps: env_i64("FEE_RATE_BPS", defaults.fee_rate_bps)?,
            commission_rate_bps: env_i64("COMMISSION_RATE_BPS", defaults.commission_rate_bps)?,
            min_withdrawal: env_i64("MIN_WITHDRAWAL", defaults.min_withdrawal)?,
        };

        let reconcile_interval_secs = env_i64("RECONCILE_INTERVAL_SECS", 3_600)? as u64;

        Ok(Self {
            database_url,
            bind_addr,
            bind_port,
            policy,
            reconcile_interval_secs,
        })
    }

    pub async fn create_app_state(&self) -> anyhow::Result<AppState> {
        AppState::new(&self.database_url, self.policy)
            .await
            .context("Failed to initialize AppState")
    }
}

fn env_i64(key: &str, default: i64) -> anyhow::Result<i64> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} must be an integer", key)),
        Err(_) => Ok(default),
    }
}
