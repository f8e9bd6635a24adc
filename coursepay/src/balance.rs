use actix_web::web;
use common::LedgerResult;
use tokio::time::{Duration, sleep};

use crate::state::AppState;

/// Reads the incrementally-maintained withdrawable balance. Zero for a
/// lecturer with no recorded sales yet.
pub async fn available_balance(state: &AppState, lecturer_id: &str) -> LedgerResult<i64> {
    let account = state.db.get_lecturer_account(lecturer_id).await?;
    Ok(account.map(|a| a.pending_withdrawal).unwrap_or(0))
}

/// One reconciliation pass over every known lecturer: folds the transaction
/// and withdrawal history and rewrites any counter that drifted.
pub async fn reconcile_all(state: &AppState) -> LedgerResult<u64> {
    let mut corrected = 0;
    for lecturer_id in state.db.list_lecturer_ids().await? {
        let (stored, derived) = state.db.reconcile_lecturer(&lecturer_id).await?;
        if stored != derived {
            corrected += 1;
            log::warn!(
                "Balance drift corrected for lecturer {}: stored={} derived={}",
                lecturer_id,
                stored,
                derived
            );
        }
    }
    Ok(corrected)
}

/// Periodic reconciliation sweep, outside the request path.
pub async fn start_reconciliation_runner(data: web::Data<AppState>, interval_secs: u64) {
    loop {
        match reconcile_all(&data).await {
            Ok(0) => log::debug!("Reconciliation sweep finished, no drift"),
            Ok(n) => log::info!("Reconciliation sweep corrected {} account(s)", n),
            Err(e) => log::error!("Reconciliation sweep failed: {}", e),
        }
        sleep(Duration::from_secs(interval_secs)).await;
    }
}
