use common::{BankDetails, LedgerError, LedgerResult, Withdrawal, WithdrawalStatus};

use crate::state::AppState;

/// Opens a payout request. The amount is reserved out of the lecturer's
/// withdrawable balance in the same unit of work that creates the pending
/// row; validation failures leave nothing persisted. `reference` is the
/// caller's idempotency key: a retry carrying the same reference gets the
/// original withdrawal back instead of a second reservation.
pub async fn request(
    state: &AppState,
    lecturer_id: &str,
    amount: i64,
    bank: BankDetails,
    reference: Option<&str>,
) -> LedgerResult<Withdrawal> {
    if lecturer_id.trim().is_empty() {
        return Err(LedgerError::MissingField("lecturer_id"));
    }
    if reference.is_some_and(|r| r.trim().is_empty()) {
        return Err(LedgerError::MissingField("reference"));
    }
    if amount < state.policy.min_withdrawal {
        return Err(LedgerError::BelowMinimumWithdrawal {
            amount,
            minimum: state.policy.min_withdrawal,
        });
    }
    bank.validate()?;

    let withdrawal = Withdrawal::new(
        lecturer_id.to_string(),
        amount,
        bank,
        reference.map(str::to_string),
    );
    let saved = state.db.request_withdrawal(&withdrawal).await?;
    log::info!(
        "Withdrawal {} requested: lecturer={} amount={} reference={}",
        saved.id,
        saved.lecturer_id,
        saved.amount,
        saved.reference
    );
    Ok(saved)
}

/// Moves a withdrawal along pending -> processing -> completed/failed. A
/// transition to `failed` credits the reserved amount back to the lecturer
/// balance atomically with the status write.
pub async fn transition(
    state: &AppState,
    withdrawal_id: i64,
    to: WithdrawalStatus,
) -> LedgerResult<Withdrawal> {
    let updated = state.db.transition_withdrawal(withdrawal_id, to).await?;
    log::info!(
        "Withdrawal {} moved to {}: lecturer={} amount={}",
        updated.id,
        updated.status,
        updated.lecturer_id,
        updated.amount
    );
    Ok(updated)
}
