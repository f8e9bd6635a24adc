use common::{
    AffiliatePayout, BankDetails, Commission, CommissionStatus, CommissionSummary, LedgerError,
    LedgerResult, WithdrawalStatus,
};

use crate::state::AppState;

/// Records a referral conversion. The commission rate is snapshotted at this
/// instant; later changes to the global rate never touch existing rows.
/// Unknown or inactive codes reject the conversion without affecting the sale
/// (the intake treats this step as best-effort).
pub async fn record_conversion(
    state: &AppState,
    affiliate_code: &str,
    course_id: &str,
    course_price: i64,
    student_id: &str,
) -> LedgerResult<Commission> {
    if course_price <= 0 {
        return Err(LedgerError::NonPositiveAmount(course_price));
    }

    let code = state
        .db
        .get_affiliate_code(affiliate_code)
        .await?
        .ok_or_else(|| LedgerError::UnknownAffiliateCode(affiliate_code.to_string()))?;

    let commission = Commission::new(
        code.affiliate_id,
        code.code,
        course_id.to_string(),
        course_price,
        state.policy.commission_rate_bps,
        student_id.to_string(),
    );
    let saved = state.db.save_commission(&commission).await?;
    log::info!(
        "Commission {} recorded: affiliate={} code={} amount={}",
        saved.id,
        saved.affiliate_id,
        saved.affiliate_code,
        saved.commission_amount
    );
    Ok(saved)
}

/// Admin approval: pending -> approved.
pub async fn approve(state: &AppState, commission_id: i64) -> LedgerResult<Commission> {
    state
        .db
        .transition_commission(commission_id, CommissionStatus::Approved)
        .await
}

/// Admin settlement: approved/processing -> paid. Terminal.
pub async fn mark_paid(state: &AppState, commission_id: i64) -> LedgerResult<Commission> {
    state
        .db
        .transition_commission(commission_id, CommissionStatus::Paid)
        .await
}

/// Affiliate payout request over currently-approved commissions: validates
/// the destination account, requires the amount to be covered by the approved
/// total, then moves those commissions to `processing` linked to the payout.
pub async fn request_payout(
    state: &AppState,
    affiliate_id: &str,
    amount: i64,
    bank: BankDetails,
) -> LedgerResult<AffiliatePayout> {
    if affiliate_id.trim().is_empty() {
        return Err(LedgerError::MissingField("affiliate_id"));
    }
    if amount <= 0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    bank.validate()?;

    let payout = AffiliatePayout {
        id: 0, // set by DB
        affiliate_id: affiliate_id.to_string(),
        amount,
        bank_name: bank.bank_name,
        account_number: bank.account_number,
        account_name: bank.account_name,
        status: WithdrawalStatus::Pending,
        requested_at: None,
    };
    state.db.request_affiliate_payout(&payout).await
}

/// Recomputed from the commission rows on every call, never cached.
pub async fn summary(state: &AppState, affiliate_id: &str) -> LedgerResult<CommissionSummary> {
    state.db.commission_summary(affiliate_id).await
}
