use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use common::{LecturerEarnings, LedgerError, LedgerResult, Transaction, WithdrawalStatus};

use crate::state::AppState;

/// Calendar-month boundaries are evaluated in this fixed reference timezone
/// (UTC+01:00, Lagos).
const REFERENCE_OFFSET_SECS: i32 = 3_600;

/// Records a confirmed sale: validates, splits at the current fee rate and
/// persists the immutable row together with the lecturer/course aggregate
/// increments. Replays of the same `external_reference` return the original
/// record without double-counting revenue.
pub async fn record(
    state: &AppState,
    buyer_id: &str,
    course_id: &str,
    lecturer_id: &str,
    amount: i64,
    external_reference: &str,
) -> LedgerResult<Transaction> {
    if amount <= 0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    if buyer_id.trim().is_empty() {
        return Err(LedgerError::MissingField("buyer_id"));
    }
    if course_id.trim().is_empty() {
        return Err(LedgerError::MissingField("course_id"));
    }
    if lecturer_id.trim().is_empty() {
        return Err(LedgerError::MissingField("lecturer_id"));
    }
    if external_reference.trim().is_empty() {
        return Err(LedgerError::MissingField("external_reference"));
    }

    let transaction = Transaction::new(
        buyer_id.to_string(),
        course_id.to_string(),
        lecturer_id.to_string(),
        amount,
        state.policy.fee_rate_bps,
        external_reference.to_string(),
    );
    state.db.record_transaction(&transaction).await
}

/// Earnings summary for the lecturer dashboard: lifetime total, the current
/// reference-timezone calendar month, the withdrawable balance, completed
/// payouts, and the transaction history newest-first.
pub async fn earnings(state: &AppState, lecturer_id: &str) -> LedgerResult<LecturerEarnings> {
    let account = state.db.get_lecturer_account(lecturer_id).await?;
    let (total, pending) = account
        .map(|a| (a.total_earnings, a.pending_withdrawal))
        .unwrap_or((0, 0));

    let (month_start, month_end) = month_bounds_utc(Utc::now());
    let this_month = state
        .db
        .sum_lecturer_earnings_between(lecturer_id, month_start, month_end)
        .await?;

    let paid = state
        .db
        .sum_withdrawals_by_status(lecturer_id, WithdrawalStatus::Completed)
        .await?;

    let transactions = state.db.get_transactions_for_lecturer(lecturer_id).await?;

    Ok(LecturerEarnings {
        total,
        this_month,
        pending,
        paid,
        transactions,
    })
}

/// UTC bounds of the calendar month containing `now` in the reference
/// timezone.
pub fn month_bounds_utc(now: DateTime<Utc>) -> (NaiveDateTime, NaiveDateTime) {
    let offset = FixedOffset::east_opt(REFERENCE_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    let local = now.with_timezone(&offset);

    let (year, month) = (local.year(), local.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let start = offset
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.naive_utc())
        .unwrap_or_else(|| now.naive_utc());
    let end = offset
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.naive_utc())
        .unwrap_or_else(|| now.naive_utc());
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_state;
    use chrono::TimeZone;

    #[tokio::test]
    async fn splits_revenue_at_the_snapshotted_rate() {
        let state = test_state().await;
        let tx = record(&state, "buyer-1", "course-1", "lect-1", 100_000, "PSK-001")
            .await
            .unwrap();
        assert_eq!(tx.platform_fee, 25_000);
        assert_eq!(tx.lecturer_earning, 75_000);
        assert_eq!(tx.platform_fee + tx.lecturer_earning, tx.amount);

        let account = state.db.get_lecturer_account("lect-1").await.unwrap().unwrap();
        assert_eq!(account.total_earnings, 75_000);
        assert_eq!(account.pending_withdrawal, 75_000);

        let course = state.db.get_course("course-1").await.unwrap().unwrap();
        assert_eq!(course.total_revenue, 100_000);
    }

    #[tokio::test]
    async fn replayed_reference_does_not_double_record() {
        let state = test_state().await;
        let first = record(&state, "buyer-1", "course-1", "lect-1", 40_000, "PSK-002")
            .await
            .unwrap();
        let replay = record(&state, "buyer-1", "course-1", "lect-1", 40_000, "PSK-002")
            .await
            .unwrap();
        assert_eq!(first.id, replay.id);

        let account = state.db.get_lecturer_account("lect-1").await.unwrap().unwrap();
        assert_eq!(account.total_earnings, 30_000);
    }

    #[tokio::test]
    async fn rejects_invalid_input_before_persisting() {
        let state = test_state().await;
        assert!(matches!(
            record(&state, "b", "c", "l", 0, "PSK-003").await,
            Err(LedgerError::NonPositiveAmount(0))
        ));
        assert!(matches!(
            record(&state, "", "c", "l", 100, "PSK-003").await,
            Err(LedgerError::MissingField("buyer_id"))
        ));
        assert!(matches!(
            record(&state, "b", "c", "l", 100, "  ").await,
            Err(LedgerError::MissingField("external_reference"))
        ));
        assert!(
            state
                .db
                .get_transaction_by_reference("PSK-003")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn earnings_summary_reflects_history() {
        let state = test_state().await;
        record(&state, "b1", "course-1", "lect-1", 100_000, "PSK-010")
            .await
            .unwrap();
        record(&state, "b2", "course-1", "lect-1", 20_000, "PSK-011")
            .await
            .unwrap();

        let summary = earnings(&state, "lect-1").await.unwrap();
        assert_eq!(summary.total, 90_000);
        assert_eq!(summary.this_month, 90_000);
        assert_eq!(summary.pending, 90_000);
        assert_eq!(summary.paid, 0);
        assert_eq!(summary.transactions.len(), 2);
    }

    #[test]
    fn month_bounds_follow_the_reference_offset() {
        // 2026-02-28 23:30 UTC is already March 1st, 00:30 in UTC+01:00.
        let now = Utc.with_ymd_and_hms(2026, 2, 28, 23, 30, 0).unwrap();
        let (start, end) = month_bounds_utc(now);
        assert_eq!(
            start,
            Utc.with_ymd_and_hms(2026, 2, 28, 23, 0, 0).unwrap().naive_utc()
        );
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).unwrap().naive_utc()
        );
    }
}
