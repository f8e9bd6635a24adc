use common::{LedgerError, LedgerResult, Transaction};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::{commissions, enrollments, transactions};

/// Verified payment-confirmed event. Signature verification happened at the
/// gateway collaborator before this is handed over.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmed {
    pub buyer_id: String,
    pub course_id: String,
    pub lecturer_id: String,
    pub amount: i64,
    pub external_reference: String,
    #[serde(default)]
    pub affiliate_code: Option<String>,
}

/// How a step's failure is treated: `Critical` aborts the remaining steps,
/// `BestEffort` is logged and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Critical,
    BestEffort,
}

#[derive(Debug, Serialize)]
pub struct IntakeOutcome {
    pub transaction_id: i64,
    pub enrollment_id: i64,
    pub group_joined: bool,
    pub commission_id: Option<i64>,
}

/// The intake's side-effect commands in their strict order, each with its
/// failure policy spelled out rather than implied by code position.
const STEP_RECORD_SALE: Step = Step::new("record transaction", FailurePolicy::Critical);
const STEP_ENROLL: Step = Step::new("enroll student", FailurePolicy::Critical);
const STEP_GROUP_JOIN: Step = Step::new("group auto-join", FailurePolicy::BestEffort);
const STEP_AFFILIATE: Step = Step::new("affiliate conversion", FailurePolicy::BestEffort);

/// Runs the confirmed-sale steps in strict order: record the transaction,
/// grant access through the enrollment, then the best-effort extras. Money
/// and access are never lost because a secondary feature failed.
pub async fn process(state: &AppState, event: &PaymentConfirmed) -> LedgerResult<IntakeOutcome> {
    let transaction = STEP_RECORD_SALE.critical(record_sale(state, event).await)?;

    let enrollment = STEP_ENROLL.critical(
        enrollments::enroll(
            state,
            &event.buyer_id,
            &event.course_id,
            &event.lecturer_id,
        )
        .await,
    )?;

    let group_joined = STEP_GROUP_JOIN
        .best_effort(join_course_group(state, &event.course_id, &event.buyer_id).await)
        .unwrap_or(false);

    let commission_id = match &event.affiliate_code {
        Some(code) => STEP_AFFILIATE
            .best_effort(
                commissions::record_conversion(
                    state,
                    code,
                    &event.course_id,
                    event.amount,
                    &event.buyer_id,
                )
                .await,
            )
            .map(|c| c.id),
        None => None,
    };

    Ok(IntakeOutcome {
        transaction_id: transaction.id,
        enrollment_id: enrollment.id,
        group_joined,
        commission_id,
    })
}

async fn record_sale(state: &AppState, event: &PaymentConfirmed) -> LedgerResult<Transaction> {
    transactions::record(
        state,
        &event.buyer_id,
        &event.course_id,
        &event.lecturer_id,
        event.amount,
        &event.external_reference,
    )
    .await
}

async fn join_course_group(
    state: &AppState,
    course_id: &str,
    buyer_id: &str,
) -> LedgerResult<bool> {
    let course = state
        .db
        .get_course(course_id)
        .await?
        .ok_or(LedgerError::NotFound("course"))?;
    match course.group_id {
        Some(group_id) => state.db.join_group(&group_id, buyer_id).await,
        None => Ok(false),
    }
}

/// A named intake step with its declared failure policy.
struct Step {
    name: &'static str,
    policy: FailurePolicy,
}

impl Step {
    const fn new(name: &'static str, policy: FailurePolicy) -> Self {
        Step { name, policy }
    }

    /// `Critical`: the failure aborts the intake after being logged.
    fn critical<T>(&self, result: LedgerResult<T>) -> LedgerResult<T> {
        debug_assert_eq!(self.policy, FailurePolicy::Critical);
        result.map_err(|e| {
            log::error!("Critical step '{}' failed, aborting intake: {}", self.name, e);
            e
        })
    }

    /// `BestEffort`: the failure becomes a warning, never an error, and is
    /// not retried inline.
    fn best_effort<T>(&self, result: LedgerResult<T>) -> Option<T> {
        debug_assert_eq!(self.policy, FailurePolicy::BestEffort);
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Best-effort step '{}' failed, continuing: {}", self.name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_state;

    fn confirmed(reference: &str, affiliate_code: Option<&str>) -> PaymentConfirmed {
        PaymentConfirmed {
            buyer_id: "student-1".into(),
            course_id: "course-1".into(),
            lecturer_id: "lect-1".into(),
            amount: 100_000,
            external_reference: reference.into(),
            affiliate_code: affiliate_code.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn records_money_access_group_and_commission() {
        let state = test_state().await;
        let outcome = process(&state, &confirmed("PSK-100", Some("ABC123")))
            .await
            .unwrap();

        let tx = state
            .db
            .get_transaction_by_reference("PSK-100")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.id, outcome.transaction_id);
        assert_eq!(tx.platform_fee + tx.lecturer_earning, 100_000);

        let enrollment = state
            .db
            .get_enrollment(outcome.enrollment_id)
            .await
            .unwrap();
        assert!(enrollment.is_some());
        assert!(outcome.group_joined);

        let commission_id = outcome.commission_id.unwrap();
        let commission = state.db.get_commission(commission_id).await.unwrap().unwrap();
        assert_eq!(commission.commission_amount, 10_000);
    }

    #[tokio::test]
    async fn an_unknown_affiliate_code_never_blocks_the_sale() {
        let state = test_state().await;
        let outcome = process(&state, &confirmed("PSK-101", Some("BOGUS")))
            .await
            .unwrap();
        assert!(outcome.commission_id.is_none());
        assert!(
            state
                .db
                .get_transaction_by_reference("PSK-101")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn a_replayed_event_changes_nothing() {
        let state = test_state().await;
        let first = process(&state, &confirmed("PSK-102", None)).await.unwrap();
        let replay = process(&state, &confirmed("PSK-102", None)).await.unwrap();
        assert_eq!(first.transaction_id, replay.transaction_id);
        assert_eq!(first.enrollment_id, replay.enrollment_id);

        let account = state.db.get_lecturer_account("lect-1").await.unwrap().unwrap();
        assert_eq!(account.total_earnings, 75_000);
        let course = state.db.get_course("course-1").await.unwrap().unwrap();
        assert_eq!(course.total_students, 1);
        assert_eq!(course.total_revenue, 100_000);
    }

    #[tokio::test]
    async fn a_rejected_payment_runs_no_other_step() {
        let state = test_state().await;
        let mut event = confirmed("PSK-103", Some("ABC123"));
        event.amount = -5;
        let err = process(&state, &event).await.unwrap_err();
        assert!(matches!(err, LedgerError::NonPositiveAmount(-5)));

        let course = state.db.get_course("course-1").await.unwrap().unwrap();
        assert_eq!(course.total_students, 0);
        let summary = state.db.commission_summary("lect-1").await.unwrap();
        assert_eq!(summary.pending_count, 0);
    }
}
