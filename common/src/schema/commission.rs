use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::withdrawal::WithdrawalStatus;

/// Referral commission states. `Paid` is terminal; `Processing` means the
/// commission is linked to a payout request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Processing,
    Paid,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Approved => "approved",
            CommissionStatus::Processing => "processing",
            CommissionStatus::Paid => "paid",
        }
    }

    /// Forward-only: pending -> approved -> processing -> paid, with a
    /// direct approved -> paid shortcut when no payout request is involved.
    pub fn can_transition(&self, to: CommissionStatus) -> bool {
        matches!(
            (self, to),
            (CommissionStatus::Pending, CommissionStatus::Approved)
                | (CommissionStatus::Approved, CommissionStatus::Processing)
                | (CommissionStatus::Approved, CommissionStatus::Paid)
                | (CommissionStatus::Processing, CommissionStatus::Paid)
        )
    }
}

impl std::fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A referral conversion. The rate is captured at creation time and never
/// recomputed from the current global rate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Commission {
    pub id: i64,
    pub affiliate_id: String,
    pub affiliate_code: String,
    pub course_id: String,
    pub course_price: i64,
    pub commission_rate_bps: i64,
    pub commission_amount: i64,
    pub student_id: String,
    pub status: CommissionStatus,
    pub payout_id: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

impl Commission {
    pub fn new(
        affiliate_id: String,
        affiliate_code: String,
        course_id: String,
        course_price: i64,
        commission_rate_bps: i64,
        student_id: String,
    ) -> Self {
        let commission_amount = course_price * commission_rate_bps / 10_000;
        Commission {
            id: 0, // set by DB
            affiliate_id,
            affiliate_code,
            course_id,
            course_price,
            commission_rate_bps,
            commission_amount,
            student_id,
            status: CommissionStatus::Pending,
            payout_id: None,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AffiliateCode {
    pub code: String,
    pub affiliate_id: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AffiliatePayout {
    pub id: i64,
    pub affiliate_id: String,
    pub amount: i64,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    pub status: WithdrawalStatus,
    pub requested_at: Option<NaiveDateTime>,
}

/// Per-status amounts and counts, recomputed from source records on every
/// call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommissionSummary {
    pub pending_amount: i64,
    pub pending_count: i64,
    pub approved_amount: i64,
    pub approved_count: i64,
    pub processing_amount: i64,
    pub processing_count: i64,
    pub paid_amount: i64,
    pub paid_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commission_amount_uses_snapshotted_rate() {
        let c = Commission::new(
            "L1".into(),
            "ABC123".into(),
            "course-1".into(),
            40_000,
            1_000,
            "student-1".into(),
        );
        assert_eq!(c.commission_amount, 4_000);
        assert_eq!(c.status, CommissionStatus::Pending);
    }

    #[test]
    fn transitions_are_forward_only() {
        use CommissionStatus::*;
        assert!(Pending.can_transition(Approved));
        assert!(Approved.can_transition(Processing));
        assert!(Processing.can_transition(Paid));
        assert!(Approved.can_transition(Paid));
        assert!(!Paid.can_transition(Pending));
        assert!(!Paid.can_transition(Approved));
        assert!(!Pending.can_transition(Paid));
        assert!(!Processing.can_transition(Approved));
    }
}
