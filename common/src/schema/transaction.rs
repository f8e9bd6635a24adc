use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A confirmed sale and its revenue split. Immutable once written; the fee
/// rate is snapshotted so later changes to the global rate never alter
/// history.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub buyer_id: String,
    pub course_id: String,
    pub lecturer_id: String,
    pub amount: i64,
    pub platform_fee: i64,
    pub lecturer_earning: i64,
    pub fee_rate_bps: i64,
    pub external_reference: String,
    pub created_at: Option<NaiveDateTime>,
}

impl Transaction {
    /// Splits `amount` at `fee_rate_bps`. The lecturer earning is the
    /// remainder after the fee, so the two parts always sum back to the
    /// amount in integer minor units.
    pub fn new(
        buyer_id: String,
        course_id: String,
        lecturer_id: String,
        amount: i64,
        fee_rate_bps: i64,
        external_reference: String,
    ) -> Self {
        let platform_fee = amount * fee_rate_bps / 10_000;
        let lecturer_earning = amount - platform_fee;
        Transaction {
            id: 0, // set by DB
            buyer_id,
            course_id,
            lecturer_id,
            amount,
            platform_fee,
            lecturer_earning,
            fee_rate_bps,
            external_reference,
            created_at: None,
        }
    }
}

/// Earnings summary for a lecturer dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LecturerEarnings {
    pub total: i64,
    pub this_month: i64,
    pub pending: i64,
    pub paid: i64,
    pub transactions: Vec<Transaction>,
}
