use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Aggregate counters for a course. `total_revenue` moves with transaction
/// creation, `total_students` with first-time enrollment. `group_id` points
/// at the linked discussion group, when the course has one.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: String,
    pub lecturer_id: String,
    pub group_id: Option<String>,
    pub total_students: i64,
    pub total_revenue: i64,
    pub created_at: Option<NaiveDateTime>,
}

/// Per-lecturer aggregate. `pending_withdrawal` is the withdrawable balance:
/// credited by each sale's lecturer earning, debited when a withdrawal is
/// requested, credited back if that withdrawal fails. Derivable in principle
/// from transaction minus withdrawal history; the reconciliation pass
/// recomputes it to catch drift.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LecturerAccount {
    pub lecturer_id: String,
    pub total_earnings: i64,
    pub pending_withdrawal: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}
