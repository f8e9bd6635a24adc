use common::{AffiliateCode, BankDetails, Course, Database, Transaction};

use crate::config::LedgerPolicy;
use crate::state::AppState;

/// Fresh in-memory state seeded with one course (linked to a discussion
/// group) and one active affiliate code, both owned by lecturer `lect-1`.
pub async fn test_state() -> AppState {
    let db = Database::connect_in_memory()
        .await
        .expect("in-memory database");

    db.save_course(&Course {
        id: "course-1".into(),
        lecturer_id: "lect-1".into(),
        group_id: Some("grp-1".into()),
        total_students: 0,
        total_revenue: 0,
        created_at: None,
    })
    .await
    .expect("seed course");

    db.save_affiliate_code(&AffiliateCode {
        code: "ABC123".into(),
        affiliate_id: "lect-1".into(),
        active: true,
    })
    .await
    .expect("seed affiliate code");

    AppState {
        db,
        policy: LedgerPolicy::default(),
    }
}

pub async fn seed_lessons(state: &AppState, course_id: &str, lesson_ids: &[&str]) {
    for lesson_id in lesson_ids {
        state
            .db
            .save_lesson(lesson_id, course_id)
            .await
            .expect("seed lesson");
    }
}

/// Credits a lecturer's balance by recording a zero-fee sale.
pub async fn fund_lecturer(state: &AppState, lecturer_id: &str, amount: i64) {
    let transaction = Transaction::new(
        "funder".into(),
        "course-1".into(),
        lecturer_id.into(),
        amount,
        0,
        format!("FUND-{}-{}", lecturer_id, amount),
    );
    state
        .db
        .record_transaction(&transaction)
        .await
        .expect("fund lecturer");
}

pub fn test_bank() -> BankDetails {
    BankDetails {
        bank_name: "First Bank".into(),
        account_number: "0123456789".into(),
        account_name: "Ada Obi".into(),
    }
}
