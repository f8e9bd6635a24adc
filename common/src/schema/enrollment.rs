use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One enrollment per (student, course). The completed-lesson set lives in
/// the `enrollment_lessons` table; `progress` is re-derivable from it at any
/// time. `version` is the optimistic token guarding progress writes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: String,
    pub course_id: String,
    pub lecturer_id: String,
    pub progress: i64,
    pub version: i64,
    pub enrolled_at: Option<NaiveDateTime>,
    pub last_accessed_at: Option<NaiveDateTime>,
}

/// Progress view returned to the playback UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentProgress {
    pub progress: i64,
    pub completed_lessons: Vec<String>,
}

/// `round(100 * completed / total)`, clamped by construction to [0, 100].
/// A course with no lessons reports zero progress.
pub fn derive_progress(completed: i64, total_lessons: i64) -> i64 {
    if total_lessons <= 0 {
        return 0;
    }
    let completed = completed.min(total_lessons);
    (100 * completed + total_lessons / 2) / total_lessons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_formula_rounds_and_stays_in_bounds() {
        assert_eq!(derive_progress(0, 5), 0);
        assert_eq!(derive_progress(3, 5), 60);
        assert_eq!(derive_progress(5, 5), 100);
        assert_eq!(derive_progress(1, 3), 33);
        assert_eq!(derive_progress(2, 3), 67);
        assert_eq!(derive_progress(3, 8), 38);
        // Completions beyond the current total clamp at 100.
        assert_eq!(derive_progress(7, 5), 100);
    }

    #[test]
    fn empty_courses_report_zero() {
        assert_eq!(derive_progress(0, 0), 0);
        assert_eq!(derive_progress(4, 0), 0);
    }
}
