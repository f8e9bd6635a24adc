use common::{
    Enrollment, EnrollmentProgress, LedgerError, LedgerResult, derive_progress,
};

use crate::state::AppState;

/// Attempts before a progress write gives up with `Conflict`.
const MAX_PROGRESS_RETRIES: u32 = 3;

/// Creates the enrollment for (student, course), or returns the existing one
/// unchanged. Only a first-time enrollment bumps the course's student count.
pub async fn enroll(
    state: &AppState,
    student_id: &str,
    course_id: &str,
    lecturer_id: &str,
) -> LedgerResult<Enrollment> {
    if student_id.trim().is_empty() {
        return Err(LedgerError::MissingField("student_id"));
    }
    if course_id.trim().is_empty() {
        return Err(LedgerError::MissingField("course_id"));
    }
    if lecturer_id.trim().is_empty() {
        return Err(LedgerError::MissingField("lecturer_id"));
    }

    let (enrollment, created) = state.db.enroll(student_id, course_id, lecturer_id).await?;
    if created {
        log::info!(
            "Enrolled student {} in course {} (enrollment id={})",
            student_id,
            course_id,
            enrollment.id
        );
    }
    Ok(enrollment)
}

/// Marks a lesson complete and returns the updated percentage. Re-completing
/// an already-recorded lesson is a no-op. The progress write is guarded by
/// the enrollment's version token and retried a bounded number of times, so
/// two concurrent completions never lose an update.
pub async fn complete_lesson(
    state: &AppState,
    enrollment_id: i64,
    lesson_id: &str,
) -> LedgerResult<i64> {
    if lesson_id.trim().is_empty() {
        return Err(LedgerError::MissingField("lesson_id"));
    }

    let enrollment = state
        .db
        .get_enrollment(enrollment_id)
        .await?
        .ok_or(LedgerError::NotFound("enrollment"))?;

    let inserted = state
        .db
        .insert_completed_lesson(enrollment_id, lesson_id)
        .await?;
    if !inserted {
        return Ok(enrollment.progress);
    }

    recompute_progress(state, enrollment_id, false).await
}

/// Re-derives the percentage from the current completed set and the course's
/// current lesson total, writing only when the stored value is stale. Covers
/// lessons added or removed after completions were recorded.
pub async fn sync_progress(state: &AppState, enrollment_id: i64) -> LedgerResult<i64> {
    recompute_progress(state, enrollment_id, true).await
}

async fn recompute_progress(
    state: &AppState,
    enrollment_id: i64,
    skip_if_unchanged: bool,
) -> LedgerResult<i64> {
    for _ in 0..MAX_PROGRESS_RETRIES {
        let enrollment = state
            .db
            .get_enrollment(enrollment_id)
            .await?
            .ok_or(LedgerError::NotFound("enrollment"))?;

        let completed = state.db.count_completed_lessons(enrollment_id).await?;
        let total = state.db.count_course_lessons(&enrollment.course_id).await?;
        let progress = derive_progress(completed, total);

        if skip_if_unchanged && progress == enrollment.progress {
            return Ok(progress);
        }

        let written = state
            .db
            .update_enrollment_progress(enrollment_id, progress, enrollment.version)
            .await?;
        if written {
            return Ok(progress);
        }
        log::warn!(
            "Progress write conflict on enrollment {}, retrying",
            enrollment_id
        );
    }
    Err(LedgerError::Conflict)
}

/// Progress view for the playback UI.
pub async fn progress(state: &AppState, enrollment_id: i64) -> LedgerResult<EnrollmentProgress> {
    let enrollment = state
        .db
        .get_enrollment(enrollment_id)
        .await?
        .ok_or(LedgerError::NotFound("enrollment"))?;
    let completed_lessons = state.db.get_completed_lessons(enrollment_id).await?;
    Ok(EnrollmentProgress {
        progress: enrollment.progress,
        completed_lessons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_lessons, test_state};

    #[tokio::test]
    async fn enroll_is_idempotent_per_student_and_course() {
        let state = test_state().await;
        let first = enroll(&state, "student-1", "course-1", "lect-1").await.unwrap();
        let second = enroll(&state, "student-1", "course-1", "lect-1").await.unwrap();
        assert_eq!(first.id, second.id);

        let course = state.db.get_course("course-1").await.unwrap().unwrap();
        assert_eq!(course.total_students, 1);

        enroll(&state, "student-2", "course-1", "lect-1").await.unwrap();
        let course = state.db.get_course("course-1").await.unwrap().unwrap();
        assert_eq!(course.total_students, 2);
    }

    #[tokio::test]
    async fn completing_three_of_five_lessons_is_sixty_percent() {
        let state = test_state().await;
        seed_lessons(&state, "course-1", &["A", "B", "C", "D", "E"]).await;
        let enrollment = enroll(&state, "student-1", "course-1", "lect-1").await.unwrap();

        assert_eq!(complete_lesson(&state, enrollment.id, "A").await.unwrap(), 20);
        assert_eq!(complete_lesson(&state, enrollment.id, "B").await.unwrap(), 40);
        assert_eq!(complete_lesson(&state, enrollment.id, "C").await.unwrap(), 60);

        // Re-completing a lesson changes nothing.
        assert_eq!(complete_lesson(&state, enrollment.id, "A").await.unwrap(), 60);
        let view = progress(&state, enrollment.id).await.unwrap();
        assert_eq!(view.progress, 60);
        assert_eq!(view.completed_lessons.len(), 3);
    }

    #[tokio::test]
    async fn progress_tolerates_a_course_without_lessons() {
        let state = test_state().await;
        let enrollment = enroll(&state, "student-1", "course-1", "lect-1").await.unwrap();
        assert_eq!(complete_lesson(&state, enrollment.id, "ghost").await.unwrap(), 0);
        assert_eq!(sync_progress(&state, enrollment.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sync_progress_follows_lesson_changes() {
        let state = test_state().await;
        seed_lessons(&state, "course-1", &["A", "B"]).await;
        let enrollment = enroll(&state, "student-1", "course-1", "lect-1").await.unwrap();
        assert_eq!(complete_lesson(&state, enrollment.id, "A").await.unwrap(), 50);

        // Two more lessons appear after the fact.
        seed_lessons(&state, "course-1", &["C", "D"]).await;
        assert_eq!(sync_progress(&state, enrollment.id).await.unwrap(), 25);

        let stored = state.db.get_enrollment(enrollment.id).await.unwrap().unwrap();
        assert_eq!(stored.progress, 25);
    }

    #[tokio::test]
    async fn progress_stays_within_bounds() {
        let state = test_state().await;
        seed_lessons(&state, "course-1", &["A"]).await;
        let enrollment = enroll(&state, "student-1", "course-1", "lect-1").await.unwrap();
        let pct = complete_lesson(&state, enrollment.id, "A").await.unwrap();
        assert_eq!(pct, 100);
        // A completion recorded for a since-removed lesson cannot push past 100.
        let pct = complete_lesson(&state, enrollment.id, "Z").await.unwrap();
        assert_eq!(pct, 100);
    }

    #[tokio::test]
    async fn a_lost_version_race_is_retried_and_recovers() {
        let state = test_state().await;
        seed_lessons(&state, "course-1", &["A", "B"]).await;
        let enrollment = enroll(&state, "student-1", "course-1", "lect-1").await.unwrap();

        // Swallow exactly one progress write so the guarded update reports a
        // conflict, as if a concurrent completion had won the version race.
        sqlx::query("CREATE TABLE progress_write_gate (blocked INTEGER NOT NULL)")
            .execute(&state.db.pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO progress_write_gate (blocked) VALUES (1)")
            .execute(&state.db.pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            CREATE TRIGGER swallow_one_progress_write
            BEFORE UPDATE OF progress ON enrollments
            WHEN (SELECT blocked FROM progress_write_gate) > 0
            BEGIN
                UPDATE progress_write_gate SET blocked = blocked - 1;
                SELECT RAISE(IGNORE);
            END
            "#,
        )
        .execute(&state.db.pool)
        .await
        .unwrap();

        assert_eq!(complete_lesson(&state, enrollment.id, "A").await.unwrap(), 50);

        // The first attempt really was swallowed, so the 50 came from a retry.
        let blocked: i64 = sqlx::query_scalar("SELECT blocked FROM progress_write_gate")
            .fetch_one(&state.db.pool)
            .await
            .unwrap();
        assert_eq!(blocked, 0);
        let stored = state.db.get_enrollment(enrollment.id).await.unwrap().unwrap();
        assert_eq!(stored.progress, 50);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_as_a_conflict() {
        let state = test_state().await;
        seed_lessons(&state, "course-1", &["A", "B"]).await;
        let enrollment = enroll(&state, "student-1", "course-1", "lect-1").await.unwrap();

        // Every progress write loses its version race.
        sqlx::query(
            r#"
            CREATE TRIGGER swallow_progress_writes
            BEFORE UPDATE OF progress ON enrollments
            BEGIN
                SELECT RAISE(IGNORE);
            END
            "#,
        )
        .execute(&state.db.pool)
        .await
        .unwrap();

        let err = complete_lesson(&state, enrollment.id, "A").await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict));

        // The completion stays recorded; the percentage is recomputable later.
        let stored = state.db.get_enrollment(enrollment.id).await.unwrap().unwrap();
        assert_eq!(stored.progress, 0);
        assert_eq!(state.db.count_completed_lessons(enrollment.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn enroll_requires_every_party() {
        let state = test_state().await;
        assert!(matches!(
            enroll(&state, " ", "course-1", "lect-1").await,
            Err(LedgerError::MissingField("student_id"))
        ));
        assert!(matches!(
            enroll(&state, "student-1", "", "lect-1").await,
            Err(LedgerError::MissingField("course_id"))
        ));
        assert!(matches!(
            enroll(&state, "student-1", "course-1", "").await,
            Err(LedgerError::MissingField("lecturer_id"))
        ));
    }

    #[tokio::test]
    async fn unknown_enrollment_is_reported() {
        let state = test_state().await;
        assert!(matches!(
            complete_lesson(&state, 999, "A").await,
            Err(LedgerError::NotFound("enrollment"))
        ));
    }
}
