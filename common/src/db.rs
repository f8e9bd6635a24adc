use std::str::FromStr;

use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::error::{LedgerError, LedgerResult};
use crate::schema::{
    AffiliateCode, AffiliatePayout, Commission, CommissionStatus, CommissionSummary, Course,
    Enrollment, LecturerAccount, Transaction, Withdrawal, WithdrawalStatus,
};

pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Failed to create SQLite connect options")?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(Self { pool })
    }

    /// Private in-memory database, single connection so the data outlives
    /// individual acquisitions. Used by tests and local experiments.
    pub async fn connect_in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Failed to create SQLite connect options")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(Self { pool })
    }

    // ------------------------------------------------------------------
    // Courses and lessons
    // ------------------------------------------------------------------

    pub async fn save_course(&self, course: &Course) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO courses (id, lecturer_id, group_id)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&course.id)
        .bind(&course.lecturer_id)
        .bind(&course.group_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_course(&self, course_id: &str) -> LedgerResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(course)
    }

    pub async fn save_lesson(&self, lesson_id: &str, course_id: &str) -> LedgerResult<()> {
        sqlx::query("INSERT OR IGNORE INTO lessons (id, course_id) VALUES (?, ?)")
            .bind(lesson_id)
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_course_lessons(&self, course_id: &str) -> LedgerResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE course_id = ?")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    // ------------------------------------------------------------------
    // Transactions and lecturer aggregates
    // ------------------------------------------------------------------

    /// Persists a sale and applies the aggregate increments in one database
    /// transaction. Idempotent on `external_reference`: a replay returns the
    /// already-recorded row and writes nothing.
    pub async fn record_transaction(
        &self,
        transaction: &Transaction,
    ) -> LedgerResult<Transaction> {
        if let Some(existing) = self
            .get_transaction_by_reference(&transaction.external_reference)
            .await?
        {
            return Ok(existing);
        }

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO transactions (
                buyer_id, course_id, lecturer_id, amount, platform_fee,
                lecturer_earning, fee_rate_bps, external_reference
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.buyer_id)
        .bind(&transaction.course_id)
        .bind(&transaction.lecturer_id)
        .bind(transaction.amount)
        .bind(transaction.platform_fee)
        .bind(transaction.lecturer_earning)
        .bind(transaction.fee_rate_bps)
        .bind(&transaction.external_reference)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            tx.rollback().await?;
            // Lost a race against a concurrent replay of the same reference.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return self
                        .get_transaction_by_reference(&transaction.external_reference)
                        .await?
                        .ok_or(LedgerError::NotFound("transaction"));
                }
            }
            return Err(e.into());
        }

        sqlx::query("INSERT OR IGNORE INTO lecturer_accounts (lecturer_id) VALUES (?)")
            .bind(&transaction.lecturer_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            UPDATE lecturer_accounts
            SET total_earnings = total_earnings + ?,
                pending_withdrawal = pending_withdrawal + ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE lecturer_id = ?
            "#,
        )
        .bind(transaction.lecturer_earning)
        .bind(transaction.lecturer_earning)
        .bind(&transaction.lecturer_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE courses SET total_revenue = total_revenue + ? WHERE id = ?")
            .bind(transaction.amount)
            .bind(&transaction.course_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_transaction_by_reference(&transaction.external_reference)
            .await?
            .ok_or(LedgerError::NotFound("transaction"))
    }

    pub async fn get_transaction_by_reference(
        &self,
        external_reference: &str,
    ) -> LedgerResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE external_reference = ?",
        )
        .bind(external_reference)
        .fetch_optional(&self.pool)
        .await?;
        Ok(transaction)
    }

    pub async fn get_transactions_for_lecturer(
        &self,
        lecturer_id: &str,
    ) -> LedgerResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE lecturer_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(lecturer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(transactions)
    }

    pub async fn sum_lecturer_earnings_between(
        &self,
        lecturer_id: &str,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> LedgerResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(lecturer_earning) FROM transactions
            WHERE lecturer_id = ? AND created_at >= ? AND created_at < ?
            "#,
        )
        .bind(lecturer_id)
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(0))
    }

    pub async fn get_lecturer_account(
        &self,
        lecturer_id: &str,
    ) -> LedgerResult<Option<LecturerAccount>> {
        let account = sqlx::query_as::<_, LecturerAccount>(
            "SELECT * FROM lecturer_accounts WHERE lecturer_id = ?",
        )
        .bind(lecturer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    pub async fn list_lecturer_ids(&self) -> LedgerResult<Vec<String>> {
        let rows = sqlx::query("SELECT lecturer_id FROM lecturer_accounts")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get("lecturer_id")).collect())
    }

    /// Recomputes `total_earnings` and `pending_withdrawal` by folding the
    /// transaction and withdrawal history, rewriting the counters when they
    /// have drifted. Returns `(stored, derived)` available balances.
    pub async fn reconcile_lecturer(&self, lecturer_id: &str) -> LedgerResult<(i64, i64)> {
        let mut tx = self.pool.begin().await?;

        let earned: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(lecturer_earning) FROM transactions WHERE lecturer_id = ?",
        )
        .bind(lecturer_id)
        .fetch_one(&mut *tx)
        .await?;
        let earned = earned.unwrap_or(0);

        // Failed withdrawals release their reservation, so only the rest
        // count against the balance.
        let reserved: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM withdrawals WHERE lecturer_id = ? AND status != 'failed'",
        )
        .bind(lecturer_id)
        .fetch_one(&mut *tx)
        .await?;
        let reserved = reserved.unwrap_or(0);

        let derived = earned - reserved;

        let stored: Option<i64> = sqlx::query_scalar(
            "SELECT pending_withdrawal FROM lecturer_accounts WHERE lecturer_id = ?",
        )
        .bind(lecturer_id)
        .fetch_optional(&mut *tx)
        .await?;
        let stored = stored.unwrap_or(0);

        if stored != derived {
            log::info!(
                "Rewriting drifted balance for lecturer {}: stored={} derived={}",
                lecturer_id,
                stored,
                derived
            );
            sqlx::query("INSERT OR IGNORE INTO lecturer_accounts (lecturer_id) VALUES (?)")
                .bind(lecturer_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                r#"
                UPDATE lecturer_accounts
                SET total_earnings = ?, pending_withdrawal = ?, updated_at = CURRENT_TIMESTAMP
                WHERE lecturer_id = ?
                "#,
            )
            .bind(earned)
            .bind(derived)
            .bind(lecturer_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok((stored, derived))
    }

    // ------------------------------------------------------------------
    // Enrollments
    // ------------------------------------------------------------------

    /// Creates the enrollment if the (student, course) pair is new, otherwise
    /// returns the existing row untouched. `total_students` moves only on a
    /// fresh insert. The bool reports whether a row was created.
    pub async fn enroll(
        &self,
        student_id: &str,
        course_id: &str,
        lecturer_id: &str,
    ) -> LedgerResult<(Enrollment, bool)> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO enrollments (student_id, course_id, lecturer_id)
            VALUES (?, ?, ?)
            ON CONFLICT (student_id, course_id) DO NOTHING
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .bind(lecturer_id)
        .execute(&mut *tx)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            sqlx::query("UPDATE courses SET total_students = total_students + 1 WHERE id = ?")
                .bind(course_id)
                .execute(&mut *tx)
                .await?;
        }

        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE student_id = ? AND course_id = ?",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((enrollment, created))
    }

    pub async fn get_enrollment(&self, enrollment_id: i64) -> LedgerResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = ?")
            .bind(enrollment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(enrollment)
    }

    /// Adds `lesson_id` to the completed set. Returns false when the lesson
    /// was already recorded, which callers treat as a no-op.
    pub async fn insert_completed_lesson(
        &self,
        enrollment_id: i64,
        lesson_id: &str,
    ) -> LedgerResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO enrollment_lessons (enrollment_id, lesson_id) VALUES (?, ?)",
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_completed_lessons(&self, enrollment_id: i64) -> LedgerResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enrollment_lessons WHERE enrollment_id = ?")
                .bind(enrollment_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn get_completed_lessons(&self, enrollment_id: i64) -> LedgerResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT lesson_id FROM enrollment_lessons
            WHERE enrollment_id = ?
            ORDER BY completed_at, lesson_id
            "#,
        )
        .bind(enrollment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("lesson_id")).collect())
    }

    /// Optimistic write: succeeds only when `expected_version` still matches,
    /// bumping the version with the progress. Returns false on a lost race so
    /// the caller can reload and retry.
    pub async fn update_enrollment_progress(
        &self,
        enrollment_id: i64,
        progress: i64,
        expected_version: i64,
    ) -> LedgerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE enrollments
            SET progress = ?, version = version + 1, last_accessed_at = CURRENT_TIMESTAMP
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(progress)
        .bind(enrollment_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Withdrawals
    // ------------------------------------------------------------------

    /// Reserves the amount and creates the pending withdrawal in one database
    /// transaction. The guarded decrement leaves nothing persisted when the
    /// balance is too small. Idempotent on `reference`: a replay returns the
    /// already-created row without reserving again.
    pub async fn request_withdrawal(&self, withdrawal: &Withdrawal) -> LedgerResult<Withdrawal> {
        if let Some(existing) = self.get_withdrawal_by_reference(&withdrawal.reference).await? {
            return Ok(existing);
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE lecturer_accounts
            SET pending_withdrawal = pending_withdrawal - ?, updated_at = CURRENT_TIMESTAMP
            WHERE lecturer_id = ? AND pending_withdrawal >= ?
            "#,
        )
        .bind(withdrawal.amount)
        .bind(&withdrawal.lecturer_id)
        .bind(withdrawal.amount)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            let available = self
                .get_lecturer_account(&withdrawal.lecturer_id)
                .await?
                .map(|a| a.pending_withdrawal)
                .unwrap_or(0);
            return Err(LedgerError::InsufficientBalance {
                requested: withdrawal.amount,
                available,
            });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO withdrawals (
                lecturer_id, amount, bank_name, account_number, account_name,
                status, reference
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&withdrawal.lecturer_id)
        .bind(withdrawal.amount)
        .bind(&withdrawal.bank_name)
        .bind(&withdrawal.account_number)
        .bind(&withdrawal.account_name)
        .bind(withdrawal.status)
        .bind(&withdrawal.reference)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            tx.rollback().await?;
            // Lost a race against a concurrent retry of the same reference.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return self
                        .get_withdrawal_by_reference(&withdrawal.reference)
                        .await?
                        .ok_or(LedgerError::NotFound("withdrawal"));
                }
            }
            return Err(e.into());
        }

        tx.commit().await?;

        self.get_withdrawal_by_reference(&withdrawal.reference)
            .await?
            .ok_or(LedgerError::NotFound("withdrawal"))
    }

    pub async fn get_withdrawal(&self, withdrawal_id: i64) -> LedgerResult<Option<Withdrawal>> {
        let withdrawal = sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = ?")
            .bind(withdrawal_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(withdrawal)
    }

    pub async fn get_withdrawal_by_reference(
        &self,
        reference: &str,
    ) -> LedgerResult<Option<Withdrawal>> {
        let withdrawal =
            sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE reference = ?")
                .bind(reference)
                .fetch_optional(&self.pool)
                .await?;
        Ok(withdrawal)
    }

    pub async fn get_withdrawals_for_lecturer(
        &self,
        lecturer_id: &str,
    ) -> LedgerResult<Vec<Withdrawal>> {
        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT * FROM withdrawals
            WHERE lecturer_id = ?
            ORDER BY requested_at DESC, id DESC
            "#,
        )
        .bind(lecturer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(withdrawals)
    }

    pub async fn sum_withdrawals_by_status(
        &self,
        lecturer_id: &str,
        status: WithdrawalStatus,
    ) -> LedgerResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM withdrawals WHERE lecturer_id = ? AND status = ?",
        )
        .bind(lecturer_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(0))
    }

    /// Applies a validated status transition. A move to `failed` credits the
    /// reserved amount back to the lecturer balance in the same database
    /// transaction, never as a separate write.
    pub async fn transition_withdrawal(
        &self,
        withdrawal_id: i64,
        to: WithdrawalStatus,
    ) -> LedgerResult<Withdrawal> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = ?")
            .bind(withdrawal_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::NotFound("withdrawal"))?;

        if !current.status.can_transition(to) {
            tx.rollback().await?;
            return Err(LedgerError::IllegalTransition {
                from: current.status.to_string(),
                to: to.to_string(),
            });
        }

        let processed_at = if to.is_terminal() {
            Some(Utc::now().naive_utc())
        } else {
            None
        };
        // Guarded on the observed status so a concurrent writer cannot apply
        // the same transition (and its refund) twice.
        let result = sqlx::query(
            "UPDATE withdrawals SET status = ?, processed_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(processed_at)
        .bind(withdrawal_id)
        .bind(current.status)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(LedgerError::Conflict);
        }

        if to == WithdrawalStatus::Failed {
            sqlx::query(
                r#"
                UPDATE lecturer_accounts
                SET pending_withdrawal = pending_withdrawal + ?, updated_at = CURRENT_TIMESTAMP
                WHERE lecturer_id = ?
                "#,
            )
            .bind(current.amount)
            .bind(&current.lecturer_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_withdrawal(withdrawal_id)
            .await?
            .ok_or(LedgerError::NotFound("withdrawal"))
    }

    // ------------------------------------------------------------------
    // Affiliate codes, commissions, payouts
    // ------------------------------------------------------------------

    pub async fn save_affiliate_code(&self, code: &AffiliateCode) -> LedgerResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO affiliate_codes (code, affiliate_id, active) VALUES (?, ?, ?)",
        )
        .bind(&code.code)
        .bind(&code.affiliate_id)
        .bind(code.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_affiliate_code(&self, code: &str) -> LedgerResult<Option<AffiliateCode>> {
        let row = sqlx::query_as::<_, AffiliateCode>(
            "SELECT * FROM affiliate_codes WHERE code = ? AND active = 1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn save_commission(&self, commission: &Commission) -> LedgerResult<Commission> {
        let result = sqlx::query(
            r#"
            INSERT INTO commissions (
                affiliate_id, affiliate_code, course_id, course_price,
                commission_rate_bps, commission_amount, student_id, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&commission.affiliate_id)
        .bind(&commission.affiliate_code)
        .bind(&commission.course_id)
        .bind(commission.course_price)
        .bind(commission.commission_rate_bps)
        .bind(commission.commission_amount)
        .bind(&commission.student_id)
        .bind(commission.status)
        .execute(&self.pool)
        .await?;

        self.get_commission(result.last_insert_rowid())
            .await?
            .ok_or(LedgerError::NotFound("commission"))
    }

    pub async fn get_commission(&self, commission_id: i64) -> LedgerResult<Option<Commission>> {
        let commission = sqlx::query_as::<_, Commission>("SELECT * FROM commissions WHERE id = ?")
            .bind(commission_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(commission)
    }

    pub async fn transition_commission(
        &self,
        commission_id: i64,
        to: CommissionStatus,
    ) -> LedgerResult<Commission> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Commission>("SELECT * FROM commissions WHERE id = ?")
            .bind(commission_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::NotFound("commission"))?;

        if !current.status.can_transition(to) {
            tx.rollback().await?;
            return Err(LedgerError::IllegalTransition {
                from: current.status.to_string(),
                to: to.to_string(),
            });
        }

        sqlx::query("UPDATE commissions SET status = ? WHERE id = ?")
            .bind(to)
            .bind(commission_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_commission(commission_id)
            .await?
            .ok_or(LedgerError::NotFound("commission"))
    }

    pub async fn approved_commission_total(&self, affiliate_id: &str) -> LedgerResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(commission_amount) FROM commissions WHERE affiliate_id = ? AND status = 'approved'",
        )
        .bind(affiliate_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(0))
    }

    /// Creates the payout and moves the affiliate's approved commissions to
    /// `processing`, linked to it, in one database transaction.
    pub async fn request_affiliate_payout(
        &self,
        payout: &AffiliatePayout,
    ) -> LedgerResult<AffiliatePayout> {
        let mut tx = self.pool.begin().await?;

        let approved: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(commission_amount) FROM commissions WHERE affiliate_id = ? AND status = 'approved'",
        )
        .bind(&payout.affiliate_id)
        .fetch_one(&mut *tx)
        .await?;
        let approved = approved.unwrap_or(0);

        if payout.amount > approved {
            tx.rollback().await?;
            return Err(LedgerError::InsufficientBalance {
                requested: payout.amount,
                available: approved,
            });
        }

        let result = sqlx::query(
            r#"
            INSERT INTO affiliate_payouts (
                affiliate_id, amount, bank_name, account_number, account_name, status
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payout.affiliate_id)
        .bind(payout.amount)
        .bind(&payout.bank_name)
        .bind(&payout.account_number)
        .bind(&payout.account_name)
        .bind(payout.status)
        .execute(&mut *tx)
        .await?;
        let payout_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            UPDATE commissions
            SET status = 'processing', payout_id = ?
            WHERE affiliate_id = ? AND status = 'approved'
            "#,
        )
        .bind(payout_id)
        .bind(&payout.affiliate_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let saved =
            sqlx::query_as::<_, AffiliatePayout>("SELECT * FROM affiliate_payouts WHERE id = ?")
                .bind(payout_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(saved)
    }

    /// Per-status counts and amounts, recomputed from the commission rows on
    /// every call.
    pub async fn commission_summary(&self, affiliate_id: &str) -> LedgerResult<CommissionSummary> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS n, SUM(commission_amount) AS total
            FROM commissions
            WHERE affiliate_id = ?
            GROUP BY status
            "#,
        )
        .bind(affiliate_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = CommissionSummary::default();
        for row in rows {
            let status: String = row.get("status");
            let count: i64 = row.get("n");
            let total: i64 = row.get::<Option<i64>, _>("total").unwrap_or(0);
            match status.as_str() {
                "pending" => {
                    summary.pending_count = count;
                    summary.pending_amount = total;
                }
                "approved" => {
                    summary.approved_count = count;
                    summary.approved_amount = total;
                }
                "processing" => {
                    summary.processing_count = count;
                    summary.processing_amount = total;
                }
                "paid" => {
                    summary.paid_count = count;
                    summary.paid_amount = total;
                }
                _ => {}
            }
        }
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Discussion groups
    // ------------------------------------------------------------------

    pub async fn join_group(&self, group_id: &str, member_id: &str) -> LedgerResult<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO group_members (group_id, member_id) VALUES (?, ?)")
                .bind(group_id)
                .bind(member_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
