//! Repository for the `payments` table: creation, lazy expiry, cancellation,
//! and settlement.
//!
//! Every state transition is a single compare-and-set `UPDATE ... WHERE
//! status = 'WAITING_PAYMENT'`: whichever operation observes the pending
//! status and commits first owns the outcome, which is exactly the
//! settle/expire tie-break the payment lifecycle requires. Settlement
//! deliberately does NOT check `expires_at` -- an operator confirmation beats
//! a lapsed-but-not-yet-observed window.

use sqlx::PgPool;
use scripta_core::ledger::{next_reset_from, TxnKind};
use scripta_core::payments::PaymentStatus;
use scripta_core::types::{DbId, Timestamp};

use crate::models::payment::{CreatePayment, Payment, PlanGrant};
use crate::repositories::ledger_repo::insert_token_transaction;

/// Column list for payments queries.
const COLUMNS: &str = "id, user_id, plan_type, payment_method, final_amount, status, \
    custom_tokens, custom_grade, created_at, expires_at, settled_at";

/// Provides payment lifecycle operations.
pub struct PaymentRepo;

impl PaymentRepo {
    /// Insert a new payment in `WAITING_PAYMENT`.
    ///
    /// The partial unique index `uq_payments_pending_user` rejects a second
    /// pending payment for the same user; the resulting 23505 surfaces as a
    /// conflict in the API layer. Callers should run
    /// [`Self::expire_due_for_user`] first so a stale overdue payment cannot
    /// block the insert.
    pub async fn create(pool: &PgPool, input: &CreatePayment) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments
                (user_id, plan_type, payment_method, final_amount,
                 custom_tokens, custom_grade, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(input.user_id)
            .bind(&input.plan_type)
            .bind(&input.payment_method)
            .bind(input.final_amount)
            .bind(input.custom_tokens)
            .bind(input.custom_grade.as_deref())
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a payment by primary key, without applying lazy expiry.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE id = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lazily expire one overdue pending payment. Returns `true` if the row
    /// flipped to `EXPIRED`.
    pub async fn expire_due(pool: &PgPool, id: DbId, now: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE payments SET status = $2
             WHERE id = $1 AND status = $3 AND expires_at <= $4",
        )
        .bind(id)
        .bind(PaymentStatus::Expired.as_str())
        .bind(PaymentStatus::WaitingPayment.as_str())
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lazily expire all of a user's overdue pending payments (at most one
    /// exists by invariant). Read paths call this before returning rows.
    pub async fn expire_due_for_user(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE payments SET status = $2
             WHERE user_id = $1 AND status = $3 AND expires_at <= $4",
        )
        .bind(user_id)
        .bind(PaymentStatus::Expired.as_str())
        .bind(PaymentStatus::WaitingPayment.as_str())
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Find a payment by id with lazy expiry applied first.
    pub async fn find_fresh(
        pool: &PgPool,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<Payment>, sqlx::Error> {
        Self::expire_due(pool, id, now).await?;
        Self::find_by_id(pool, id).await
    }

    /// The user's active (pending) payment, if any, with lazy expiry applied.
    pub async fn find_pending_for_user(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Option<Payment>, sqlx::Error> {
        Self::expire_due_for_user(pool, user_id, now).await?;
        let query = format!(
            "SELECT {COLUMNS} FROM payments WHERE user_id = $1 AND status = $2"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(user_id)
            .bind(PaymentStatus::WaitingPayment.as_str())
            .fetch_optional(pool)
            .await
    }

    /// List a user's payments, newest first, with lazy expiry applied.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
        now: Timestamp,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        Self::expire_due_for_user(pool, user_id, now).await?;
        let query = format!(
            "SELECT {COLUMNS} FROM payments
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Cancel a pending payment (owner-initiated). Compare-and-set: returns
    /// the cancelled row, or `None` when the payment was not pending (the
    /// caller distinguishes not-found from invalid-state).
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET status = $2
             WHERE id = $1 AND status = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(PaymentStatus::Cancelled.as_str())
            .bind(PaymentStatus::WaitingPayment.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Settle a pending payment as REJECTED (operator-initiated).
    ///
    /// Compare-and-set on `WAITING_PAYMENT`: an already-terminal payment
    /// returns `None` and nothing is written. No ledger effect.
    pub async fn settle_rejected(
        pool: &PgPool,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments SET status = $2, settled_at = $3
             WHERE id = $1 AND status = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(PaymentStatus::Rejected.as_str())
            .bind(now)
            .bind(PaymentStatus::WaitingPayment.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Settle a pending payment as PAID (operator-initiated).
    ///
    /// The status flip is a compare-and-set on `WAITING_PAYMENT`; a payment
    /// already terminal (settled, cancelled, or lazily expired) returns
    /// `None` and nothing is written -- settlement is exactly-once. The plan
    /// grant is applied to the owner's balance and the `PLAN_UPGRADE` audit
    /// row is written in the same transaction, so the credit cannot outlive
    /// a failed settlement or vice versa.
    pub async fn settle_paid(
        pool: &PgPool,
        id: DbId,
        grant: &PlanGrant,
        now: Timestamp,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE payments SET status = $2, settled_at = $3
             WHERE id = $1 AND status = $4
             RETURNING {COLUMNS}"
        );
        let Some(payment) = sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(PaymentStatus::Paid.as_str())
            .bind(now)
            .bind(PaymentStatus::WaitingPayment.as_str())
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        // Additive top-up: unconsumed tokens survive a mid-period upgrade.
        // UNLIMITED pins the untracked number to zero.
        if grant.unlimited {
            sqlx::query(
                "UPDATE token_balances
                 SET plan_type = $2, tokens_per_month = 0, tokens_remaining = 0,
                     custom_grade = NULL, assignments_used = 0,
                     next_reset_at = $3, updated_at = $4
                 WHERE user_id = $1",
            )
            .bind(payment.user_id)
            .bind(&grant.plan_type)
            .bind(next_reset_from(now))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                "UPDATE token_balances
                 SET plan_type = $2, tokens_per_month = $3,
                     tokens_remaining = tokens_remaining + $4,
                     custom_grade = $5, assignments_used = 0,
                     next_reset_at = $6, updated_at = $7
                 WHERE user_id = $1",
            )
            .bind(payment.user_id)
            .bind(&grant.plan_type)
            .bind(grant.tokens_per_month)
            .bind(grant.tokens_granted)
            .bind(grant.custom_grade.as_deref())
            .bind(next_reset_from(now))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        insert_token_transaction(
            &mut tx,
            payment.user_id,
            TxnKind::PlanUpgrade,
            grant.tokens_granted,
            &grant.description,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(payment))
    }
}
