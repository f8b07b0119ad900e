//! Repository for the token ledger: balance row + append-only audit rows.
//!
//! Every mutation follows the same discipline: open a transaction, lock the
//! user's balance row with `SELECT ... FOR UPDATE` (per-user serialization),
//! check invariants against the locked row, apply the balance change and the
//! audit insert together, commit. Two concurrent debits therefore cannot
//! both read the same stale balance, and no audit row can exist without its
//! balance change (or vice versa).

use sqlx::{PgConnection, PgPool};
use scripta_core::gate;
use scripta_core::ledger::{is_reset_due, next_reset_from, reset_net_change, TxnKind};
use scripta_core::plans::{Grade, PlanCatalog, PlanType};
use scripta_core::types::{DbId, Timestamp};

use crate::models::token_balance::{ConsumeOutcome, DebitOutcome, ResetOutcome, TokenBalance};
use crate::models::token_transaction::TokenTransaction;

/// Column list for token_balances queries.
const BALANCE_COLUMNS: &str = "user_id, tokens_remaining, tokens_per_month, plan_type, \
    custom_grade, assignments_used, next_reset_at, updated_at";

/// Column list for token_transactions queries.
const TXN_COLUMNS: &str = "id, user_id, kind, amount, description, created_at";

/// Insert one audit row. Callers run this inside the transaction that holds
/// the balance row lock.
pub(crate) async fn insert_token_transaction(
    conn: &mut PgConnection,
    user_id: DbId,
    kind: TxnKind,
    amount: i64,
    description: &str,
) -> Result<TokenTransaction, sqlx::Error> {
    let query = format!(
        "INSERT INTO token_transactions (user_id, kind, amount, description)
         VALUES ($1, $2, $3, $4)
         RETURNING {TXN_COLUMNS}"
    );
    sqlx::query_as::<_, TokenTransaction>(&query)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(amount)
        .bind(description)
        .fetch_one(conn)
        .await
}

/// Lock and fetch a balance row for update.
async fn lock_balance(
    conn: &mut PgConnection,
    user_id: DbId,
) -> Result<Option<TokenBalance>, sqlx::Error> {
    let query = format!(
        "SELECT {BALANCE_COLUMNS} FROM token_balances WHERE user_id = $1 FOR UPDATE"
    );
    sqlx::query_as::<_, TokenBalance>(&query)
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

/// Apply the monthly reset to a locked balance if it is due.
///
/// Assignment semantics: `tokens_remaining` is set to the quota (carryover
/// forfeited), the assignment counter clears, and `next_reset_at` advances
/// one period from `now`. Idempotent per period: a second call sees the
/// advanced `next_reset_at` and does nothing.
async fn apply_reset_locked(
    conn: &mut PgConnection,
    balance: &TokenBalance,
    now: Timestamp,
) -> Result<Option<(TokenBalance, TokenTransaction)>, sqlx::Error> {
    if !is_reset_due(balance.next_reset_at, now) {
        return Ok(None);
    }

    let query = format!(
        "UPDATE token_balances
         SET tokens_remaining = tokens_per_month,
             assignments_used = 0,
             next_reset_at = $2,
             updated_at = $3
         WHERE user_id = $1
         RETURNING {BALANCE_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, TokenBalance>(&query)
        .bind(balance.user_id)
        .bind(next_reset_from(now))
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    let net = reset_net_change(balance.tokens_remaining, balance.tokens_per_month);
    let txn = insert_token_transaction(
        conn,
        balance.user_id,
        TxnKind::MonthlyReset,
        net,
        "Monthly token reset",
    )
    .await?;

    Ok(Some((updated, txn)))
}

/// Translate a corrupt stored enum value into a decode error.
fn decode_err(e: scripta_core::error::CoreError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

/// Provides all balance reads and ledger mutations.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Plain balance read, no lazy reset. Prefer [`Self::balance_fresh`] on
    /// user-facing paths.
    pub async fn balance(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<TokenBalance>, sqlx::Error> {
        let query = format!("SELECT {BALANCE_COLUMNS} FROM token_balances WHERE user_id = $1");
        sqlx::query_as::<_, TokenBalance>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Balance read that first applies a due monthly reset.
    pub async fn balance_fresh(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Option<TokenBalance>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(balance) = lock_balance(&mut tx, user_id).await? else {
            return Ok(None);
        };
        let balance = match apply_reset_locked(&mut tx, &balance, now).await? {
            Some((updated, _)) => updated,
            None => balance,
        };

        tx.commit().await?;
        Ok(Some(balance))
    }

    /// Apply the monthly reset if due. Exposed for the operator endpoint;
    /// read paths go through [`Self::balance_fresh`] and [`Self::consume`].
    pub async fn reset_if_due(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<ResetOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(balance) = lock_balance(&mut tx, user_id).await? else {
            return Ok(ResetOutcome::UserNotFound);
        };
        let outcome = match apply_reset_locked(&mut tx, &balance, now).await? {
            Some((_, txn)) => ResetOutcome::Applied(txn),
            None => ResetOutcome::NotDue,
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Credit `amount` tokens. Always succeeds for an existing user.
    ///
    /// UNLIMITED balances are not numerically tracked: the stored number is
    /// left untouched, but the audit row is still written.
    pub async fn credit(
        pool: &PgPool,
        user_id: DbId,
        amount: i64,
        kind: TxnKind,
        description: &str,
        now: Timestamp,
    ) -> Result<Option<TokenTransaction>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(balance) = lock_balance(&mut tx, user_id).await? else {
            return Ok(None);
        };
        let plan = PlanType::parse(&balance.plan_type).map_err(decode_err)?;

        if !plan.is_unlimited() {
            sqlx::query(
                "UPDATE token_balances
                 SET tokens_remaining = tokens_remaining + $2, updated_at = $3
                 WHERE user_id = $1",
            )
            .bind(user_id)
            .bind(amount)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let txn = insert_token_transaction(&mut tx, user_id, kind, amount, description).await?;

        tx.commit().await?;
        Ok(Some(txn))
    }

    /// Debit `amount` tokens, failing when the balance is too low.
    ///
    /// UNLIMITED balances skip the check and the balance mutation but still
    /// produce the audit row.
    pub async fn debit(
        pool: &PgPool,
        user_id: DbId,
        amount: i64,
        kind: TxnKind,
        description: &str,
        now: Timestamp,
    ) -> Result<DebitOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(balance) = lock_balance(&mut tx, user_id).await? else {
            return Ok(DebitOutcome::UserNotFound);
        };
        let plan = PlanType::parse(&balance.plan_type).map_err(decode_err)?;

        if !plan.is_unlimited() {
            if balance.tokens_remaining < amount {
                return Ok(DebitOutcome::Insufficient {
                    available: balance.tokens_remaining,
                });
            }
            sqlx::query(
                "UPDATE token_balances
                 SET tokens_remaining = tokens_remaining - $2, updated_at = $3
                 WHERE user_id = $1",
            )
            .bind(user_id)
            .bind(amount)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let txn = insert_token_transaction(&mut tx, user_id, kind, -amount, description).await?;

        tx.commit().await?;
        Ok(DebitOutcome::Applied(txn))
    }

    /// Consumption gate: authorize one generation job at `grade` costing
    /// `cost` tokens.
    ///
    /// Re-applies the gate checks in order (grade, quota, balance) under the
    /// balance row lock, after first applying a due monthly reset so a stale
    /// period can neither deny nor over-grant. On success the debit, the
    /// assignment-counter bump, and the `ASSIGNMENT_GENERATION` audit row
    /// commit together.
    pub async fn consume(
        pool: &PgPool,
        user_id: DbId,
        grade: Grade,
        cost: i64,
        catalog: &PlanCatalog,
        description: &str,
        now: Timestamp,
    ) -> Result<ConsumeOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(balance) = lock_balance(&mut tx, user_id).await? else {
            return Ok(ConsumeOutcome::UserNotFound);
        };
        let balance = match apply_reset_locked(&mut tx, &balance, now).await? {
            Some((updated, _)) => updated,
            None => balance,
        };

        let plan = PlanType::parse(&balance.plan_type).map_err(decode_err)?;
        let custom_grade = match &balance.custom_grade {
            Some(g) => Some(Grade::parse(g).map_err(decode_err)?),
            None => None,
        };

        // 1. Grade eligibility.
        if gate::check_grade_allowed(catalog, plan, custom_grade, grade).is_err() {
            return Ok(ConsumeOutcome::GradeNotAllowed {
                plan_type: balance.plan_type.clone(),
            });
        }

        // 2. Assignment quota.
        let allowed = catalog.definition(plan).and_then(|d| d.assignments_allowed);
        if gate::check_quota(balance.assignments_used, allowed).is_err() {
            return Ok(ConsumeOutcome::QuotaExhausted {
                used: balance.assignments_used,
                allowed: allowed.unwrap_or(0),
            });
        }

        // 3. Token balance.
        if !plan.is_unlimited() && balance.tokens_remaining < cost {
            return Ok(ConsumeOutcome::Insufficient {
                available: balance.tokens_remaining,
            });
        }

        let token_delta = if plan.is_unlimited() { 0 } else { cost };
        sqlx::query(
            "UPDATE token_balances
             SET tokens_remaining = tokens_remaining - $2,
                 assignments_used = assignments_used + 1,
                 updated_at = $3
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(token_delta)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let txn =
            insert_token_transaction(&mut tx, user_id, TxnKind::AssignmentGeneration, -cost, description)
                .await?;

        tx.commit().await?;
        Ok(ConsumeOutcome::Authorized(txn))
    }

    /// List a user's ledger history, newest first.
    pub async fn history(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TokenTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {TXN_COLUMNS} FROM token_transactions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, TokenTransaction>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
