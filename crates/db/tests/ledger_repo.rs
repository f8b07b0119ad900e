//! Integration tests for the ledger repository: balance invariants, audit
//! atomicity, lazy resets, and the consumption gate.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use scripta_core::ledger::TxnKind;
use scripta_core::plans::{Grade, PlanCatalog};
use scripta_db::models::token_balance::{ConsumeOutcome, DebitOutcome, ResetOutcome};
use scripta_db::repositories::LedgerRepo;

use common::{count_txns, remaining, reset_far_future, seed_member, set_balance};

// ---------------------------------------------------------------------------
// Credit / debit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn credit_increases_balance_and_writes_audit_row(pool: PgPool) {
    let user = seed_member(&pool, "credit_user").await;
    let before = remaining(&pool, user).await;

    let txn = LedgerRepo::credit(
        &pool,
        user,
        1_000,
        TxnKind::AdminAdjustment,
        "Manual refund",
        Utc::now(),
    )
    .await
    .unwrap()
    .expect("user exists");

    assert_eq!(txn.amount, 1_000);
    assert_eq!(txn.kind, "ADMIN_ADJUSTMENT");
    assert_eq!(remaining(&pool, user).await, before + 1_000);
    assert_eq!(count_txns(&pool, user, "ADMIN_ADJUSTMENT").await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn credit_unknown_user_is_none(pool: PgPool) {
    let result = LedgerRepo::credit(
        &pool,
        999_999,
        100,
        TxnKind::AdminAdjustment,
        "no such user",
        Utc::now(),
    )
    .await
    .unwrap();
    assert!(result.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn debit_decreases_balance_with_negative_audit_amount(pool: PgPool) {
    let user = seed_member(&pool, "debit_user").await;

    let outcome = LedgerRepo::debit(
        &pool,
        user,
        2_000,
        TxnKind::AssignmentGeneration,
        "Assignment generation at PASS",
        Utc::now(),
    )
    .await
    .unwrap();

    let txn = assert_matches!(outcome, DebitOutcome::Applied(txn) => txn);
    assert_eq!(txn.amount, -2_000);
    assert_eq!(remaining(&pool, user).await, common::FREE_TOKENS - 2_000);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn overdraw_fails_and_leaves_no_trace(pool: PgPool) {
    let user = seed_member(&pool, "overdraw_user").await;

    let outcome = LedgerRepo::debit(
        &pool,
        user,
        common::FREE_TOKENS + 1,
        TxnKind::AssignmentGeneration,
        "too big",
        Utc::now(),
    )
    .await
    .unwrap();

    assert_matches!(
        outcome,
        DebitOutcome::Insufficient { available } if available == common::FREE_TOKENS
    );
    // Balance unchanged, no audit row: the check and the write are atomic.
    assert_eq!(remaining(&pool, user).await, common::FREE_TOKENS);
    assert_eq!(count_txns(&pool, user, "ASSIGNMENT_GENERATION").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn balance_never_goes_negative_across_a_debit_sequence(pool: PgPool) {
    let user = seed_member(&pool, "sequence_user").await;

    for i in 0..10 {
        let _ = LedgerRepo::debit(
            &pool,
            user,
            1_500,
            TxnKind::AssignmentGeneration,
            &format!("debit {i}"),
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(remaining(&pool, user).await >= 0);
    }
    // 5 000 / 1 500 => exactly 3 debits succeed.
    assert_eq!(count_txns(&pool, user, "ASSIGNMENT_GENERATION").await, 3);
    assert_eq!(remaining(&pool, user).await, 500);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_debits_cannot_double_spend(pool: PgPool) {
    let user = seed_member(&pool, "race_user").await;
    // 5 000 available; two concurrent debits of 3 000 must not both apply.
    let a = LedgerRepo::debit(
        &pool,
        user,
        3_000,
        TxnKind::AssignmentGeneration,
        "debit a",
        Utc::now(),
    );
    let b = LedgerRepo::debit(
        &pool,
        user,
        3_000,
        TxnKind::AssignmentGeneration,
        "debit b",
        Utc::now(),
    );
    let (a, b) = tokio::join!(a, b);

    let applied = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|o| matches!(o, DebitOutcome::Applied(_)))
        .count();
    assert_eq!(applied, 1, "exactly one of the racing debits may win");
    assert_eq!(remaining(&pool, user).await, 2_000);
}

// ---------------------------------------------------------------------------
// UNLIMITED semantics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn unlimited_debit_is_audit_only(pool: PgPool) {
    let user = seed_member(&pool, "unlimited_user").await;
    set_balance(&pool, user, "UNLIMITED", 0, 0, None, 0, reset_far_future()).await;

    let outcome = LedgerRepo::debit(
        &pool,
        user,
        1_000_000,
        TxnKind::AssignmentGeneration,
        "huge job",
        Utc::now(),
    )
    .await
    .unwrap();

    let txn = assert_matches!(outcome, DebitOutcome::Applied(txn) => txn);
    assert_eq!(txn.amount, -1_000_000);
    // Stored number untouched: UNLIMITED is not numerically tracked.
    assert_eq!(remaining(&pool, user).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unlimited_credit_is_audit_only(pool: PgPool) {
    let user = seed_member(&pool, "unlimited_credit").await;
    set_balance(&pool, user, "UNLIMITED", 0, 0, None, 0, reset_far_future()).await;

    LedgerRepo::credit(
        &pool,
        user,
        500,
        TxnKind::AdminAdjustment,
        "goodwill",
        Utc::now(),
    )
    .await
    .unwrap()
    .expect("user exists");

    assert_eq!(remaining(&pool, user).await, 0);
    assert_eq!(count_txns(&pool, user, "ADMIN_ADJUSTMENT").await, 1);
}

// ---------------------------------------------------------------------------
// Monthly reset
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn reset_assigns_quota_and_forfeits_carryover(pool: PgPool) {
    let user = seed_member(&pool, "reset_user").await;
    // Over-quota balance (e.g. after a top-up), reset due in the past.
    set_balance(
        &pool,
        user,
        "P",
        80_000,
        75_000,
        None,
        3,
        Utc::now() - Duration::hours(1),
    )
    .await;

    let outcome = LedgerRepo::reset_if_due(&pool, user, Utc::now()).await.unwrap();
    let txn = assert_matches!(outcome, ResetOutcome::Applied(txn) => txn);

    // Assignment, not addition: the 5 000 overshoot is forfeited.
    assert_eq!(txn.amount, -5_000);
    assert_eq!(remaining(&pool, user).await, 75_000);

    let balance = LedgerRepo::balance(&pool, user).await.unwrap().unwrap();
    assert_eq!(balance.assignments_used, 0);
    assert!(balance.next_reset_at > Utc::now());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reset_is_idempotent_within_a_period(pool: PgPool) {
    let user = seed_member(&pool, "reset_twice").await;
    set_balance(
        &pool,
        user,
        "P",
        10_000,
        75_000,
        None,
        0,
        Utc::now() - Duration::minutes(5),
    )
    .await;

    let first = LedgerRepo::reset_if_due(&pool, user, Utc::now()).await.unwrap();
    assert_matches!(first, ResetOutcome::Applied(_));

    let balance_after_first = LedgerRepo::balance(&pool, user).await.unwrap().unwrap();

    // Duplicate trigger within the same period: a no-op.
    let second = LedgerRepo::reset_if_due(&pool, user, Utc::now()).await.unwrap();
    assert_matches!(second, ResetOutcome::NotDue);

    let balance_after_second = LedgerRepo::balance(&pool, user).await.unwrap().unwrap();
    assert_eq!(
        balance_after_first.tokens_remaining,
        balance_after_second.tokens_remaining
    );
    assert_eq!(
        balance_after_first.next_reset_at,
        balance_after_second.next_reset_at
    );
    assert_eq!(count_txns(&pool, user, "MONTHLY_RESET").await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn balance_fresh_applies_due_reset(pool: PgPool) {
    let user = seed_member(&pool, "fresh_user").await;
    set_balance(
        &pool,
        user,
        "P",
        123,
        75_000,
        None,
        2,
        Utc::now() - Duration::days(1),
    )
    .await;

    let balance = LedgerRepo::balance_fresh(&pool, user, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.tokens_remaining, 75_000);
    assert_eq!(balance.assignments_used, 0);
    assert_eq!(count_txns(&pool, user, "MONTHLY_RESET").await, 1);
}

// ---------------------------------------------------------------------------
// Consumption gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn consume_debits_and_bumps_assignment_counter(pool: PgPool) {
    let catalog = PlanCatalog::standard();
    let user = seed_member(&pool, "gate_user").await;
    set_balance(&pool, user, "P", 500, 75_000, None, 0, reset_far_future()).await;

    let outcome = LedgerRepo::consume(
        &pool,
        user,
        Grade::Pass,
        200,
        &catalog,
        "Assignment generation at PASS",
        Utc::now(),
    )
    .await
    .unwrap();

    let txn = assert_matches!(outcome, ConsumeOutcome::Authorized(txn) => txn);
    assert_eq!(txn.kind, "ASSIGNMENT_GENERATION");
    assert_eq!(txn.amount, -200);

    let balance = LedgerRepo::balance(&pool, user).await.unwrap().unwrap();
    assert_eq!(balance.tokens_remaining, 300);
    assert_eq!(balance.assignments_used, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn consume_rejects_unauthorized_grade_without_debiting(pool: PgPool) {
    let catalog = PlanCatalog::standard();
    let user = seed_member(&pool, "gate_grade").await;
    // Plan P authorizes PASS only; 500 tokens on hand.
    set_balance(&pool, user, "P", 500, 75_000, None, 0, reset_far_future()).await;

    let outcome = LedgerRepo::consume(
        &pool,
        user,
        Grade::Merit,
        100,
        &catalog,
        "Assignment generation at MERIT",
        Utc::now(),
    )
    .await
    .unwrap();

    assert_matches!(outcome, ConsumeOutcome::GradeNotAllowed { plan_type } if plan_type == "P");
    assert_eq!(remaining(&pool, user).await, 500);
    assert_eq!(count_txns(&pool, user, "ASSIGNMENT_GENERATION").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn consume_enforces_assignment_quota(pool: PgPool) {
    let catalog = PlanCatalog::standard();
    let user = seed_member(&pool, "gate_quota").await;
    // FREE allows exactly 1 assignment per period.
    set_balance(&pool, user, "FREE", 5_000, 5_000, None, 1, reset_far_future()).await;

    let outcome = LedgerRepo::consume(
        &pool,
        user,
        Grade::Pass,
        100,
        &catalog,
        "second job",
        Utc::now(),
    )
    .await
    .unwrap();

    assert_matches!(
        outcome,
        ConsumeOutcome::QuotaExhausted { used: 1, allowed: 1 }
    );
    assert_eq!(remaining(&pool, user).await, 5_000);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn consume_fails_on_insufficient_balance(pool: PgPool) {
    let catalog = PlanCatalog::standard();
    let user = seed_member(&pool, "gate_poor").await;
    set_balance(&pool, user, "P", 50, 75_000, None, 0, reset_far_future()).await;

    let outcome = LedgerRepo::consume(
        &pool,
        user,
        Grade::Pass,
        100,
        &catalog,
        "too expensive",
        Utc::now(),
    )
    .await
    .unwrap();

    assert_matches!(outcome, ConsumeOutcome::Insufficient { available: 50 });
    assert_eq!(remaining(&pool, user).await, 50);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn consume_respects_custom_grade_ceiling(pool: PgPool) {
    let catalog = PlanCatalog::standard();
    let user = seed_member(&pool, "gate_custom").await;
    set_balance(
        &pool,
        user,
        "CUSTOM",
        30_000,
        30_000,
        Some("MERIT"),
        0,
        reset_far_future(),
    )
    .await;

    // At the ceiling: allowed.
    let ok = LedgerRepo::consume(
        &pool,
        user,
        Grade::Merit,
        1_000,
        &catalog,
        "merit job",
        Utc::now(),
    )
    .await
    .unwrap();
    assert_matches!(ok, ConsumeOutcome::Authorized(_));

    // Above the ceiling: denied.
    let denied = LedgerRepo::consume(
        &pool,
        user,
        Grade::Distinction,
        1_000,
        &catalog,
        "distinction job",
        Utc::now(),
    )
    .await
    .unwrap();
    assert_matches!(denied, ConsumeOutcome::GradeNotAllowed { .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn consume_applies_due_reset_before_gating(pool: PgPool) {
    let catalog = PlanCatalog::standard();
    let user = seed_member(&pool, "gate_stale").await;
    // Stale period: 0 tokens left but a reset became due an hour ago.
    set_balance(
        &pool,
        user,
        "P",
        0,
        75_000,
        None,
        5,
        Utc::now() - Duration::hours(1),
    )
    .await;

    let outcome = LedgerRepo::consume(
        &pool,
        user,
        Grade::Pass,
        1_000,
        &catalog,
        "after reset",
        Utc::now(),
    )
    .await
    .unwrap();

    // The reset refilled the quota, so the job is authorized.
    assert_matches!(outcome, ConsumeOutcome::Authorized(_));
    assert_eq!(remaining(&pool, user).await, 74_000);
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn history_is_newest_first_and_paginated(pool: PgPool) {
    let user = seed_member(&pool, "history_user").await;
    for i in 1..=5i64 {
        LedgerRepo::credit(
            &pool,
            user,
            i * 10,
            TxnKind::AdminAdjustment,
            &format!("credit {i}"),
            Utc::now(),
        )
        .await
        .unwrap();
    }

    let page = LedgerRepo::history(&pool, user, 2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].description, "credit 5");
    assert_eq!(page[1].description, "credit 4");

    let rest = LedgerRepo::history(&pool, user, 10, 2).await.unwrap();
    assert_eq!(rest.len(), 3);
}
