//! Shared fixtures for repository integration tests.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use scripta_core::types::{DbId, Timestamp};
use scripta_db::models::user::CreateUser;
use scripta_db::repositories::UserRepo;

/// FREE-tier allotment used when seeding members.
pub const FREE_TOKENS: i64 = 5_000;

/// Create a member with a freshly provisioned FREE balance.
pub async fn seed_member(pool: &PgPool, username: &str) -> DbId {
    let input = CreateUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "$argon2id$stub".to_string(),
        role: "member".to_string(),
    };
    let user = UserRepo::create(pool, &input, FREE_TOKENS, Utc::now())
        .await
        .expect("seed user");
    user.id
}

/// Overwrite a user's balance row for scenario setup.
#[allow(clippy::too_many_arguments)]
pub async fn set_balance(
    pool: &PgPool,
    user_id: DbId,
    plan_type: &str,
    tokens_remaining: i64,
    tokens_per_month: i64,
    custom_grade: Option<&str>,
    assignments_used: i32,
    next_reset_at: Timestamp,
) {
    sqlx::query(
        "UPDATE token_balances
         SET plan_type = $2, tokens_remaining = $3, tokens_per_month = $4,
             custom_grade = $5, assignments_used = $6, next_reset_at = $7
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(plan_type)
    .bind(tokens_remaining)
    .bind(tokens_per_month)
    .bind(custom_grade)
    .bind(assignments_used)
    .bind(next_reset_at)
    .execute(pool)
    .await
    .expect("set balance");
}

/// A `next_reset_at` far enough out that no lazy reset fires during a test.
pub fn reset_far_future() -> Timestamp {
    Utc::now() + Duration::days(25)
}

/// Count the user's audit rows of a given kind.
pub async fn count_txns(pool: &PgPool, user_id: DbId, kind: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM token_transactions WHERE user_id = $1 AND kind = $2",
    )
    .bind(user_id)
    .bind(kind)
    .fetch_one(pool)
    .await
    .expect("count txns");
    row.0
}

/// Fetch `tokens_remaining` directly.
pub async fn remaining(pool: &PgPool, user_id: DbId) -> i64 {
    let row: (i64,) =
        sqlx::query_as("SELECT tokens_remaining FROM token_balances WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .expect("read balance");
    row.0
}
